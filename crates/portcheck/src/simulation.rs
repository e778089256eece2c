use crate::{
    bus::{BusState, PortKind, PortView, ResetLine, SignalPort},
    dut::Dut,
    scheduler::{Action, ClockDef, Scheduler},
    trigger::{Trigger, TriggerFuture, WaitSlot},
    vcd::VcdWriter,
};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

mod builder;
mod error;

pub use builder::SimulationBuilder;
pub use error::TestbenchError;

/// The part of a time step the kernel is currently processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// Between time steps.
    #[default]
    Inactive,
    NextTimeStep,
    /// Timers and clock edges.
    Active,
    /// Values are settled; signals must not be driven.
    ReadOnly,
}

#[derive(Debug, Default)]
struct Waiters {
    rising: Vec<Rc<WaitSlot>>,
    falling: Vec<Rc<WaitSlot>>,
    read_only: Vec<Rc<WaitSlot>>,
    next_step: Vec<Rc<WaitSlot>>,
}

impl Waiters {
    fn list_mut(&mut self, trigger: Trigger) -> Option<&mut Vec<Rc<WaitSlot>>> {
        match trigger {
            Trigger::RisingEdge => Some(&mut self.rising),
            Trigger::FallingEdge => Some(&mut self.falling),
            Trigger::ReadOnly => Some(&mut self.read_only),
            Trigger::NextTimeStep => Some(&mut self.next_step),
            Trigger::Timer(_) => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Kernel {
    scheduler: Scheduler,
    bus: BusState,
    region: Region,
    waiters: Waiters,
    fault: Option<TestbenchError>,
}

/// Cloneable access to the running simulation, handed to every task.
#[derive(Clone)]
pub struct SimHandle {
    kernel: Rc<RefCell<Kernel>>,
}

impl std::fmt::Debug for SimHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHandle")
            .field("time", &self.time())
            .finish()
    }
}

impl SimHandle {
    /// Current simulation time.
    pub fn time(&self) -> u64 {
        self.kernel.borrow().scheduler.time
    }

    pub fn region(&self) -> Region {
        self.kernel.borrow().region
    }

    pub fn rising_edge(&self) -> TriggerFuture {
        TriggerFuture::new(self.clone(), Trigger::RisingEdge)
    }

    pub fn falling_edge(&self) -> TriggerFuture {
        TriggerFuture::new(self.clone(), Trigger::FallingEdge)
    }

    pub fn read_only(&self) -> TriggerFuture {
        TriggerFuture::new(self.clone(), Trigger::ReadOnly)
    }

    pub fn next_time_step(&self) -> TriggerFuture {
        TriggerFuture::new(self.clone(), Trigger::NextTimeStep)
    }

    pub fn timer(&self, delay: u64) -> TriggerFuture {
        TriggerFuture::new(self.clone(), Trigger::Timer(delay))
    }

    /// Waits for `cycles` rising clock edges.
    pub async fn clock_cycles(&self, cycles: u32) {
        for _ in 0..cycles {
            self.rising_edge().await;
        }
    }

    pub fn port(&self, kind: PortKind) -> SignalPort {
        SignalPort::new(self.clone(), kind)
    }

    pub fn view(&self, kind: PortKind) -> PortView {
        PortView::new(self.clone(), kind)
    }

    pub fn reset_line(&self) -> ResetLine {
        ResetLine::new(self.clone())
    }

    /// Snapshot of every bus signal.
    pub fn bus(&self) -> BusState {
        self.kernel.borrow().bus
    }

    /// Records a failure from a forked task. The first one stops the run.
    pub fn raise(&self, err: TestbenchError) {
        let mut kernel = self.kernel.borrow_mut();
        if kernel.fault.is_none() {
            kernel.fault = Some(err);
        }
    }

    pub(crate) fn with_bus<R>(&self, f: impl FnOnce(&BusState) -> R) -> R {
        f(&self.kernel.borrow().bus)
    }

    pub(crate) fn drive(
        &self,
        signal: &str,
        f: impl FnOnce(&mut BusState),
    ) -> Result<(), TestbenchError> {
        let mut kernel = self.kernel.borrow_mut();
        if kernel.region == Region::ReadOnly {
            return Err(TestbenchError::ReadOnlyWrite {
                signal: signal.to_string(),
                time: kernel.scheduler.time,
            });
        }
        f(&mut kernel.bus);
        Ok(())
    }

    pub(crate) fn register(&self, trigger: Trigger, slot: Rc<WaitSlot>) {
        let mut kernel = self.kernel.borrow_mut();
        if let Trigger::Timer(delay) = trigger {
            let at = kernel.scheduler.time + delay.max(1);
            kernel.scheduler.push(at, Action::Wake(slot));
        } else if let Some(list) = kernel.waiters.list_mut(trigger) {
            list.push(slot);
        }
    }
}

/// A clocked simulation of one design with cooperatively scheduled tasks.
///
/// Drivers, monitors and the sequencer run as futures on a single-threaded
/// executor. Each time step is processed in regions (next time step,
/// timers and clock edge, read-only) and every region runs its woken tasks
/// until none can make progress.
pub struct Simulation {
    kernel: Rc<RefCell<Kernel>>,
    pool: LocalPool,
    spawner: LocalSpawner,
    dut: Box<dyn Dut>,
    pub(crate) vcd_writer: Option<VcdWriter>,
    pub(crate) max_time: Option<u64>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("dut", &self.dut.name())
            .field("time", &self.time())
            .finish()
    }
}

impl Simulation {
    pub fn builder<D: Dut + 'static>(dut: D) -> SimulationBuilder {
        SimulationBuilder::new(dut)
    }

    pub(crate) fn new(dut: Box<dyn Dut>) -> Self {
        let mut bus = BusState::default();
        dut.settle(&mut bus);
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            kernel: Rc::new(RefCell::new(Kernel {
                scheduler: Scheduler::new(),
                bus,
                region: Region::Inactive,
                waiters: Waiters::default(),
                fault: None,
            })),
            pool,
            spawner,
            dut,
            vcd_writer: None,
            max_time: None,
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            kernel: Rc::clone(&self.kernel),
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> u64 {
        self.kernel.borrow().scheduler.time
    }

    /// Returns the time of the next scheduled event, if any.
    pub fn next_event_time(&self) -> Option<u64> {
        self.kernel.borrow().scheduler.next_event_time()
    }

    pub fn bus(&self) -> BusState {
        self.kernel.borrow().bus
    }

    pub fn dut(&self) -> &dyn Dut {
        self.dut.as_ref()
    }

    /// Start the free-running clock. The first rising edge occurs at
    /// `initial_delay`.
    pub fn add_clock(&mut self, period: u64, initial_delay: u64) {
        let mut kernel = self.kernel.borrow_mut();
        kernel.scheduler.clock = Some(ClockDef { period });
        kernel
            .scheduler
            .push(initial_delay, Action::ClockEdge { next_val: 1 });
    }

    /// Spawns a background task. An error it returns aborts the run.
    pub fn fork<F>(&self, task: F) -> Result<(), TestbenchError>
    where
        F: Future<Output = Result<(), TestbenchError>> + 'static,
    {
        let handle = self.handle();
        self.spawner
            .spawn_local(async move {
                if let Err(err) = task.await {
                    log::error!("forked task failed at t={}: {err}", handle.time());
                    handle.raise(err);
                }
            })
            .map_err(|err| TestbenchError::Spawn(err.to_string()))
    }

    /// Runs the simulation until `task` completes and returns its result.
    pub fn run<F, T>(&mut self, task: F) -> Result<T, TestbenchError>
    where
        F: Future<Output = Result<T, TestbenchError>> + 'static,
        T: 'static,
    {
        let output = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&output);
        self.spawner
            .spawn_local(async move {
                let result = task.await;
                *slot.borrow_mut() = Some(result);
            })
            .map_err(|err| TestbenchError::Spawn(err.to_string()))?;
        let result = self.drive(&output);
        let flushed = self.flush_vcd();
        let value = result?;
        flushed?;
        Ok(value)
    }

    fn drive<T>(
        &mut self,
        output: &RefCell<Option<Result<T, TestbenchError>>>,
    ) -> Result<T, TestbenchError> {
        self.run_tasks()?;

        loop {
            let finished = output.borrow_mut().take();
            if let Some(result) = finished {
                return result;
            }
            let time = self.time();
            if let Some(limit) = self.max_time {
                if self.next_event_time().is_some_and(|next| next > limit) {
                    return Err(TestbenchError::Timeout { limit, time });
                }
            }
            if self.step()?.is_none() {
                return Err(TestbenchError::Stalled(time));
            }
        }
    }

    /// Advance time to the next scheduled event and process that time step.
    /// Returns the new simulation time, or None if no events are scheduled.
    pub fn step(&mut self) -> Result<Option<u64>, TestbenchError> {
        let next = self.kernel.borrow_mut().scheduler.pop_all_at_next_time();
        let Some((current_time, events)) = next else {
            return Ok(None);
        };

        {
            let mut kernel = self.kernel.borrow_mut();
            kernel.scheduler.time = current_time;
            kernel.region = Region::NextTimeStep;
        }
        self.release(Trigger::NextTimeStep)?;

        // Timers first, so a value they drive is sampled by this step's edge.
        self.kernel.borrow_mut().region = Region::Active;
        let mut edge = None;
        for ev in events {
            match ev.action {
                Action::Wake(slot) => slot.fire(),
                Action::ClockEdge { next_val } => edge = Some(next_val),
            }
        }
        self.run_tasks()?;

        if let Some(level) = edge {
            {
                let mut kernel = self.kernel.borrow_mut();
                let kernel = &mut *kernel;
                kernel.bus.clk = u64::from(level);
                if level == 1 {
                    self.dut.clock_edge(&kernel.bus);
                }
                self.dut.settle(&mut kernel.bus);
                if let Some(half_period) = kernel.scheduler.half_period() {
                    kernel.scheduler.push(
                        current_time + half_period,
                        Action::ClockEdge {
                            next_val: 1 - level,
                        },
                    );
                }
            }
            let trigger = if level == 1 {
                Trigger::RisingEdge
            } else {
                Trigger::FallingEdge
            };
            self.release(trigger)?;
        }

        {
            let mut kernel = self.kernel.borrow_mut();
            kernel.region = Region::ReadOnly;
            self.dut.settle(&mut kernel.bus);
        }
        self.release(Trigger::ReadOnly)?;
        self.kernel.borrow_mut().region = Region::Inactive;

        self.dump(current_time)?;
        Ok(Some(current_time))
    }

    /// Advance time and run until `end_time` (inclusive).
    pub fn run_until(&mut self, end_time: u64) -> Result<(), TestbenchError> {
        while let Some(next_time) = self.next_event_time() {
            if next_time > end_time {
                break;
            }
            self.step()?;
        }
        self.kernel.borrow_mut().scheduler.time = end_time;
        self.flush_vcd()
    }

    /// Captures the current state of all signals and writes them to the VCD file.
    pub fn dump(&mut self, timestamp: u64) -> Result<(), TestbenchError> {
        if let Some(writer) = self.vcd_writer.as_mut() {
            let bus = self.kernel.borrow().bus;
            writer.dump(timestamp, &bus)?;
        }
        Ok(())
    }

    /// Writes buffered waveform output to disk.
    pub fn flush_vcd(&mut self) -> Result<(), TestbenchError> {
        match self.vcd_writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn release(&mut self, trigger: Trigger) -> Result<(), TestbenchError> {
        let slots = {
            let mut kernel = self.kernel.borrow_mut();
            kernel
                .waiters
                .list_mut(trigger)
                .map(std::mem::take)
                .unwrap_or_default()
        };
        for slot in slots {
            slot.fire();
        }
        self.run_tasks()
    }

    fn run_tasks(&mut self) -> Result<(), TestbenchError> {
        self.pool.run_until_stalled();
        let fault = self.kernel.borrow_mut().fault.take();
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
