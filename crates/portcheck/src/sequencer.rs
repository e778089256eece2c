use crate::TestbenchOptions;
use crate::bus::PortKind;
use crate::coverage::{
    BinValue, CoverageError, CoverageReport, CoverageSink, CoverageTracker, SharedCoverage,
};
use crate::driver::{ReadDriver, SharedScoreboard, StimulusItem, WriteDriver};
use crate::dut::{Dut, addr};
use crate::monitor::{PhasePoints, ProtocolMonitor, ProtocolPhase};
use crate::scoreboard::{Scoreboard, ScoreboardSummary};
use crate::simulation::{SimHandle, Simulation, TestbenchError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Names of the coverage points and crosses of a run.
pub mod points {
    pub const A: &str = "top.a";
    pub const B: &str = "top.b";
    pub const CROSS_AB: &str = "top.cross.ab";
    pub const WRITE_PREVIOUS: &str = "top.inputport.previousWrite";
    pub const WRITE_CURRENT: &str = "top.inputport.currentWrite";
    pub const CROSS_INPUT: &str = "top.cross.input";
    pub const READ_PREVIOUS: &str = "top.outputport.previousRead";
    pub const READ_CURRENT: &str = "top.outputport.currentRead";
    pub const CROSS_OUTPUT: &str = "top.cross.output";
    pub const READ_ADDRESS: &str = "top.read_address";
}

/// Number of writes in each overflow scenario.
const OVERFLOW_WRITES: usize = 3;

/// Registers every point and cross the testbench samples.
pub fn coverage_model() -> Result<CoverageTracker, CoverageError> {
    let mut tracker = CoverageTracker::new();
    tracker.register_point(points::A, [0u64, 1])?;
    tracker.register_point(points::B, [0u64, 1])?;
    tracker.register_cross(points::CROSS_AB, &[points::A, points::B])?;

    for (port, previous, current, cross) in [
        (
            PortKind::Write,
            points::WRITE_PREVIOUS,
            points::WRITE_CURRENT,
            points::CROSS_INPUT,
        ),
        (
            PortKind::Read,
            points::READ_PREVIOUS,
            points::READ_CURRENT,
            points::CROSS_OUTPUT,
        ),
    ] {
        let bins = ProtocolPhase::DEFINED.map(|phase| phase.label(port));
        tracker.register_point(previous, bins.clone())?;
        tracker.register_point(current, bins)?;
        tracker.register_cross(cross, &[previous, current])?;
    }

    tracker.register_point(points::READ_ADDRESS, [0u64, 1, 2, 3])?;
    Ok(tracker)
}

/// Outcome of a passing run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    /// Simulated time at the verdict.
    pub end_time: u64,
    pub scoreboard: ScoreboardSummary,
    pub coverage: CoverageReport,
    pub coverage_path: PathBuf,
}

/// Wires drivers, monitors, scoreboard and coverage to a simulation.
pub struct Testbench;

impl Testbench {
    /// Creates one driver per port, forks both monitors and returns the
    /// sequencer that runs the test.
    pub fn attach(
        sim: &mut Simulation,
        options: &TestbenchOptions,
    ) -> Result<Sequencer, TestbenchError> {
        options.validate()?;
        let handle = sim.handle();
        let mut master = StdRng::seed_from_u64(options.seed);
        let jitter = options.jitter_min..=options.jitter_max;
        let coverage = SharedCoverage::new(coverage_model()?);
        let scoreboard: SharedScoreboard = Rc::new(RefCell::new(Scoreboard::new()));

        let write = WriteDriver::new(
            &handle,
            StdRng::seed_from_u64(master.random()),
            jitter.clone(),
        )?;
        let read = ReadDriver::new(
            &handle,
            StdRng::seed_from_u64(master.random()),
            jitter,
            Rc::clone(&scoreboard),
        )?;

        for (port, previous, current) in [
            (PortKind::Write, points::WRITE_PREVIOUS, points::WRITE_CURRENT),
            (PortKind::Read, points::READ_PREVIOUS, points::READ_CURRENT),
        ] {
            let monitor = ProtocolMonitor::new(
                handle.view(port),
                Box::new(coverage.clone()),
                PhasePoints {
                    previous: previous.to_string(),
                    current: current.to_string(),
                },
            );
            sim.fork(monitor.run(handle.clone()))?;
        }

        Ok(Sequencer {
            handle,
            options: options.clone(),
            rng: master,
            write,
            read,
            coverage,
            scoreboard,
            last_operands: (0, 0),
        })
    }
}

/// Runs the test scenario against the attached design.
#[derive(Debug)]
pub struct Sequencer {
    handle: SimHandle,
    options: TestbenchOptions,
    rng: StdRng,
    write: WriteDriver,
    read: ReadDriver,
    coverage: SharedCoverage,
    scoreboard: SharedScoreboard,
    last_operands: (u64, u64),
}

impl Sequencer {
    pub fn handle(&self) -> &SimHandle {
        &self.handle
    }

    pub fn coverage(&self) -> &SharedCoverage {
        &self.coverage
    }

    pub fn scoreboard(&self) -> SharedScoreboard {
        Rc::clone(&self.scoreboard)
    }

    pub fn write_driver(&mut self) -> &mut WriteDriver {
        &mut self.write
    }

    pub fn read_driver(&mut self) -> &mut ReadDriver {
        &mut self.read
    }

    /// Pulses the active-low reset and waits one time step.
    pub async fn reset(&mut self) -> Result<(), TestbenchError> {
        let rst_n = self.handle.reset_line();
        let hold = self.options.reset_hold;
        rst_n.set(1)?;
        self.handle.timer(hold).await;
        rst_n.set(0)?;
        self.handle.timer(hold).await;
        rst_n.set(1)?;
        self.handle.next_time_step().await;
        log::info!("DUT reset complete (t={})", self.handle.time());
        Ok(())
    }

    /// Reads each status address once.
    pub async fn status_sweep(&mut self) -> Result<Vec<u64>, TestbenchError> {
        self.sweep(&addr::STATUS, false).await
    }

    /// Pushes `a | b`, writes both operands, lets the design settle and
    /// reads back the status and result registers.
    pub async fn or_operation(&mut self, a: u64, b: u64) -> Result<Vec<u64>, TestbenchError> {
        self.scoreboard.borrow_mut().push_expected(a | b);
        self.write.send(addr::OPERAND_A, a).await?;
        self.write.send(addr::OPERAND_B, b).await?;
        self.coverage.record(points::A, BinValue::Int(a))?;
        self.coverage.record(points::B, BinValue::Int(b))?;
        self.last_operands = (a, b);

        for _ in 0..self.options.settle_cycles {
            self.handle.rising_edge().await;
            self.handle.next_time_step().await;
        }

        let sweep = [
            addr::A_NOT_FULL,
            addr::B_NOT_FULL,
            addr::Y_NOT_EMPTY,
            addr::RESULT,
        ];
        self.sweep(&sweep, false).await
    }

    /// One operation with random one-bit operands.
    pub async fn random_operation(&mut self) -> Result<Vec<u64>, TestbenchError> {
        let a = self.rng.random_range(0..=1u64);
        let b = self.rng.random_range(0..=1u64);
        self.or_operation(a, b).await
    }

    /// Overfills operand buffer A with the last `a`, then sweeps status.
    pub async fn overflow_a(&mut self) -> Result<Vec<u64>, TestbenchError> {
        log::info!("testing operand buffer A full behavior");
        let (a, _) = self.last_operands;
        self.overflow(addr::OPERAND_A, a).await
    }

    /// Overfills operand buffer B with the last `b`, then sweeps status.
    pub async fn overflow_b(&mut self) -> Result<Vec<u64>, TestbenchError> {
        log::info!("testing operand buffer B full behavior");
        let (_, b) = self.last_operands;
        self.overflow(addr::OPERAND_B, b).await
    }

    pub async fn drain(&mut self) -> Result<(), TestbenchError> {
        self.handle.clock_cycles(self.options.drain_cycles).await;
        Ok(())
    }

    /// Logs and exports coverage, then applies the scoreboard verdict.
    pub fn finish(&self) -> Result<RunReport, TestbenchError> {
        let coverage = self.coverage.report();
        coverage.log();
        let coverage_path = self.options.coverage_path();
        coverage
            .export_xml(&coverage_path)
            .map_err(|source| TestbenchError::Io {
                path: coverage_path.clone(),
                source,
            })?;
        log::info!("coverage report: {}", coverage_path.display());

        let scoreboard = self.scoreboard.borrow().check()?;
        log::info!("All test vectors passed successfully!");
        Ok(RunReport {
            seed: self.options.seed,
            end_time: self.handle.time(),
            scoreboard,
            coverage,
            coverage_path,
        })
    }

    /// The full scenario: reset, initial sweep, random operations, both
    /// overflow scenarios, drain and verdict.
    pub async fn run(mut self) -> Result<RunReport, TestbenchError> {
        self.reset().await?;

        log::info!("initial status read");
        self.status_sweep().await?;

        log::info!(
            "performing {} random OR operations",
            self.options.operations
        );
        for _ in 0..self.options.operations {
            self.random_operation().await?;
        }

        self.overflow_a().await?;
        self.overflow_b().await?;
        self.drain().await?;
        self.finish()
    }

    async fn overflow(&mut self, address: u64, data: u64) -> Result<Vec<u64>, TestbenchError> {
        let burst = self.options.burst_overflow;
        if burst {
            let items = [StimulusItem::new(address, data); OVERFLOW_WRITES];
            self.write.send_burst(&items).await?;
        } else {
            for _ in 0..OVERFLOW_WRITES {
                self.write.send(address, data).await?;
            }
        }
        self.sweep(&addr::STATUS, burst).await
    }

    async fn sweep(&mut self, addresses: &[u64], burst: bool) -> Result<Vec<u64>, TestbenchError> {
        if burst {
            for &address in addresses {
                self.coverage
                    .record(points::READ_ADDRESS, BinValue::Int(address))?;
            }
            return self.read.read_burst(addresses).await;
        }
        let mut values = Vec::with_capacity(addresses.len());
        for &address in addresses {
            self.coverage
                .record(points::READ_ADDRESS, BinValue::Int(address))?;
            values.push(self.read.read(address).await?);
        }
        Ok(values)
    }
}

/// Builds a simulation of `dut` from `options` and runs the full scenario.
pub fn run_testbench<D: Dut + 'static>(
    dut: D,
    options: &TestbenchOptions,
) -> Result<RunReport, TestbenchError> {
    options.validate()?;
    let mut sim = Simulation::builder(dut).options(options).build()?;
    let sequencer = Testbench::attach(&mut sim, options)?;
    log::info!("running seed {} against '{}'", options.seed, sim.dut().name());
    sim.run(sequencer.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_registers_every_item_once() {
        let report = coverage_model().unwrap().report();
        let names: Vec<&str> = report.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                points::A,
                points::B,
                points::CROSS_AB,
                points::WRITE_PREVIOUS,
                points::WRITE_CURRENT,
                points::CROSS_INPUT,
                points::READ_PREVIOUS,
                points::READ_CURRENT,
                points::CROSS_OUTPUT,
                points::READ_ADDRESS,
            ]
        );
        assert_eq!(report.total_bins(), 28);
        assert_eq!(report.covered_bins(), 0);
    }
}
