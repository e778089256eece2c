//! Stimulus drivers for the write and read ports.
//!
//! Every transaction starts with a random delay of rising edges, then waits
//! for `ready`, holds `enable` for one cycle per item and releases it at
//! the time step after the last rising edge.

use crate::HashMap;
use crate::bus::{PortKind, Signal, SignalPort};
use crate::dut::addr;
use crate::scoreboard::Scoreboard;
use crate::simulation::{SimHandle, TestbenchError};
use rand::Rng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::Rc;

pub type SharedScoreboard = Rc<RefCell<Scoreboard>>;

/// One write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusItem {
    pub address: u64,
    pub data: u64,
}

impl StimulusItem {
    pub fn new(address: u64, data: u64) -> Self {
        Self { address, data }
    }
}

/// Random delay and handshake shared by both drivers.
#[derive(Debug)]
struct Handshake {
    port: SignalPort,
    handle: SimHandle,
    rng: StdRng,
    jitter: RangeInclusive<u32>,
}

impl Handshake {
    fn new(
        handle: &SimHandle,
        kind: PortKind,
        rng: StdRng,
        jitter: RangeInclusive<u32>,
    ) -> Result<Self, TestbenchError> {
        let port = handle.port(kind);
        port.set(Signal::Enable, 0)?;
        port.set(Signal::Address, 0)?;
        if kind == PortKind::Write {
            port.set(Signal::Data, 0)?;
        }
        Ok(Self {
            port,
            handle: handle.clone(),
            rng,
            jitter,
        })
    }

    /// Waits out the jitter, then for `ready`, and asserts `enable`.
    async fn begin(&mut self) -> Result<(), TestbenchError> {
        let delay = self.rng.random_range(self.jitter.clone());
        self.handle.clock_cycles(delay).await;
        while self.port.get(Signal::Ready) == 0 {
            self.handle.rising_edge().await;
        }
        self.port.set(Signal::Enable, 1)
    }

    async fn end(&mut self) -> Result<(), TestbenchError> {
        self.handle.next_time_step().await;
        self.port.set(Signal::Enable, 0)
    }
}

/// Drives operands into the write port.
#[derive(Debug)]
pub struct WriteDriver {
    bus: Handshake,
}

impl WriteDriver {
    pub fn new(
        handle: &SimHandle,
        rng: StdRng,
        jitter: RangeInclusive<u32>,
    ) -> Result<Self, TestbenchError> {
        Ok(Self {
            bus: Handshake::new(handle, PortKind::Write, rng, jitter)?,
        })
    }

    pub async fn send(&mut self, address: u64, data: u64) -> Result<(), TestbenchError> {
        self.send_burst(&[StimulusItem::new(address, data)]).await
    }

    /// Writes `items` on consecutive cycles with `enable` held high.
    pub async fn send_burst(&mut self, items: &[StimulusItem]) -> Result<(), TestbenchError> {
        if items.is_empty() {
            return Ok(());
        }
        self.bus.begin().await?;
        for item in items {
            self.bus.port.set(Signal::Address, item.address)?;
            self.bus.port.set(Signal::Data, item.data)?;
            self.bus.handle.read_only().await;
            log::debug!(
                "write driver: address={} data={} t={}",
                item.address,
                item.data,
                self.bus.handle.time()
            );
            self.bus.handle.rising_edge().await;
        }
        self.bus.end().await
    }
}

/// Where a value read from an address goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRoute {
    /// Checked against the scoreboard.
    Result,
    /// Logged only.
    Status,
}

/// Reads status and result registers through the read port.
#[derive(Debug)]
pub struct ReadDriver {
    bus: Handshake,
    routes: HashMap<u64, ReadRoute>,
    scoreboard: SharedScoreboard,
}

impl ReadDriver {
    pub fn new(
        handle: &SimHandle,
        rng: StdRng,
        jitter: RangeInclusive<u32>,
        scoreboard: SharedScoreboard,
    ) -> Result<Self, TestbenchError> {
        let mut routes = HashMap::default();
        for status in addr::STATUS {
            routes.insert(status, ReadRoute::Status);
        }
        routes.insert(addr::RESULT, ReadRoute::Result);
        Ok(Self {
            bus: Handshake::new(handle, PortKind::Read, rng, jitter)?,
            routes,
            scoreboard,
        })
    }

    /// Routes reads of `address`, replacing any previous route.
    pub fn add_route(&mut self, address: u64, route: ReadRoute) {
        self.routes.insert(address, route);
    }

    pub async fn read(&mut self, address: u64) -> Result<u64, TestbenchError> {
        let values = self.read_burst(&[address]).await?;
        Ok(values.into_iter().next().unwrap_or_default())
    }

    /// Reads `addresses` on consecutive cycles with `enable` held high.
    pub async fn read_burst(&mut self, addresses: &[u64]) -> Result<Vec<u64>, TestbenchError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let mut values = Vec::with_capacity(addresses.len());
        self.bus.begin().await?;
        for &address in addresses {
            self.bus.port.set(Signal::Address, address)?;
            self.bus.handle.read_only().await;
            let data = self.bus.port.get(Signal::Data);
            self.dispatch(address, data);
            values.push(data);
            self.bus.handle.rising_edge().await;
        }
        self.bus.end().await?;
        Ok(values)
    }

    fn dispatch(&self, address: u64, data: u64) {
        match self.routes.get(&address) {
            Some(ReadRoute::Result) => {
                self.scoreboard.borrow_mut().observe(data);
            }
            Some(ReadRoute::Status) => log::info!("address={address}, value={data}"),
            None => log::debug!("read of unmapped address {address} ignored (value={data})"),
        }
    }
}
