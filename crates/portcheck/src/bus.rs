use crate::simulation::{SimHandle, TestbenchError};
use serde::Serialize;

/// The two handshake ports of the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Write,
    Read,
}

impl PortKind {
    pub const ALL: [PortKind; 2] = [PortKind::Write, PortKind::Read];

    pub fn prefix(self) -> &'static str {
        match self {
            PortKind::Write => "write",
            PortKind::Read => "read",
        }
    }
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One signal of a port's [`BusSignalSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Enable,
    Address,
    Data,
    Ready,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Signal::Enable, Signal::Address, Signal::Data, Signal::Ready];

    fn suffix(self) -> &'static str {
        match self {
            Signal::Enable => "en",
            Signal::Address => "address",
            Signal::Data => "data",
            Signal::Ready => "rdy",
        }
    }

    /// Bit width used when dumping the signal.
    pub fn width(self) -> usize {
        match self {
            Signal::Enable | Signal::Ready => 1,
            Signal::Address | Signal::Data => 32,
        }
    }

    /// Full bus name, e.g. `write_en` or `read_data`.
    pub fn name(self, port: PortKind) -> String {
        format!("{}_{}", port.prefix(), self.suffix())
    }
}

/// Signal values of one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusSignalSet {
    pub enable: u64,
    pub address: u64,
    pub data: u64,
    pub ready: u64,
}

impl BusSignalSet {
    pub fn get(&self, signal: Signal) -> u64 {
        match signal {
            Signal::Enable => self.enable,
            Signal::Address => self.address,
            Signal::Data => self.data,
            Signal::Ready => self.ready,
        }
    }

    pub fn set(&mut self, signal: Signal, value: u64) {
        let slot = match signal {
            Signal::Enable => &mut self.enable,
            Signal::Address => &mut self.address,
            Signal::Data => &mut self.data,
            Signal::Ready => &mut self.ready,
        };
        *slot = value;
    }
}

/// Every signal the design sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusState {
    pub clk: u64,
    /// Active-low reset.
    pub rst_n: u64,
    pub write: BusSignalSet,
    pub read: BusSignalSet,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            clk: 0,
            rst_n: 1,
            write: BusSignalSet::default(),
            read: BusSignalSet::default(),
        }
    }
}

impl BusState {
    pub fn port(&self, kind: PortKind) -> &BusSignalSet {
        match kind {
            PortKind::Write => &self.write,
            PortKind::Read => &self.read,
        }
    }

    pub fn port_mut(&mut self, kind: PortKind) -> &mut BusSignalSet {
        match kind {
            PortKind::Write => &mut self.write,
            PortKind::Read => &mut self.read,
        }
    }
}

/// Writable access to one port, held by that port's driver.
#[derive(Debug, Clone)]
pub struct SignalPort {
    handle: SimHandle,
    kind: PortKind,
}

impl SignalPort {
    pub(crate) fn new(handle: SimHandle, kind: PortKind) -> Self {
        Self { handle, kind }
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn get(&self, signal: Signal) -> u64 {
        self.handle.with_bus(|bus| bus.port(self.kind).get(signal))
    }

    /// Drives `signal`. Fails inside the read-only region.
    pub fn set(&self, signal: Signal, value: u64) -> Result<(), TestbenchError> {
        self.handle.drive(&signal.name(self.kind), |bus| {
            bus.port_mut(self.kind).set(signal, value)
        })
    }

    pub fn view(&self) -> PortView {
        PortView::new(self.handle.clone(), self.kind)
    }
}

/// Read-only access to one port, held by monitors.
#[derive(Debug, Clone)]
pub struct PortView {
    handle: SimHandle,
    kind: PortKind,
}

impl PortView {
    pub(crate) fn new(handle: SimHandle, kind: PortKind) -> Self {
        Self { handle, kind }
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn get(&self, signal: Signal) -> u64 {
        self.handle.with_bus(|bus| bus.port(self.kind).get(signal))
    }

    pub fn sample(&self) -> BusSignalSet {
        self.handle.with_bus(|bus| *bus.port(self.kind))
    }
}

/// The active-low reset input, driven by the sequencer.
#[derive(Debug, Clone)]
pub struct ResetLine {
    handle: SimHandle,
}

impl ResetLine {
    pub(crate) fn new(handle: SimHandle) -> Self {
        Self { handle }
    }

    pub fn get(&self) -> u64 {
        self.handle.with_bus(|bus| bus.rst_n)
    }

    pub fn set(&self, value: u64) -> Result<(), TestbenchError> {
        self.handle.drive("RST_N", |bus| bus.rst_n = value)
    }
}
