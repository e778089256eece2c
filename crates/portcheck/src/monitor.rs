use crate::bus::{BusSignalSet, PortKind, PortView};
use crate::coverage::{BinValue, CoverageSink};
use crate::simulation::{SimHandle, TestbenchError};
use std::fmt;

/// Handshake state of a port in one clock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolPhase {
    Idle,
    Transaction,
    /// Enable without ready. Never reported.
    Undefined,
}

impl ProtocolPhase {
    /// Defined phases, in bin order.
    pub const DEFINED: [ProtocolPhase; 2] = [ProtocolPhase::Idle, ProtocolPhase::Transaction];

    /// Bin label as used by the coverage model, e.g. `TxnWrite`.
    pub fn label(self, port: PortKind) -> String {
        let stem = match self {
            ProtocolPhase::Idle => "Idle",
            ProtocolPhase::Transaction => "Txn",
            ProtocolPhase::Undefined => "Undefined",
        };
        let suffix = match port {
            PortKind::Write => "Write",
            PortKind::Read => "Read",
        };
        format!("{stem}{suffix}")
    }
}

impl fmt::Display for ProtocolPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtocolPhase::Idle => "Idle",
            ProtocolPhase::Transaction => "Transaction",
            ProtocolPhase::Undefined => "Undefined",
        };
        f.write_str(s)
    }
}

/// Phase of a port from its handshake pair.
pub fn classify(enable: u64, ready: u64) -> ProtocolPhase {
    match (enable != 0, ready != 0) {
        (false, _) => ProtocolPhase::Idle,
        (true, true) => ProtocolPhase::Transaction,
        (true, false) => ProtocolPhase::Undefined,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub previous: ProtocolPhase,
    pub current: ProtocolPhase,
}

/// Coverage point names a monitor reports into.
#[derive(Debug, Clone)]
pub struct PhasePoints {
    pub previous: String,
    pub current: String,
}

/// Passive observer of one port's handshake.
///
/// Samples `enable` and `ready` once per cycle, after the falling edge once
/// values have settled, and reports every defined phase together with the
/// previous defined one.
pub struct ProtocolMonitor {
    view: PortView,
    sink: Box<dyn CoverageSink>,
    points: PhasePoints,
    previous: ProtocolPhase,
}

impl fmt::Debug for ProtocolMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolMonitor")
            .field("port", &self.view.kind())
            .field("points", &self.points)
            .field("previous", &self.previous)
            .finish()
    }
}

impl ProtocolMonitor {
    pub fn new(view: PortView, sink: Box<dyn CoverageSink>, points: PhasePoints) -> Self {
        Self {
            view,
            sink,
            points,
            previous: ProtocolPhase::Idle,
        }
    }

    pub fn previous(&self) -> ProtocolPhase {
        self.previous
    }

    /// Classifies one sample and reports it. Returns the transition, or
    /// None when the phase is undefined.
    pub fn observe(
        &mut self,
        sample: BusSignalSet,
    ) -> Result<Option<PhaseTransition>, TestbenchError> {
        let current = classify(sample.enable, sample.ready);
        if current == ProtocolPhase::Undefined {
            return Ok(None);
        }
        let transition = PhaseTransition {
            previous: self.previous,
            current,
        };
        let port = self.view.kind();
        self.sink.record(
            &self.points.previous,
            BinValue::Label(transition.previous.label(port)),
        )?;
        self.sink.record(
            &self.points.current,
            BinValue::Label(transition.current.label(port)),
        )?;
        self.previous = current;
        Ok(Some(transition))
    }

    /// Samples the port every cycle until the simulation ends.
    pub async fn run(mut self, handle: SimHandle) -> Result<(), TestbenchError> {
        loop {
            handle.falling_edge().await;
            handle.read_only().await;
            let sample = self.view.sample();
            if let Some(t) = self.observe(sample)? {
                log::trace!(
                    "{} monitor: {} -> {} t={}",
                    self.view.kind(),
                    t.previous,
                    t.current,
                    handle.time()
                );
            }
        }
    }
}
