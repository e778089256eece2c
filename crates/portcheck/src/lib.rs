//! Clock-synchronized verification harness for a design with a write port
//! and a read port.
//!
//! A small discrete-event kernel ([`Simulation`]) clocks a [`Dut`] model and
//! runs drivers, monitors and the [`Sequencer`] as cooperative tasks. The
//! [`Scoreboard`] checks results in order and the [`CoverageTracker`]
//! records protocol phases, operands and addresses.

mod bus;
mod config;
pub mod coverage;
mod driver;
pub mod dut;
mod monitor;
mod scheduler;
mod scoreboard;
mod sequencer;
mod simulation;
mod trigger;
mod vcd;

pub(crate) use fxhash::FxHashMap as HashMap;

pub use bus::{BusSignalSet, BusState, PortKind, PortView, ResetLine, Signal, SignalPort};
pub use config::{RESULT_PATH_ENV, TestbenchOptions};
pub use coverage::{
    BinValue, CoverageError, CoverageReport, CoverageSink, CoverageTracker, SharedCoverage,
};
pub use driver::{ReadDriver, ReadRoute, SharedScoreboard, StimulusItem, WriteDriver};
pub use dut::{Dut, OrFifoDut};
pub use monitor::{PhasePoints, PhaseTransition, ProtocolMonitor, ProtocolPhase, classify};
pub use scoreboard::{Outcome, Scoreboard, ScoreboardSummary, VerdictError};
pub use sequencer::{RunReport, Sequencer, Testbench, coverage_model, points, run_testbench};
pub use simulation::{Region, SimHandle, Simulation, SimulationBuilder, TestbenchError};
pub use trigger::{Trigger, TriggerFuture};
