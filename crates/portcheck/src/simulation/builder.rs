use super::{Simulation, TestbenchError};
use crate::{TestbenchOptions, dut::Dut, vcd::VcdWriter};
use std::path::{Path, PathBuf};

/// A fluent builder for configuring and initializing a [`Simulation`].
pub struct SimulationBuilder {
    dut: Box<dyn Dut>,
    clock: Option<(u64, u64)>,
    vcd_path: Option<PathBuf>,
    max_time: Option<u64>,
}

impl SimulationBuilder {
    pub fn new<D: Dut + 'static>(dut: D) -> Self {
        Self {
            dut: Box::new(dut),
            clock: Some((10, 0)),
            vcd_path: None,
            max_time: None,
        }
    }

    /// Clock period and time of the first rising edge.
    pub fn clock(mut self, period: u64, initial_delay: u64) -> Self {
        self.clock = Some((period, initial_delay));
        self
    }

    /// Build without a running clock; only timers advance time.
    pub fn no_clock(mut self) -> Self {
        self.clock = None;
        self
    }

    /// Enable VCD dumping to the specified file.
    pub fn vcd<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.vcd_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Abort a run once simulated time passes `limit`.
    pub fn max_time(mut self, limit: u64) -> Self {
        self.max_time = Some(limit);
        self
    }

    /// Apply clock, waveform and time limit settings from `options`.
    pub fn options(mut self, options: &TestbenchOptions) -> Self {
        self.clock = Some((options.clock_period, 0));
        if let Some(path) = &options.vcd {
            self.vcd_path = Some(path.clone());
        }
        self.max_time = options.max_time;
        self
    }

    pub fn build(self) -> Result<Simulation, TestbenchError> {
        if let Some((period, _)) = self.clock {
            if period < 2 || !period.is_multiple_of(2) {
                return Err(TestbenchError::Config(format!(
                    "clock period must be even and at least 2, got {period}"
                )));
            }
        }

        let mut sim = Simulation::new(self.dut);
        if let Some(path) = self.vcd_path {
            let vcd_writer = VcdWriter::new(&path).map_err(|source| TestbenchError::Io {
                path: path.clone(),
                source,
            })?;
            sim.vcd_writer = Some(vcd_writer);
        }
        sim.max_time = self.max_time;
        if let Some((period, initial_delay)) = self.clock {
            sim.add_clock(period, initial_delay);
        }
        Ok(sim)
    }
}
