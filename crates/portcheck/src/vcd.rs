use crate::bus::{BusState, PortKind, Signal};
use crate::simulation::TestbenchError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A dumped signal: how to read it from the bus, its name and width.
#[derive(Debug, Clone, Copy)]
enum Probe {
    Clock,
    Reset,
    Port(PortKind, Signal),
}

impl Probe {
    fn all() -> Vec<Probe> {
        let mut probes = vec![Probe::Clock, Probe::Reset];
        for kind in PortKind::ALL {
            for signal in Signal::ALL {
                probes.push(Probe::Port(kind, signal));
            }
        }
        probes
    }

    fn name(self) -> String {
        match self {
            Probe::Clock => "CLK".to_string(),
            Probe::Reset => "RST_N".to_string(),
            Probe::Port(kind, signal) => signal.name(kind),
        }
    }

    fn width(self) -> usize {
        match self {
            Probe::Clock | Probe::Reset => 1,
            Probe::Port(_, signal) => signal.width(),
        }
    }

    fn value(self, bus: &BusState) -> u64 {
        match self {
            Probe::Clock => bus.clk,
            Probe::Reset => bus.rst_n,
            Probe::Port(kind, signal) => bus.port(kind).get(signal),
        }
    }
}

pub struct VcdWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    signals: Vec<(Probe, String)>,
    last_values: Vec<Option<u64>>,
    /// Last `#<t>` line written.
    timestamp: Option<u64>,
}

impl VcdWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        // VCD Header
        writeln!(writer, "$date")?;
        writeln!(
            writer,
            "  {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(writer, "$end")?;
        writeln!(writer, "$version")?;
        writeln!(writer, "  portcheck")?;
        writeln!(writer, "$end")?;
        writeln!(writer, "$timescale 1ns $end")?;

        writeln!(writer, "$scope module top $end")?;
        let mut signals = Vec::new();
        for (num, probe) in Probe::all().into_iter().enumerate() {
            let vcd_id = Self::generate_vcd_id(num);
            writeln!(
                writer,
                "$var wire {} {} {} $end",
                probe.width(),
                vcd_id,
                probe.name()
            )?;
            signals.push((probe, vcd_id));
        }
        writeln!(writer, "$upscope $end")?;

        writeln!(writer, "$enddefinitions $end")?;
        writeln!(writer, "$dumpvars")?;
        writeln!(writer, "$end")?;

        let last_values = vec![None; signals.len()];
        Ok(Self {
            writer,
            path: path.as_ref().to_path_buf(),
            signals,
            last_values,
            timestamp: None,
        })
    }

    fn generate_vcd_id(num: usize) -> String {
        let mut id = String::new();
        let mut n = num;
        loop {
            let char = ((n % 94) + 33) as u8 as char;
            id.push(char);
            if n < 94 {
                break;
            }
            n = (n / 94) - 1;
        }
        id.chars().rev().collect()
    }

    /// Writes every signal whose value changed since the previous dump.
    /// A step without changes writes nothing.
    pub fn dump(&mut self, timestamp: u64, bus: &BusState) -> Result<(), TestbenchError> {
        self.write_changes(timestamp, bus)
            .map_err(|source| TestbenchError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub fn flush(&mut self) -> Result<(), TestbenchError> {
        self.writer.flush().map_err(|source| TestbenchError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_changes(&mut self, timestamp: u64, bus: &BusState) -> std::io::Result<()> {
        for ((probe, vcd_id), last) in self.signals.iter().zip(self.last_values.iter_mut()) {
            let current_val = probe.value(bus);
            if *last == Some(current_val) {
                continue;
            }
            if self.timestamp != Some(timestamp) {
                writeln!(self.writer, "#{}", timestamp)?;
                self.timestamp = Some(timestamp);
            }
            if probe.width() == 1 {
                writeln!(self.writer, "{}{}", current_val, vcd_id)?;
            } else {
                writeln!(self.writer, "b{:b} {}", current_val, vcd_id)?;
            }
            *last = Some(current_val);
        }
        Ok(())
    }
}

impl Drop for VcdWriter {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("failed to flush {}: {err}", self.path.display());
        }
    }
}
