use crate::bus::BusState;

mod or_fifo;

pub use or_fifo::{OrFifoDut, addr};

/// The design under test as seen by the kernel.
///
/// The kernel calls [`Dut::clock_edge`] on every rising clock edge with the
/// signal values driven before the edge, and [`Dut::settle`] whenever the
/// design outputs must reflect the current state and inputs.
pub trait Dut {
    fn name(&self) -> &str;

    /// Sequential update.
    fn clock_edge(&mut self, bus: &BusState);

    /// Drives the design outputs (ready lines, read data).
    fn settle(&self, bus: &mut BusState);
}

impl<T: Dut + ?Sized> Dut for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn clock_edge(&mut self, bus: &BusState) {
        (**self).clock_edge(bus)
    }

    fn settle(&self, bus: &mut BusState) {
        (**self).settle(bus)
    }
}
