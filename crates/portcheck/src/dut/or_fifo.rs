use super::Dut;
use crate::bus::BusState;
use std::collections::VecDeque;

/// Address map of the OR design.
pub mod addr {
    /// Reads 1 while operand buffer A can accept a write.
    pub const A_NOT_FULL: u64 = 0;
    /// Reads 1 while operand buffer B can accept a write.
    pub const B_NOT_FULL: u64 = 1;
    /// Reads 1 while a result is waiting.
    pub const Y_NOT_EMPTY: u64 = 2;
    /// Reads the oldest result and consumes it.
    pub const RESULT: u64 = 3;
    pub const OPERAND_A: u64 = 4;
    pub const OPERAND_B: u64 = 5;

    pub const STATUS: [u64; 3] = [A_NOT_FULL, B_NOT_FULL, Y_NOT_EMPTY];
}

#[derive(Debug, Clone)]
struct Fifo {
    depth: usize,
    items: VecDeque<u64>,
}

impl Fifo {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            items: VecDeque::with_capacity(depth),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.depth
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Behavioral model of the two-operand OR design.
///
/// Operands land in buffers A and B; whenever both hold a value and the
/// result buffer Y has room, `a | b` moves into Y. All decisions at an edge
/// use the state from before the edge, so a full buffer drops a write even
/// if it is drained in the same cycle.
#[derive(Debug, Clone)]
pub struct OrFifoDut {
    a: Fifo,
    b: Fifo,
    y: Fifo,
}

impl Default for OrFifoDut {
    fn default() -> Self {
        Self::with_depths(2, 1, 1)
    }
}

impl OrFifoDut {
    pub fn with_depths(a: usize, b: usize, y: usize) -> Self {
        Self {
            a: Fifo::new(a),
            b: Fifo::new(b),
            y: Fifo::new(y),
        }
    }

    /// Number of values held in buffers A, B and Y.
    pub fn occupancy(&self) -> (usize, usize, usize) {
        (self.a.items.len(), self.b.items.len(), self.y.items.len())
    }

    fn reset(&mut self) {
        self.a.items.clear();
        self.b.items.clear();
        self.y.items.clear();
    }

    fn read(&self, address: u64) -> u64 {
        match address {
            addr::A_NOT_FULL => u64::from(!self.a.is_full()),
            addr::B_NOT_FULL => u64::from(!self.b.is_full()),
            addr::Y_NOT_EMPTY => u64::from(!self.y.is_empty()),
            addr::RESULT => self.y.items.front().copied().unwrap_or(0),
            _ => 0,
        }
    }
}

impl Dut for OrFifoDut {
    fn name(&self) -> &str {
        "or_fifo"
    }

    fn clock_edge(&mut self, bus: &BusState) {
        if bus.rst_n == 0 {
            self.reset();
            return;
        }

        let fire = !self.a.is_empty() && !self.b.is_empty() && !self.y.is_full();
        let dequeue_y =
            bus.read.enable == 1 && bus.read.address == addr::RESULT && !self.y.is_empty();
        let enqueue_a = bus.write.enable == 1
            && bus.write.address == addr::OPERAND_A
            && !self.a.is_full();
        let enqueue_b = bus.write.enable == 1
            && bus.write.address == addr::OPERAND_B
            && !self.b.is_full();

        if dequeue_y {
            self.y.items.pop_front();
        }
        if fire {
            if let (Some(a), Some(b)) = (self.a.items.pop_front(), self.b.items.pop_front()) {
                self.y.items.push_back(a | b);
            }
        }
        if enqueue_a {
            self.a.items.push_back(bus.write.data);
        }
        if enqueue_b {
            self.b.items.push_back(bus.write.data);
        }
    }

    fn settle(&self, bus: &mut BusState) {
        bus.write.ready = 1;
        bus.read.ready = 1;
        bus.read.data = self.read(bus.read.address);
    }
}
