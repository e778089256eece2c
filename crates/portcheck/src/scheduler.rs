use crate::trigger::WaitSlot;
use std::collections::BinaryHeap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ClockDef {
    pub period: u64,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Drive the clock to `next_val`.
    ClockEdge { next_val: u8 },
    /// Resume a task waiting on a timer.
    Wake(Rc<WaitSlot>),
}

#[derive(Debug, Clone)]
pub struct SimEvent {
    pub time: u64,
    pub seq: u64,
    pub action: Action,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Earlier time has higher priority (BinaryHeap is a Max-Heap),
        // ties resolve in insertion order.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pub(crate) time: u64,
    pub(crate) clock: Option<ClockDef>,
    pub(crate) event_queue: BinaryHeap<SimEvent>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.event_queue.peek().map(|e| e.time)
    }

    pub fn push(&mut self, time: u64, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.event_queue.push(SimEvent { time, seq, action });
    }

    pub fn pop_all_at_next_time(&mut self) -> Option<(u64, Vec<SimEvent>)> {
        let next_time = self.next_event_time()?;
        let mut events = Vec::new();
        while self
            .event_queue
            .peek()
            .is_some_and(|ev| ev.time == next_time)
        {
            if let Some(ev) = self.event_queue.pop() {
                events.push(ev);
            }
        }
        Some((next_time, events))
    }

    /// Half of the registered clock period, if a clock is running.
    pub fn half_period(&self) -> Option<u64> {
        self.clock.as_ref().map(|def| def.period / 2)
    }
}
