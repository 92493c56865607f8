use std::collections::BinaryHeap;

/// Region of a time step. At equal time, edges run before the read-only phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    RisingEdge,
    FallingEdge,
    ReadOnly,
}

#[derive(Debug, Clone)]
pub struct ClockDef {
    pub period: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    pub time: u64,
    pub phase: Phase,
}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Earlier time has higher priority (BinaryHeap is a Max-Heap)
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.phase.cmp(&self.phase))
    }
}

/// Event queue for a single free-running clock domain.
#[derive(Debug, Default)]
pub struct Scheduler {
    pub(crate) time: u64,
    pub(crate) clock: Option<ClockDef>,
    pub(crate) event_queue: BinaryHeap<SimEvent>,
    pub(crate) rising_edges: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a clock whose first rising edge happens at `initial_delay`.
    pub fn add_clock(&mut self, period: u64, initial_delay: u64) {
        self.clock = Some(ClockDef {
            period: period.max(2),
        });
        self.push(SimEvent {
            time: initial_delay,
            phase: Phase::RisingEdge,
        });
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Rising edges popped so far.
    pub fn cycles(&self) -> u64 {
        self.rising_edges
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.event_queue.peek().map(|e| e.time)
    }

    pub fn push(&mut self, event: SimEvent) {
        self.event_queue.push(event);
    }

    /// Pops the next event, advancing time and re-arming the clock.
    /// A rising edge also schedules the read-only phase of the same time step.
    pub fn pop(&mut self) -> Option<SimEvent> {
        let event = self.event_queue.pop()?;
        self.time = event.time;

        let half_period = self.clock.as_ref().map(|def| def.period / 2);
        match (event.phase, half_period) {
            (Phase::RisingEdge, Some(half)) => {
                self.rising_edges += 1;
                self.push(SimEvent {
                    time: event.time,
                    phase: Phase::ReadOnly,
                });
                self.push(SimEvent {
                    time: event.time + half,
                    phase: Phase::FallingEdge,
                });
            }
            (Phase::FallingEdge, Some(half)) => {
                self.push(SimEvent {
                    time: event.time + half,
                    phase: Phase::RisingEdge,
                });
            }
            _ => {}
        }
        Some(event)
    }
}
