use binary_heap_plus::{BinaryHeap, MinComparator};
use std::cmp::Ordering;

/// Sentinel for "no cycle stored". `shift_back` leaves fields holding this
/// value untouched.
pub const NO_CYCLE: i64 = i64::MIN;

/// Once the cycle counter crosses this bound the emulator shifts every stored
/// cycle back by [`SHIFT_BACK_OFFSET`] to keep the signed arithmetic far away
/// from overflow.
pub const SHIFT_BACK_THRESHOLD: i64 = 1 << 56;
pub const SHIFT_BACK_OFFSET: i64 = 1 << 56;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    None = 255,
    /// Start of a visible scanline (mode 2).
    OamSearch = 0,
    /// Start of pixel transfer (mode 3), renders the current scanline.
    LcdTransfer = 1,
    /// Start of h-blank (mode 0).
    Hblank = 2,
    /// Start of line 144.
    Vblank = 3,
    /// Per-line progression through lines 145..=153.
    VblankWait = 4,
    /// Delayed TIMA reload + timer interrupt.
    TimerOverflow = 5,
    /// End of the one-machine-cycle window in which TMA writes land in TIMA.
    TimerPostOverflow = 6,
    /// OAM DMA begins two machine cycles after the FF46 write.
    OamDmaStart = 7,
    /// 16-byte h-blank DMA block (CGB).
    HdmaStep = 8,
    SerialTransferComplete = 9,
    SpeedSwitchDone = 10,
}

#[derive(Debug, Copy, Clone, Eq)]
pub struct Event {
    pub timestamp: i64,
    pub event_type: EventType,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.timestamp.partial_cmp(&other.timestamp)
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

impl Event {
    /// Update the current event with new data.
    ///
    /// `delta_timestamp` will add the given time to the current `Event`'s `timestamp`.
    pub fn update_self(mut self, new_event_type: EventType, delta_timestamp: i64) -> Self {
        self.timestamp += delta_timestamp;
        self.event_type = new_event_type;
        self
    }
}

/// The single source of simulated time.
///
/// `current_time` counts clock cycles at 4.194304 MHz, or doubled ticks while
/// CGB double speed is active. Every component that stores an absolute cycle
/// value is expected to implement a `shift_back` hook mirroring
/// [`Scheduler::shift_back`].
#[derive(Debug)]
pub struct Scheduler {
    // Want the smallest timestamp first, so MinComparator
    event_queue: BinaryHeap<Event, MinComparator>,
    pub current_time: i64,
}

impl Scheduler {
    pub fn new() -> Self {
        let mut result = Self {
            event_queue: BinaryHeap::with_capacity_min(64),
            current_time: 0,
        };
        result.event_queue.push(Event {
            timestamp: 0,
            event_type: EventType::None,
        });
        result
    }

    /// Returns a `Some(Event)` if there is an event available which has a timestamp
    /// which is at or below the `current_time` for the `Scheduler`
    pub fn pop_closest(&mut self) -> Option<Event> {
        if let Some(event) = self.event_queue.peek() {
            if event.timestamp <= self.current_time {
                return self.event_queue.pop();
            }
        }
        None
    }

    pub fn peek_next(&self) -> Option<(EventType, i64)> {
        self.event_queue.peek().map(|e| (e.event_type, e.timestamp))
    }

    /// Add a new event to the `Scheduler` at the given absolute timestamp.
    ///
    /// At most one event per [`EventType`] is ever scheduled. Pushing a kind
    /// that is already queued replaces the old entry.
    pub fn push_event(&mut self, event_type: EventType, timestamp: i64) {
        self.remove_event_type(event_type);
        self.event_queue.push(Event { timestamp, event_type });
    }

    pub fn push_relative(&mut self, event_type: EventType, relative_timestamp: i64) {
        self.push_event(event_type, self.current_time + relative_timestamp);
    }

    /// Add an event to the `Scheduler`.
    /// This function is best used when we want to avoid the duplicate check for a new event,
    /// say in the `pop_closest()` loop for the scheduler. Instead we can then reuse that event
    /// and push it back in here.
    pub fn push_full_event(&mut self, event: Event) {
        self.event_queue.push(event);
    }

    pub fn remove_event_type(&mut self, event_type: EventType) {
        // Very inefficient way of doing this, but the queue never holds more
        // than a dozen events so it doesn't really matter.
        self.event_queue = BinaryHeap::from_vec(
            self.event_queue
                .clone()
                .into_iter()
                .filter(|e| e.event_type != event_type)
                .collect(),
        );
    }

    #[inline]
    pub fn add_cycles(&mut self, delta_cycles: i64) {
        self.current_time += delta_cycles;
    }

    /// Subtract `offset` from the cycle counter and from every queued event.
    ///
    /// The relative order of all events is unchanged since all timestamps move
    /// by the same amount.
    pub fn shift_back(&mut self, offset: i64) {
        self.current_time -= offset;
        self.event_queue = BinaryHeap::from_vec(
            self.event_queue
                .clone()
                .into_iter()
                .map(|mut e| {
                    e.timestamp -= offset;
                    e
                })
                .collect(),
        );
    }
}

/// Shift a stored absolute cycle field back by `offset`, leaving the
/// [`NO_CYCLE`] sentinel untouched.
#[inline]
pub fn shift_cycle_back(cycle: &mut i64, offset: i64) {
    if *cycle != NO_CYCLE {
        *cycle -= offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_pop_in_timestamp_order() {
        let mut scheduler = Scheduler::new();
        scheduler.push_event(EventType::Vblank, 400);
        scheduler.push_event(EventType::TimerOverflow, 100);
        scheduler.push_event(EventType::Hblank, 250);

        scheduler.add_cycles(500);

        assert_eq!(scheduler.pop_closest().unwrap().event_type, EventType::None);
        assert_eq!(scheduler.pop_closest().unwrap().event_type, EventType::TimerOverflow);
        assert_eq!(scheduler.pop_closest().unwrap().event_type, EventType::Hblank);
        assert_eq!(scheduler.pop_closest().unwrap().event_type, EventType::Vblank);
        assert!(scheduler.pop_closest().is_none());
    }

    #[test]
    fn pushing_same_kind_replaces_previous_entry() {
        let mut scheduler = Scheduler::new();
        scheduler.push_event(EventType::SerialTransferComplete, 4096);
        scheduler.push_event(EventType::SerialTransferComplete, 1024);

        scheduler.add_cycles(8192);
        // The None bootstrap event comes out first.
        scheduler.pop_closest();

        let event = scheduler.pop_closest().unwrap();
        assert_eq!(event.event_type, EventType::SerialTransferComplete);
        assert_eq!(event.timestamp, 1024);
        assert!(scheduler.pop_closest().is_none());
    }

    #[test]
    fn shift_back_preserves_event_order() {
        let mut scheduler = Scheduler::new();
        scheduler.add_cycles(10_000);
        scheduler.push_relative(EventType::OamSearch, 4);
        scheduler.push_relative(EventType::Vblank, 456);

        scheduler.shift_back(10_000);

        assert_eq!(scheduler.current_time, 0);
        scheduler.add_cycles(1000);
        scheduler.pop_closest();
        assert_eq!(scheduler.pop_closest().unwrap().timestamp, 4);
        assert_eq!(scheduler.pop_closest().unwrap().timestamp, 456);
    }

    #[test]
    fn sentinel_cycles_are_not_shifted() {
        let mut no_cycle = NO_CYCLE;
        let mut real_cycle = 500;
        shift_cycle_back(&mut no_cycle, 400);
        shift_cycle_back(&mut real_cycle, 400);
        assert_eq!(no_cycle, NO_CYCLE);
        assert_eq!(real_cycle, 100);
    }
}
