//! LED feedback for the control surface
//!
//! State changes decided during a block are recorded as [`LedRequest`]s and
//! serialized to bytes later in the same block. [`LedFeedback::request`]
//! debounces against the last requested state, so a request that would not
//! change an LED never reaches the queue.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Rows tracked per region
pub const MAX_ROWS: usize = 4;
/// Columns tracked per row
pub const MAX_COLUMNS: usize = 10;
/// Default number of requests that may wait for the emitter
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedState {
    Off,
    On,
    Pending,
}

impl LedState {
    pub const ALL: [LedState; 3] = [LedState::Off, LedState::On, LedState::Pending];
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            LedState::On
        } else {
            LedState::Off
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    FileSelector,
    FunctionRow,
}

impl Region {
    fn index(self) -> usize {
        match self {
            Region::FileSelector => 0,
            Region::FunctionRow => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedRequest {
    pub region: Region,
    pub row: usize,
    pub column: usize,
    pub state: LedState,
}

/// Last requested state per LED.
///
/// Starts out unknown (`None`) so the first request for every LED goes
/// through.
#[derive(Debug, Clone)]
pub struct LedStatusCache {
    states: [[[Option<LedState>; MAX_COLUMNS]; MAX_ROWS]; 2],
}

impl Default for LedStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LedStatusCache {
    pub fn new() -> Self {
        Self {
            states: [[[None; MAX_COLUMNS]; MAX_ROWS]; 2],
        }
    }

    pub fn get(&self, region: Region, row: usize, column: usize) -> Option<LedState> {
        self.states
            .get(region.index())
            .and_then(|rows| rows.get(row))
            .and_then(|columns| columns.get(column))
            .copied()
            .flatten()
    }

    /// Stores `state` and returns true when it differs from the cached one.
    /// Out-of-range addresses are never stored.
    pub fn update(&mut self, region: Region, row: usize, column: usize, state: LedState) -> bool {
        let Some(slot) = self.states[region.index()]
            .get_mut(row)
            .and_then(|columns| columns.get_mut(column))
        else {
            return false;
        };

        if *slot == Some(state) {
            return false;
        }
        *slot = Some(state);
        true
    }
}

/// Bounded FIFO of LED requests.
///
/// When full, the oldest request is evicted to make room, so the queue
/// always holds the most recent intent. Evictions are counted for the
/// housekeeping loop to report.
#[derive(Debug)]
pub struct LedRequestQueue {
    queue: ArrayQueue<LedRequest>,
    evicted: Arc<AtomicUsize>,
}

impl LedRequestQueue {
    /// Panics if `capacity` is zero; configuration rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            evicted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, request: LedRequest) {
        if self.queue.force_push(request).is_some() {
            self.evicted.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Removes queued requests oldest first.
    ///
    /// The iterator is lazy and ends as soon as the queue is empty.
    pub fn drain(&self) -> impl Iterator<Item = LedRequest> + '_ {
        std::iter::from_fn(move || self.queue.pop())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Shared handle on the eviction count.
    pub fn eviction_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.evicted)
    }
}

/// Debounced LED requests: cache plus queue.
#[derive(Debug)]
pub struct LedFeedback {
    cache: LedStatusCache,
    queue: LedRequestQueue,
}

impl LedFeedback {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LedStatusCache::new(),
            queue: LedRequestQueue::new(capacity),
        }
    }

    /// Enqueues a request unless the LED was already asked to be in `state`.
    /// Returns whether a request was queued.
    pub fn request(&mut self, region: Region, row: usize, column: usize, state: LedState) -> bool {
        if !self.cache.update(region, row, column, state) {
            return false;
        }
        self.queue.push(LedRequest {
            region,
            row,
            column,
            state,
        });
        true
    }

    pub fn drain(&self) -> impl Iterator<Item = LedRequest> + '_ {
        self.queue.drain()
    }

    pub fn cache(&self) -> &LedStatusCache {
        &self.cache
    }

    pub fn queue(&self) -> &LedRequestQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(column: usize, state: LedState) -> LedRequest {
        LedRequest {
            region: Region::FunctionRow,
            row: 0,
            column,
            state,
        }
    }

    #[test]
    fn test_first_request_always_queued() {
        let mut leds = LedFeedback::new(8);
        assert!(leds.request(Region::FileSelector, 0, 3, LedState::Off));
        assert_eq!(leds.queue().len(), 1);
    }

    #[test]
    fn test_repeated_request_is_debounced() {
        let mut leds = LedFeedback::new(8);
        assert!(leds.request(Region::FunctionRow, 0, 1, LedState::On));
        assert!(!leds.request(Region::FunctionRow, 0, 1, LedState::On));
        assert_eq!(leds.queue().len(), 1);
    }

    #[test]
    fn test_cache_tracks_requested_not_transmitted_state() {
        let mut leds = LedFeedback::new(8);
        leds.request(Region::FileSelector, 0, 0, LedState::On);
        leds.request(Region::FileSelector, 0, 0, LedState::Off);
        // Nothing drained yet, the cache already reflects the latest request.
        assert_eq!(
            leds.cache().get(Region::FileSelector, 0, 0),
            Some(LedState::Off)
        );
        assert!(!leds.request(Region::FileSelector, 0, 0, LedState::Off));
        assert_eq!(leds.queue().len(), 2);
    }

    #[test]
    fn test_drain_is_fifo_and_exhausts_queue() {
        let queue = LedRequestQueue::new(8);
        queue.push(request(0, LedState::On));
        queue.push(request(1, LedState::Pending));
        queue.push(request(2, LedState::Off));

        let drained: Vec<usize> = queue.drain().map(|r| r.column).collect();
        assert_eq!(drained, vec![0, 1, 2]);
        assert_eq!(queue.drain().count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = LedRequestQueue::new(3);
        let evicted = queue.eviction_counter();
        for column in 0..5 {
            queue.push(request(column, LedState::On));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(evicted.load(Ordering::SeqCst), 2);
        let drained: Vec<usize> = queue.drain().map(|r| r.column).collect();
        assert_eq!(drained, vec![2, 3, 4]);
    }

    #[test]
    fn test_out_of_range_address_is_ignored() {
        let mut leds = LedFeedback::new(8);
        assert!(!leds.request(Region::FunctionRow, MAX_ROWS, 0, LedState::On));
        assert!(!leds.request(Region::FunctionRow, 0, MAX_COLUMNS, LedState::On));
        assert!(leds.queue().is_empty());
    }
}
