//! Bounded record buffers for real-time and historical data.

use std::collections::VecDeque;

use super::record::Record;

/// Maximum number of real-time records to keep.
pub const REALTIME_CAPACITY: usize = 20;

/// Maximum number of historical records to keep.
pub const HISTORICAL_CAPACITY: usize = 10;

/// Holds the real-time and historical buffers.
///
/// The real-time buffer is newest-first: pushes prepend and the oldest record
/// falls off the end once capacity is exceeded. The historical buffer keeps
/// the order the source delivered and is only ever replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    realtime: VecDeque<Record>,
    historical: Vec<Record>,
}

impl HistoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            realtime: VecDeque::with_capacity(REALTIME_CAPACITY + 1),
            historical: Vec::with_capacity(HISTORICAL_CAPACITY),
        }
    }

    /// Prepend a real-time record, evicting the oldest if over capacity.
    pub fn push_realtime(&mut self, record: Record) {
        self.realtime.push_front(record);
        while self.realtime.len() > REALTIME_CAPACITY {
            self.realtime.pop_back();
        }
    }

    /// Replace the historical buffer with `records`.
    ///
    /// Callers are expected to pre-truncate; anything past
    /// [`HISTORICAL_CAPACITY`] is dropped here regardless.
    pub fn replace_historical(&mut self, mut records: Vec<Record>) {
        records.truncate(HISTORICAL_CAPACITY);
        self.historical = records;
    }

    /// Owned copies of both buffers: (real-time newest-first, historical).
    pub fn snapshot(&self) -> (Vec<Record>, Vec<Record>) {
        (self.realtime().cloned().collect(), self.historical().to_vec())
    }

    pub fn realtime_len(&self) -> usize {
        self.realtime.len()
    }

    pub fn historical_len(&self) -> usize {
        self.historical.len()
    }

    /// Iterate real-time records, newest first.
    pub fn realtime(&self) -> impl Iterator<Item = &Record> {
        self.realtime.iter()
    }

    pub fn historical(&self) -> &[Record] {
        &self.historical
    }
}
