use std::collections::VecDeque;

use crate::memento::Snapshot;
use crate::record::Calculation;

/// Bounded, chronologically ordered calculation history.
///
/// Holds at most `max_size` records; appending past capacity evicts the
/// oldest record first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    records: VecDeque<Calculation>,
    max_size: usize,
}

impl HistoryBuffer {
    /// `max_size` is clamped to at least one record.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        HistoryBuffer {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    pub fn add(&mut self, record: Calculation) {
        self.records.push_back(record);
        while self.records.len() > self.max_size {
            self.records.pop_front();
        }
    }

    /// Independent copy of the records, oldest first.
    pub fn get_all(&self) -> Vec<Calculation> {
        self.records.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Calculation> + '_ {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&Calculation> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Replace the contents, keeping only the most recent `max_size` records.
    pub fn replace(&mut self, records: Vec<Calculation>) {
        let skip = records.len().saturating_sub(self.max_size);
        self.records = records.into_iter().skip(skip).collect();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.records.iter().copied())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.replace(snapshot.into_records());
    }
}
