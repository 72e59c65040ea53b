//! Bounded batching of accepted records

use std::mem;

use crate::error::IngestError;
use crate::record::{Key, Record, RecordKind};

/// Records per write call for metadata collections
pub const METADATA_BATCH_SIZE: usize = 100;

/// Records per write call for solution collections
pub const SOLUTION_BATCH_SIZE: usize = 200;

/// Default batch capacity for a record kind
pub fn default_batch_size(kind: RecordKind) -> usize {
    match kind {
        RecordKind::Metadata => METADATA_BATCH_SIZE,
        RecordKind::Solution => SOLUTION_BATCH_SIZE,
    }
}

/// Records handed to the store in a single write call, in append order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.records.iter().map(Record::key)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Buffers records until `capacity` is reached.
///
/// Every appended record leaves in exactly one [`Batch`], either from
/// [`append`](Self::append) when the buffer fills or from
/// [`drain`](Self::drain) at the end of a run.
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    buffer: Vec<Record>,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Result<Self, IngestError> {
        if capacity == 0 {
            return Err(IngestError::config("batch size must be greater than 0"));
        }
        Ok(Self {
            capacity,
            buffer: Vec::with_capacity(capacity),
        })
    }

    pub fn for_kind(kind: RecordKind) -> Self {
        Self {
            capacity: default_batch_size(kind),
            buffer: Vec::with_capacity(default_batch_size(kind)),
        }
    }

    /// Buffer `record`; returns the full batch once capacity is reached
    pub fn append(&mut self, record: Record) -> Option<Batch> {
        self.buffer.push(record);
        if self.buffer.len() >= self.capacity {
            let records = mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
            Some(Batch { records })
        } else {
            None
        }
    }

    /// Take whatever is buffered, leaving the accumulator empty
    pub fn drain(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Batch {
            records: mem::take(&mut self.buffer),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
