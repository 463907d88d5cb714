//! Per-run accumulator: identifier uniqueness and canonical export order.
//!
//! Pages can overlap at their boundaries, so the same transaction showing up
//! twice is normal and collapses to one row. The same identifier with different
//! contents is not, and aborts the run.

use log::debug;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::record::TransactionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Inserted,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<TransactionRecord>,
    by_id: HashMap<String, usize>,
    duplicates: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, keeping the first copy of each identifier.
    pub fn admit(&mut self, record: TransactionRecord) -> Result<Admission> {
        if let Some(&idx) = self.by_id.get(&record.transaction_id) {
            let existing = &self.records[idx];
            return match existing.first_difference(&record) {
                None => {
                    debug!("dropping repeated transaction {}", record.transaction_id);
                    self.duplicates += 1;
                    Ok(Admission::Duplicate)
                }
                Some(field) => Err(Error::Consistency {
                    id: record.transaction_id,
                    field,
                }),
            };
        }

        self.by_id
            .insert(record.transaction_id.clone(), self.records.len());
        self.records.push(record);
        Ok(Admission::Inserted)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of identical repeats dropped so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Oldest first; same instant ordered by identifier.
    pub fn into_ordered(self) -> Vec<TransactionRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| {
            a.date
                .sort_key()
                .cmp(&b.date.sort_key())
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        records
    }
}
