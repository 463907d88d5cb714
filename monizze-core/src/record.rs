//! Normalized transaction record shared by the normalizer, the ledger and the exporter

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;

/// Decimal places of the platform currency (EUR cents).
pub const MINOR_UNITS: u32 = 2;

/// When a transaction happened. The platform reports either a bare day or a
/// full timestamp, and the export keeps whichever it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnDate {
    Day(NaiveDate),
    At(NaiveDateTime),
}

impl TxnDate {
    /// Ordering key: bare days sort at midnight.
    pub fn sort_key(&self) -> NaiveDateTime {
        match self {
            TxnDate::Day(d) => d.and_time(NaiveTime::MIN),
            TxnDate::At(ts) => *ts,
        }
    }
}

impl fmt::Display for TxnDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnDate::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TxnDate::At(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One voucher movement, as written to the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Identifier reported by the platform, or a content fingerprint when it has none
    pub transaction_id: String,
    pub date: TxnDate,
    /// Voucher kind the platform listed the movement under (meal, eco, gift, ...)
    pub voucher: String,
    /// Signed amount, scale fixed at [`MINOR_UNITS`]. Negative means spent.
    pub amount: Decimal,
    pub description: String,
    /// Running voucher balance after the movement, when the platform exposes it
    pub balance: Option<Decimal>,
}

impl TransactionRecord {
    /// Name of the first field that differs from `other`, if any.
    pub fn first_difference(&self, other: &TransactionRecord) -> Option<&'static str> {
        if self.transaction_id != other.transaction_id {
            Some("transaction_id")
        } else if self.date != other.date {
            Some("date")
        } else if self.voucher != other.voucher {
            Some("voucher")
        } else if self.amount != other.amount {
            Some("amount")
        } else if self.description != other.description {
            Some("description")
        } else if self.balance != other.balance {
            Some("balance")
        } else {
            None
        }
    }
}
