//! Map raw history entries onto [`TransactionRecord`].
//!
//! Field mapping:
//!
//! | raw       | record           | required |
//! |-----------|------------------|----------|
//! | `id`      | `transaction_id` | no, fingerprinted when absent |
//! | `date`    | `date`           | yes |
//! | `amount`  | `amount`         | yes |
//! | `detail`  | `description`    | yes |
//! | `balance` | `balance`        | no |
//! | bucket    | `voucher`        | yes |

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use monizze_core::{Error, MINOR_UNITS, Result, TransactionRecord, TxnDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::raw::{RawEntry, kind};

// Optional sign, digits, optional '.' or ',' fraction, optional euro suffix.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<sign>[+-])?\s*(?P<int>\d+)(?:[.,](?P<frac>\d+))?\s*(?:€|EUR)?$")
        .expect("amount pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    minor_units: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            minor_units: MINOR_UNITS,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&self, entry: &RawEntry) -> Result<TransactionRecord> {
        let explicit_id = optional_id(entry)?;
        let with_id = |err: Error| match err {
            Error::Normalization { field, reason, .. } => Error::Normalization {
                field,
                transaction: explicit_id.clone(),
                reason,
            },
            other => other,
        };

        let raw_date = required_text(entry, "date").map_err(with_id)?;
        let date = parse_date(raw_date).map_err(with_id)?;
        let amount = self
            .parse_amount(required(entry, "amount").map_err(with_id)?, "amount")
            .map_err(with_id)?;
        let description = required_text(entry, "detail").map_err(with_id)?.trim().to_string();
        let balance = match entry.fields.get("balance") {
            None | Some(Value::Null) => None,
            Some(v) => Some(self.parse_amount(v, "balance").map_err(with_id)?),
        };

        let voucher = entry.voucher.trim().to_string();
        if voucher.is_empty() {
            return Err(with_id(Error::normalization("voucher", "empty voucher name")));
        }

        let transaction_id = match explicit_id {
            Some(id) => id,
            None => fingerprint(&voucher, raw_date, &amount, &description),
        };

        Ok(TransactionRecord {
            transaction_id,
            date,
            voucher,
            amount,
            description,
            balance,
        })
    }

    fn parse_amount(&self, value: &Value, field: &'static str) -> Result<Decimal> {
        let parsed = match value {
            Value::String(s) => parse_amount_text(s),
            Value::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .ok()
            }
            other => {
                return Err(Error::normalization(
                    field,
                    format!("expected a string or number, got {}", kind(other)),
                ));
            }
        };

        let mut amount = parsed.ok_or_else(|| {
            Error::normalization(field, format!("`{value}` is not a decimal amount"))
        })?;

        if amount.round_dp(self.minor_units) != amount {
            return Err(Error::normalization(
                field,
                format!("`{value}` has more than {} decimal places", self.minor_units),
            ));
        }
        amount.rescale(self.minor_units);
        Ok(amount)
    }
}

fn parse_amount_text(s: &str) -> Option<Decimal> {
    let caps = AMOUNT_RE.captures(s.trim())?;
    let mut text = String::new();
    if caps.name("sign").map(|m| m.as_str()) == Some("-") {
        text.push('-');
    }
    text.push_str(&caps["int"]);
    if let Some(frac) = caps.name("frac") {
        text.push('.');
        text.push_str(frac.as_str());
    }
    Decimal::from_str(&text).ok()
}

fn parse_date(raw: &str) -> Result<TxnDate> {
    let s = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(TxnDate::At(ts.naive_utc()));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(TxnDate::At(ts));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(TxnDate::Day(d));
        }
    }
    Err(Error::normalization(
        "date",
        format!("unrecognized date `{raw}`"),
    ))
}

fn required<'a>(entry: &'a RawEntry, field: &'static str) -> Result<&'a Value> {
    match entry.fields.get(field) {
        None | Some(Value::Null) => Err(Error::normalization(field, "missing")),
        Some(v) => Ok(v),
    }
}

fn required_text<'a>(entry: &'a RawEntry, field: &'static str) -> Result<&'a str> {
    match required(entry, field)? {
        Value::String(s) => Ok(s),
        other => Err(Error::normalization(
            field,
            format!("expected a string, got {}", kind(other)),
        )),
    }
}

fn optional_id(entry: &RawEntry) -> Result<Option<String>> {
    match entry.fields.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(Error::normalization(
            "id",
            format!("expected a non-empty string or number, got {other}"),
        )),
    }
}

/// Content identifier for entries the platform lists without one.
fn fingerprint(voucher: &str, raw_date: &str, amount: &Decimal, description: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [voucher, raw_date.trim(), &amount.to_string(), description] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &digest[..16])
}
