//! Fixed-schema CSV writer.
//!
//! Columns: date, voucher, amount, description, balance, transaction_id.
//! UTF-8, comma separated, `\n` line endings, header always written.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::info;
use monizze_core::{Result, TransactionRecord};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::atomic::write_atomically;

pub const COLUMNS: [&str; 6] = [
    "date",
    "voucher",
    "amount",
    "description",
    "balance",
    "transaction_id",
];

#[derive(Serialize)]
struct Row<'a> {
    date: String,
    voucher: &'a str,
    amount: String,
    description: &'a str,
    balance: String,
    transaction_id: &'a str,
}

impl<'a> From<&'a TransactionRecord> for Row<'a> {
    fn from(r: &'a TransactionRecord) -> Self {
        Row {
            date: r.date.to_string(),
            voucher: &r.voucher,
            amount: r.amount.to_string(),
            description: &r.description,
            balance: r.balance.map(|b| b.to_string()).unwrap_or_default(),
            transaction_id: &r.transaction_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter {
    /// Quote every field instead of only those that need it
    pub quote_all: bool,
}

impl CsvExporter {
    pub fn new(quote_all: bool) -> Self {
        Self { quote_all }
    }

    /// Serialize `records` in the given order to `out`.
    pub fn write<W: Write>(&self, out: W, records: &[TransactionRecord]) -> csv::Result<()> {
        let style = if self.quote_all {
            QuoteStyle::Always
        } else {
            QuoteStyle::Necessary
        };
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .quote_style(style)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);

        wtr.write_record(COLUMNS)?;
        for record in records {
            wtr.serialize(Row::from(record))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the export to `dest` atomically.
    pub fn export(&self, records: &[TransactionRecord], dest: &Path) -> Result<()> {
        write_atomically(dest, |out| {
            self.write(out, records).map_err(io::Error::from)
        })?;
        info!("wrote {} rows to {}", records.len(), dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use monizze_core::TxnDate;
    use rust_decimal_macros::dec;

    fn record() -> TransactionRecord {
        TransactionRecord {
            transaction_id: "T1".into(),
            date: TxnDate::Day(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            voucher: "meal".into(),
            amount: dec!(-12.50),
            description: "Resto \"Chez Nous\", Liège".into(),
            balance: Some(dec!(30.00)),
        }
    }

    fn render(exporter: CsvExporter, records: &[TransactionRecord]) -> String {
        let mut buf = Vec::new();
        exporter.write(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(
            render(CsvExporter::default(), &[]),
            "date,voucher,amount,description,balance,transaction_id\n"
        );
    }

    #[test]
    fn test_escaping_and_precision() {
        let out = render(CsvExporter::default(), &[record()]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[1],
            r#"2024-04-01,meal,-12.50,"Resto ""Chez Nous"", Liège",30.00,T1"#
        );
    }

    #[test]
    fn test_newline_in_description_is_quoted() {
        let mut r = record();
        r.description = "line one\nline two".into();
        r.balance = None;
        let out = render(CsvExporter::default(), &[r]);
        assert!(out.ends_with("2024-04-01,meal,-12.50,\"line one\nline two\",,T1\n"));
    }

    #[test]
    fn test_quote_all() {
        let out = render(CsvExporter::new(true), &[record()]);
        assert!(out.starts_with("\"date\",\"voucher\",\"amount\""));
        assert!(out.contains("\"-12.50\""));
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("history.csv");
        CsvExporter::default().export(&[record()], &dest).unwrap();

        let mut rdr = csv::Reader::from_path(&dest).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);
        assert_eq!(rdr.records().count(), 1);
    }
}
