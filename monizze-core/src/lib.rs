//! monizze-core: transaction records, the run error taxonomy and the per-run ledger

pub mod error;
pub mod ledger;
pub mod record;
pub mod token;

pub use error::{Error, Result};
pub use ledger::{Admission, Ledger};
pub use record::{MINOR_UNITS, TransactionRecord, TxnDate};
pub use token::BearerToken;
