//! monizze-fetch: authenticated, paginated retrieval of the voucher history

pub mod client;
pub mod pager;
pub mod retry;

pub use client::{DEFAULT_BASE_URL, DEFAULT_HISTORY_PATH, FetchConfig, HttpPageSource};
pub use pager::{DEFAULT_MAX_PAGES, HistoryPages, PageSource};
pub use retry::{Disposition, RetryPolicy, classify};
