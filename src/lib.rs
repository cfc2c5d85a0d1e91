//! COUNTER usage reporting for preserved content.
//!
//! Records full-text requests against titles, rolls them up into monthly
//! aggregates and renders COUNTER R4 book and journal reports as CSV or TSV.

pub mod aggregator;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod recorder;
pub mod reports;
pub mod repository;
pub mod schema;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CounterError;
pub use manager::CounterReportsManager;
pub use models::{CounterTitle, LockssId, RequestData, TitleBuilder};
