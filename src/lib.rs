//! # Trading Ledger Core
//!
//! Double-entry books and period reporting for a branch-based trading business.
//!
//! ## Features
//!
//! - **Double-entry posting**: every journal entry debits one head and credits another by the same amount
//! - **Account balances**: maintained from each head's normal side, reconcilable against the journal
//! - **Commerce documents**: sales, purchases and customer/supplier dues
//! - **Profit and loss**: revenue, cost of goods sold, expenses and margins over a date range
//! - **Business weeks**: Saturday to Thursday weekly summaries with week-over-week growth
//! - **Storage abstraction**: trait-based storage with an in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trading_ledger_core::BusinessWeekResolver;
//!
//! // Friday is the weekly holiday and rolls back to the week that just ended
//! let friday = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
//! let week = BusinessWeekResolver::default().resolve(friday).unwrap();
//! assert_eq!(week.first_day(), NaiveDate::from_ymd_opt(2025, 12, 13).unwrap());
//! assert_eq!(week.last_day(), NaiveDate::from_ymd_opt(2025, 12, 18).unwrap());
//! ```

pub mod commerce;
pub mod config;
pub mod ledger;
pub mod reports;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use commerce::*;
pub use config::*;
pub use ledger::*;
pub use reports::*;
pub use telemetry::init_tracing;
pub use traits::*;
pub use types::*;

// Re-export posting patterns for convenience
pub use ledger::poster::patterns;
