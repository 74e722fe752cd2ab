//! Commercial documents that feed the ledger and the reports

pub mod book;
pub mod counterparty;
pub mod document;

pub use book::*;
pub use counterparty::*;
pub use document::*;
