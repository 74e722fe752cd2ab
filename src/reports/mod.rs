//! Read-side reports computed from the stored books

pub mod business_week;
pub mod profit_loss;
pub mod weekly;

pub use business_week::*;
pub use profit_loss::*;
pub use weekly::*;
