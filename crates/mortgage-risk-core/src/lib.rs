pub mod affordability;
pub mod amortization;
pub mod error;
pub mod formulas;
pub mod risk;
pub mod scenario;
pub mod sensitivity;
pub mod types;

#[cfg(feature = "session")]
pub mod session;

#[cfg(feature = "report")]
pub mod report;

pub use error::MortgageError;
pub use types::*;

/// Standard result type for all mortgage-risk operations
pub type MortgageResult<T> = Result<T, MortgageError>;
