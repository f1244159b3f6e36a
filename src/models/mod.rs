//! Data models for Biblos

pub mod author;
pub mod book;
pub mod category;
pub mod copy;
pub mod loan;
pub mod loanee;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookShort, CreateBook, UpdateBook};
pub use category::Category;
pub use copy::{CopyStatus, CopyWithStatus, StatusTally};
pub use loan::{DurationUnit, Loan, LoanDetails, LoanPeriod};
pub use loanee::{Loanee, LoaneeLoans};
pub use user::{User, UserClaims};
