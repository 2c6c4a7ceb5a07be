#![deny(missing_docs)]
//! Registration sessions, batch registration and control point ledgers.

/// batch registration over many files.
pub mod batch;

/// Error types for the session module.
pub mod error;

/// control point ledger persistence.
pub mod ledger;

/// interactive registration session state.
pub mod session;

pub use crate::batch::{
    BatchContext, BatchJob, BatchOutcome, BatchReport, CancelToken, ProgressCallback,
};
pub use crate::error::SessionError;
pub use crate::ledger::{LedgerEntry, LedgerError, LedgerWarning};
pub use crate::session::RegistrationSession;
