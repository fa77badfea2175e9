use thiserror::Error;

/// Failure kinds surfaced by fallible dispatcher operations.
///
/// Mirrors the three-kind status enum from the embedding contract: allocation
/// failure, bad input, and a state conflict. Every other misuse (double
/// unbind, unbind of an unknown callback, re-requesting destroy) is a silent
/// no-op rather than an error, by design.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// An allocation (binding, event record, moment, or pool cell) could not
    /// be performed. Never leaves partial state behind: the caller's request
    /// is rolled back in full.
    #[error("allocation failed")]
    NoMemory,
    /// An argument was structurally invalid, e.g. an empty event name.
    #[error("invalid argument")]
    InvalidArg,
    /// The dispatcher's state forbids the request, e.g. a duplicate event
    /// name.
    #[error("invalid dispatcher state")]
    InvalidState,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, DispatchError>;
