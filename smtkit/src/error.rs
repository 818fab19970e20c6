// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Errors surfaced by the solver-independent layer.

use smtlib::proc::SolverError;
use thiserror::Error;

use crate::sorts::{Signature, Sort};

/// An error from the solver-independent layer or from the underlying solver.
#[derive(Error, Debug)]
pub enum Error {
    /// A term was used at a kind that does not match its sort. This is a
    /// programming error in the caller; it is reported rather than panicking
    /// so that terms obtained by parsing untrusted input can be checked.
    #[error("term {term} has sort {actual} but was used as {expected}")]
    TypeMismatch {
        /// Rendering of the offending term
        term: String,
        /// Kind the caller asked for
        expected: &'static str,
        /// Sort the term actually has
        actual: Sort,
    },
    /// A sort with no mapping in this layer (reported, never approximated).
    #[error("sort {0} is not supported")]
    UnsupportedSort(String),
    /// An operation the backend cannot express (reported, never approximated).
    #[error("operation {op} is not supported by backend {backend}")]
    UnsupportedOperation {
        /// Name of the requested operation
        op: &'static str,
        /// Name of the backend that cannot express it
        backend: String,
    },
    /// A symbol was redeclared with a different signature.
    #[error("symbol {name} already declared with signature {declared}, redeclared as {requested}")]
    SymbolRedeclaration {
        /// The symbol name
        name: String,
        /// Signature recorded at first declaration
        declared: Signature,
        /// Signature of the conflicting declaration
        requested: Signature,
    },
    /// The solver returned unknown for a satisfiability query. Never coerced
    /// to sat or unsat.
    #[error("solver returned unknown: {0}")]
    SolverUndecided(String),
    /// Interpolation was requested over a satisfiable or malformed
    /// partitioning.
    #[error("interpolation precondition violated: {0}")]
    InterpolationPrecondition(String),
    /// The query was cancelled externally.
    #[error("query was cancelled")]
    Cancelled,
    /// A malformed term or script was given to a parsing entry point.
    #[error("could not parse: {0}")]
    Parse(String),
    /// An error from the solver process itself.
    #[error("solver failed: {0}")]
    Solver(SolverError),
}

impl From<SolverError> for Error {
    fn from(err: SolverError) -> Self {
        // a kill is a cancellation the solver noticed first
        match err {
            SolverError::Killed => Error::Cancelled,
            err => Error::Solver(err),
        }
    }
}

/// Alias for `Result` with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
