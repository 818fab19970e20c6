// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A solver-independent interface to SMT solvers.
//!
//! Formula-construction code is written once against opaque term handles and
//! retargeted to any backend: the [`formula::Backend`] trait captures one
//! solver's term representation, the theory managers in [`theories`] build
//! typed formulas over it, and an [`env::Environment`] owns the symbol table
//! shared by every proving context. Provers are incremental (push/pop) and,
//! on backends that support it, produce Craig interpolants up to full tree
//! interpolation.
//!
//! ```no_run
//! use smtkit::backends::{SmtLibBackend, SolverType};
//! use smtkit::formula::{IntKind, ProverOptions};
//! use smtkit::sorts::{Signature, Sort};
//! use smtkit::Environment;
//!
//! # fn main() -> smtkit::Result<()> {
//! let env = Environment::new(SmtLibBackend::new(SolverType::Z3));
//! let x = env.typed::<IntKind>(env.declare("x", Signature::var(Sort::Int))?)?;
//! let (bools, ints) = (env.bools(), env.ints());
//! let mut prover = env.new_prover(&ProverOptions::default())?;
//! prover.push(&bools.eq(&x, &ints.lit(1)))?;
//! prover.push(&bools.lit(false))?;
//! assert!(prover.is_unsat()?);
//! # Ok(())
//! # }
//! ```

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backends;
pub mod env;
pub mod error;
pub mod formula;
mod interp;
pub mod prover;
pub mod smt2;
pub mod sorts;
pub mod theories;

#[cfg(test)]
pub(crate) mod testutil;

pub use env::Environment;
pub use error::{Error, Result};
pub use formula::{Backend, Bool, Canceler, Int, ProverOptions, Regex, Str, Typed};
pub use prover::Prover;
pub use smtlib::proc::SatResp;
