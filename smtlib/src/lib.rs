// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Low-level, sexp-based interface to an SMT solver subprocess.
//!
//! The solver is driven over pipes in the SMT-LIB2 text format. The only
//! solver-specific knowledge lives in [`conf`]: the binary name, its
//! command-line arguments, and the startup options each solver needs.
//! Everything above that (assertion stacks, declarations, interpolation
//! requests) is expressed as plain s-expressions through [`proc::SmtProc`].

#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![deny(clippy::uninlined_format_args)]
// documentation lints, checked by rustdoc
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod conf;
pub mod path;
pub mod proc;
pub mod sexp;
mod tee;
