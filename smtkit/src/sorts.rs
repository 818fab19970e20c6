// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Sorts shared by all backends, and their SMT-LIB rendering.
//!
//! A [`Sort`] is the backend-agnostic type of a term. The translation between
//! sorts and their s-expression rendering is required to be lossless for every
//! sort this crate claims to support; a backend sort with no mapping (for
//! example a solver-internal auxiliary sort) surfaces
//! [`Error::UnsupportedSort`](crate::error::Error::UnsupportedSort) instead of
//! being approximated.

use smtlib::sexp::{app, atom_i, atom_s, Sexp};
use std::fmt;

use crate::error::{Error, Result};

/// The sort of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    /// Booleans
    Bool,
    /// Mathematical (unbounded) integers
    Int,
    /// Rationals
    Real,
    /// Fixed-width bitvectors
    BitVec(u32),
    /// Arrays from an index sort to an element sort
    Array {
        /// Sort of indices
        index: Box<Sort>,
        /// Sort of elements
        element: Box<Sort>,
    },
    /// Unicode strings
    Str,
    /// Regular languages over strings
    Regex,
    /// A sort with no interpretation in this crate's kind system. Terms of
    /// such sorts can be declared and asserted but not wrapped in a typed
    /// formula.
    Uninterpreted(String),
}

impl Sort {
    /// Shorthand for constructing an array sort.
    pub fn array(index: Sort, element: Sort) -> Self {
        Sort::Array {
            index: Box::new(index),
            element: Box::new(element),
        }
    }

    /// Render the sort as an s-expression.
    pub fn sexp(&self) -> Sexp {
        match self {
            Sort::Bool => atom_s("Bool"),
            Sort::Int => atom_s("Int"),
            Sort::Real => atom_s("Real"),
            Sort::BitVec(width) => {
                app("_", [atom_s("BitVec"), atom_i(*width as usize)])
            }
            Sort::Array { index, element } => app("Array", [index.sexp(), element.sexp()]),
            Sort::Str => atom_s("String"),
            Sort::Regex => atom_s("RegLan"),
            Sort::Uninterpreted(name) => atom_s(name),
        }
    }

    /// Translate an s-expression back into a sort. This is the inverse of
    /// [`Sort::sexp`] and fails on anything that is not a sort rendering.
    pub fn from_sexp(s: &Sexp) -> Result<Self> {
        if let Some(name) = s.atom_s() {
            return Ok(match name {
                "Bool" => Sort::Bool,
                "Int" => Sort::Int,
                "Real" => Sort::Real,
                "String" => Sort::Str,
                "RegLan" => Sort::Regex,
                _ => Sort::Uninterpreted(name.to_string()),
            });
        }
        if let Some(("Array", args)) = s.app() {
            if args.len() == 2 {
                return Ok(Sort::array(Self::from_sexp(&args[0])?, Self::from_sexp(&args[1])?));
            }
        }
        if let Some(("_", args)) = s.app() {
            if args.len() == 2 && args[0].atom_s() == Some("BitVec") {
                if let Some(width) = args[1].atom_i() {
                    return Ok(Sort::BitVec(width as u32));
                }
            }
        }
        Err(Error::UnsupportedSort(s.to_string()))
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sexp())
    }
}

/// The signature of a declared symbol: argument sorts (empty for a constant)
/// and a result sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Argument sorts; a plain variable has none.
    pub args: Vec<Sort>,
    /// Result sort.
    pub ret: Sort,
}

impl Signature {
    /// The signature of a plain variable of sort `ret`.
    pub fn var(ret: Sort) -> Self {
        Signature { args: vec![], ret }
    }

    /// The signature of a function.
    pub fn func(args: Vec<Sort>, ret: Sort) -> Self {
        Signature { args, ret }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") {}", self.ret)
    }
}
