// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The backend abstraction: opaque term handles, typed formula wrappers, and
//! the proving-context interface.
//!
//! A [`Backend`] owns one solver's term representation. Terms are opaque
//! handles ([`Backend::Term`]); client code never manipulates them directly
//! but through [`Typed`] wrappers whose kind parameter records the semantic
//! kind of the underlying term. Combining wrappers of the right kinds is
//! statically well-sorted, so the theory managers built on top of this module
//! need no runtime sort checks; checks happen only at the boundary, when an
//! untyped handle (from a declaration or from parsed text) is wrapped.

use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use smtlib::proc::SatResp;
use smtlib::sexp::Sexp;

use crate::error::{Error, Result};
use crate::sorts::{Signature, Sort};

/// Options for creating a proving context.
#[derive(Debug, Clone, Default)]
pub struct ProverOptions {
    /// Request interpolation support. Backends that cannot produce
    /// interpolants refuse context creation instead of failing later.
    pub interpolation: bool,
    /// Ask the solver to simplify each formula before asserting it. The
    /// simplified form is what identifies the formula on the assertion
    /// stack.
    pub simplify: bool,
    /// Per-query time limit in milliseconds.
    pub timeout_ms: Option<usize>,
    /// Random seed.
    pub seed: usize,
    /// Directory to save queries to, for debugging.
    pub tee: Option<PathBuf>,
}

/// A handle for cancelling a long-running solver query from another thread.
pub trait Canceler: Clone + Send + 'static {
    /// Signal cancellation. An in-flight expensive call fails with
    /// [`Error::Cancelled`]; later expensive calls fail immediately.
    fn cancel(&self);
    /// Check whether cancellation has been requested.
    fn is_canceled(&self) -> bool;
}

/// One solver's term representation and term constructors.
///
/// Construction methods are pure with respect to the backend (they build
/// terms, they do not change any proving context). Backends whose native
/// representation is reference-counted implement [`Backend::retain`] and
/// [`Backend::release`]; the defaults are no-ops.
#[allow(missing_docs)] // the theory constructors are self-describing
pub trait Backend {
    /// Opaque handle to one term.
    type Term: Clone + PartialEq + fmt::Debug + fmt::Display;
    /// Proving context type created by [`Backend::new_context`].
    type Context: ProverContext<Term = Self::Term>;

    /// Name of the backend, for error reporting.
    fn name(&self) -> String;

    /// Create a fresh proving context.
    fn new_context(&self, opts: &ProverOptions) -> Result<Self::Context>;

    /// Increment the reference count of a handle.
    fn retain(&self, _t: &Self::Term) {}
    /// Decrement the reference count of a handle.
    fn release(&self, _t: &Self::Term) {}

    /// Compute the sort of a term. Free symbols are resolved through
    /// `lookup`; a term over sorts this layer cannot express is an
    /// [`Error::UnsupportedSort`].
    fn sort_of(
        &self,
        t: &Self::Term,
        lookup: &dyn Fn(&str) -> Option<Signature>,
    ) -> Result<Sort>;

    /// Render a term as an s-expression.
    fn to_sexp(&self, t: &Self::Term) -> Sexp;
    /// Translate a parsed s-expression into a term handle.
    fn from_sexp(&self, s: &Sexp) -> Result<Self::Term>;

    /// Reference a declared symbol.
    fn var(&self, name: &str) -> Self::Term;
    /// Apply a declared function.
    fn apply(&self, name: &str, args: &[Self::Term]) -> Self::Term;
    /// Wrap a formula as an interpolation point for tree interpolation.
    fn mark_interpolant(&self, t: &Self::Term) -> Self::Term;

    fn bool_lit(&self, b: bool) -> Self::Term;
    fn not(&self, t: &Self::Term) -> Self::Term;
    fn and(&self, args: &[Self::Term]) -> Self::Term;
    fn or(&self, args: &[Self::Term]) -> Self::Term;
    fn implies(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn iff(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn xor(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn ite(&self, cond: &Self::Term, then: &Self::Term, else_: &Self::Term) -> Self::Term;
    fn eq(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn distinct(&self, args: &[Self::Term]) -> Self::Term;

    fn int_lit(&self, i: i64) -> Self::Term;
    fn add(&self, args: &[Self::Term]) -> Self::Term;
    fn sub(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn mul(&self, args: &[Self::Term]) -> Self::Term;
    fn neg(&self, t: &Self::Term) -> Self::Term;
    fn lt(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn le(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn gt(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn ge(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;

    fn str_lit(&self, s: &str) -> Self::Term;
    fn str_concat(&self, args: &[Self::Term]) -> Self::Term;
    fn str_len(&self, s: &Self::Term) -> Self::Term;
    fn str_contains(&self, s: &Self::Term, sub: &Self::Term) -> Self::Term;
    fn str_prefix(&self, prefix: &Self::Term, s: &Self::Term) -> Self::Term;
    fn str_suffix(&self, suffix: &Self::Term, s: &Self::Term) -> Self::Term;
    fn str_at(&self, s: &Self::Term, i: &Self::Term) -> Self::Term;
    fn str_substr(&self, s: &Self::Term, offset: &Self::Term, len: &Self::Term) -> Self::Term;
    fn str_index_of(&self, s: &Self::Term, sub: &Self::Term, start: &Self::Term) -> Self::Term;
    fn str_replace(&self, s: &Self::Term, target: &Self::Term, to: &Self::Term) -> Self::Term;
    fn str_replace_all(&self, s: &Self::Term, target: &Self::Term, to: &Self::Term)
        -> Self::Term;
    fn str_lt(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn str_le(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn str_to_int(&self, s: &Self::Term) -> Self::Term;
    fn str_from_int(&self, i: &Self::Term) -> Self::Term;
    fn str_in_re(&self, s: &Self::Term, re: &Self::Term) -> Self::Term;

    fn re_lit(&self, s: &Self::Term) -> Self::Term;
    fn re_none(&self) -> Self::Term;
    fn re_all(&self) -> Self::Term;
    fn re_allchar(&self) -> Self::Term;
    fn re_range(&self, lo: &Self::Term, hi: &Self::Term) -> Self::Term;
    fn re_union(&self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn re_concat(&self, args: &[Self::Term]) -> Self::Term;
    fn re_star(&self, r: &Self::Term) -> Self::Term;

    /// Complement of a regular language. Fallible because not every backend
    /// has complementation.
    fn re_comp(&self, r: &Self::Term) -> Result<Self::Term>;

    /// Intersection of two regular languages. The default builds it from
    /// complement and union; backends with a native operator override this.
    fn re_inter(&self, a: &Self::Term, b: &Self::Term) -> Result<Self::Term> {
        let na = self.re_comp(a)?;
        let nb = self.re_comp(b)?;
        self.re_comp(&self.re_union(&na, &nb))
    }

    /// Difference of two regular languages: exactly the strings accepted by
    /// `a` and rejected by `b`. The default builds it from intersection and
    /// complement; backends with a native operator override this.
    fn re_diff(&self, a: &Self::Term, b: &Self::Term) -> Result<Self::Term> {
        let nb = self.re_comp(b)?;
        self.re_inter(a, &nb)
    }

    fn select(&self, array: &Self::Term, index: &Self::Term) -> Self::Term;
    fn store(&self, array: &Self::Term, index: &Self::Term, value: &Self::Term) -> Self::Term;
    /// A constant array over the given index sort, mapping every index to
    /// `value`.
    fn array_const(&self, index: &Sort, element: &Sort, value: &Self::Term) -> Self::Term;
}

/// One solver instance with an incremental assertion stack.
///
/// All calls are synchronous and block for the duration of the backend
/// computation; only the expensive calls (satisfiability, models,
/// interpolants) can be interrupted through the context's [`Canceler`].
pub trait ProverContext {
    /// Term handle type, matching the owning backend's.
    type Term: Clone;
    /// Cancellation handle type.
    type Canceler: Canceler;

    /// Declare a symbol in this context.
    fn declare(&mut self, name: &str, sig: &Signature);
    /// Assert a boolean term at the current stack level.
    fn assert(&mut self, t: &Self::Term);
    /// Open a new assertion level.
    fn push(&mut self);
    /// Discard the most recent assertion level.
    fn pop(&mut self);
    /// Check satisfiability of the current assertions.
    fn check_sat(&mut self) -> Result<SatResp>;
    /// Get a model after a sat response.
    fn get_model(&mut self) -> Result<Self::Term>;
    /// Ask the solver to simplify a term. The identity simplification is a
    /// valid default.
    fn simplify(&mut self, t: &Self::Term) -> Result<Self::Term> {
        Ok(t.clone())
    }
    /// Get a cancellation handle for this context.
    fn canceler(&self) -> Self::Canceler;
    /// Compute tree interpolants for a fully-marked root formula, in
    /// post-order. The asserted conjunction must be unsatisfiable; a sat
    /// response is an [`Error::InterpolationPrecondition`] and unknown is
    /// [`Error::SolverUndecided`].
    fn compute_interpolants(&mut self, root: &Self::Term) -> Result<Vec<Self::Term>>;
}

/// The semantic kind of a typed formula. Implementors are zero-sized marker
/// types; `matches` relates the kind to backend sorts.
pub trait Kind: 'static {
    /// Kind name used in error messages.
    const NAME: &'static str;
    /// Whether a backend sort belongs to this kind.
    fn matches(sort: &Sort) -> bool;
}

/// Marker for boolean formulas.
pub struct BoolKind;
/// Marker for integer formulas.
pub struct IntKind;
/// Marker for rational formulas.
pub struct RealKind;
/// Marker for string formulas.
pub struct StrKind;
/// Marker for regular-language formulas.
pub struct ReKind;
/// Marker for bitvector formulas of any width.
pub struct BitVecKind;
/// Marker for array formulas with index kind `I` and element kind `E`.
pub struct ArrayKind<I, E>(PhantomData<(I, E)>);

impl Kind for BoolKind {
    const NAME: &'static str = "Bool";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::Bool)
    }
}

impl Kind for IntKind {
    const NAME: &'static str = "Int";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::Int)
    }
}

impl Kind for RealKind {
    const NAME: &'static str = "Real";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::Real)
    }
}

impl Kind for StrKind {
    const NAME: &'static str = "String";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::Str)
    }
}

impl Kind for ReKind {
    const NAME: &'static str = "RegLan";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::Regex)
    }
}

impl Kind for BitVecKind {
    const NAME: &'static str = "BitVec";
    fn matches(sort: &Sort) -> bool {
        matches!(sort, Sort::BitVec(_))
    }
}

impl<I: Kind, E: Kind> Kind for ArrayKind<I, E> {
    const NAME: &'static str = "Array";
    fn matches(sort: &Sort) -> bool {
        match sort {
            Sort::Array { index, element } => I::matches(index) && E::matches(element),
            _ => false,
        }
    }
}

/// A term handle tagged with its semantic kind.
///
/// The tag is maintained by construction: theory managers only produce a
/// `Typed<B, K>` when the underlying term has a sort matching `K`, and the
/// checked constructor verifies the sort for handles arriving from outside
/// (declarations, parsed text).
pub struct Typed<B: Backend, K> {
    term: B::Term,
    kind: PhantomData<K>,
}

/// A boolean formula.
pub type Bool<B> = Typed<B, BoolKind>;
/// An integer formula.
pub type Int<B> = Typed<B, IntKind>;
/// A string formula.
pub type Str<B> = Typed<B, StrKind>;
/// A regular-language formula.
pub type Regex<B> = Typed<B, ReKind>;
/// An array formula.
pub type Array<B, I, E> = Typed<B, ArrayKind<I, E>>;

impl<B: Backend, K> Typed<B, K> {
    /// Wrap a handle without checking its sort. Callers must guarantee the
    /// kind invariant.
    pub(crate) fn wrap(term: B::Term) -> Self {
        Typed {
            term,
            kind: PhantomData,
        }
    }

    /// Borrow the underlying handle.
    pub fn term(&self) -> &B::Term {
        &self.term
    }

    /// Unwrap into the underlying handle.
    pub fn into_term(self) -> B::Term {
        self.term
    }
}

impl<B: Backend, K: Kind> Typed<B, K> {
    /// Wrap a handle, verifying that its sort matches the kind `K`.
    pub fn checked(
        backend: &B,
        term: B::Term,
        lookup: &dyn Fn(&str) -> Option<Signature>,
    ) -> Result<Self> {
        let sort = backend.sort_of(&term, lookup)?;
        if K::matches(&sort) {
            Ok(Self::wrap(term))
        } else {
            Err(Error::TypeMismatch {
                term: term.to_string(),
                expected: K::NAME,
                actual: sort,
            })
        }
    }
}

impl<B: Backend, K> Clone for Typed<B, K> {
    fn clone(&self) -> Self {
        Self::wrap(self.term.clone())
    }
}

impl<B: Backend, K> PartialEq for Typed<B, K> {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl<B: Backend, K> fmt::Debug for Typed<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.term)
    }
}

impl<B: Backend, K> fmt::Display for Typed<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

/// Scoped ownership of reference-counted handles.
///
/// Every handle given to [`TermGuard::hold`] is retained immediately and
/// released when the guard is dropped, on success and error paths alike.
pub struct TermGuard<'a, B: Backend> {
    backend: &'a B,
    terms: Vec<B::Term>,
}

impl<'a, B: Backend> TermGuard<'a, B> {
    /// Create an empty guard.
    pub fn new(backend: &'a B) -> Self {
        TermGuard {
            backend,
            terms: vec![],
        }
    }

    /// Retain a handle for the lifetime of the guard and pass it back.
    pub fn hold(&mut self, t: B::Term) -> B::Term {
        self.backend.retain(&t);
        self.terms.push(t.clone());
        t
    }
}

impl<B: Backend> Drop for TermGuard<'_, B> {
    fn drop(&mut self) {
        for t in &self.terms {
            self.backend.release(t);
        }
    }
}
