// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Unicode strings and regular languages.
//!
//! The regex surface is deliberately larger than what most backends provide
//! natively: `cross`, `optional`, and `times` are derived compositionally
//! from concatenation, closure, and union, so a backend only has to supply
//! the primitives. Intersection and difference are genuine intersection and
//! difference; they go through the backend's fallible operators since both
//! reduce to complementation, which not every backend has.

use crate::error::Result;
use crate::formula::{Backend, Bool, Int, Regex, Str, Typed};

/// Manager for the string and regular-language theories.
pub struct Strings<'a, B: Backend> {
    backend: &'a B,
}

#[allow(missing_docs)] // most operations mirror their SMT-LIB counterparts
impl<'a, B: Backend> Strings<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Strings { backend }
    }

    /// A string literal.
    pub fn lit(&self, s: &str) -> Str<B> {
        Typed::wrap(self.backend.str_lit(s))
    }

    /// N-ary concatenation. Zero parts is the empty string; a single part is
    /// returned unchanged rather than wrapped in a backend node.
    pub fn concat(&self, parts: &[Str<B>]) -> Str<B> {
        match parts {
            [] => self.lit(""),
            [part] => part.clone(),
            _ => {
                let args: Vec<_> = parts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.str_concat(&args))
            }
        }
    }

    pub fn len(&self, s: &Str<B>) -> Int<B> {
        Typed::wrap(self.backend.str_len(s.term()))
    }

    pub fn contains(&self, s: &Str<B>, sub: &Str<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_contains(s.term(), sub.term()))
    }

    pub fn prefix(&self, prefix: &Str<B>, s: &Str<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_prefix(prefix.term(), s.term()))
    }

    pub fn suffix(&self, suffix: &Str<B>, s: &Str<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_suffix(suffix.term(), s.term()))
    }

    /// The character at `i`, or the empty string when `i` is out of range.
    pub fn char_at(&self, s: &Str<B>, i: &Int<B>) -> Str<B> {
        Typed::wrap(self.backend.str_at(s.term(), i.term()))
    }

    pub fn substring(&self, s: &Str<B>, offset: &Int<B>, len: &Int<B>) -> Str<B> {
        Typed::wrap(self.backend.str_substr(s.term(), offset.term(), len.term()))
    }

    /// Index of the first occurrence of `sub` at or after `start`, or -1.
    pub fn index_of(&self, s: &Str<B>, sub: &Str<B>, start: &Int<B>) -> Int<B> {
        Typed::wrap(self.backend.str_index_of(s.term(), sub.term(), start.term()))
    }

    /// Replace the first occurrence of `target`.
    pub fn replace(&self, s: &Str<B>, target: &Str<B>, to: &Str<B>) -> Str<B> {
        Typed::wrap(self.backend.str_replace(s.term(), target.term(), to.term()))
    }

    /// Replace every occurrence of `target`.
    pub fn replace_all(&self, s: &Str<B>, target: &Str<B>, to: &Str<B>) -> Str<B> {
        Typed::wrap(self.backend.str_replace_all(s.term(), target.term(), to.term()))
    }

    pub fn lt(&self, a: &Str<B>, b: &Str<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_lt(a.term(), b.term()))
    }

    pub fn le(&self, a: &Str<B>, b: &Str<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_le(a.term(), b.term()))
    }

    /// Interpret a string as a non-negative decimal integer (-1 if it is not
    /// one).
    pub fn to_int(&self, s: &Str<B>) -> Int<B> {
        Typed::wrap(self.backend.str_to_int(s.term()))
    }

    /// Render a non-negative integer in decimal (empty string for negatives).
    pub fn from_int(&self, i: &Int<B>) -> Str<B> {
        Typed::wrap(self.backend.str_from_int(i.term()))
    }

    /// Language membership.
    pub fn in_regex(&self, s: &Str<B>, re: &Regex<B>) -> Bool<B> {
        Typed::wrap(self.backend.str_in_re(s.term(), re.term()))
    }

    // Regular languages.

    /// The language containing exactly the given string.
    pub fn regex(&self, value: &str) -> Regex<B> {
        Typed::wrap(self.backend.re_lit(&self.backend.str_lit(value)))
    }

    /// The empty language.
    pub fn none(&self) -> Regex<B> {
        Typed::wrap(self.backend.re_none())
    }

    /// The language of all strings.
    pub fn all(&self) -> Regex<B> {
        Typed::wrap(self.backend.re_all())
    }

    /// The language of all single-character strings.
    pub fn all_char(&self) -> Regex<B> {
        Typed::wrap(self.backend.re_allchar())
    }

    /// Single characters between `lo` and `hi` inclusive.
    pub fn range(&self, lo: &Str<B>, hi: &Str<B>) -> Regex<B> {
        Typed::wrap(self.backend.re_range(lo.term(), hi.term()))
    }

    pub fn union(&self, a: &Regex<B>, b: &Regex<B>) -> Regex<B> {
        Typed::wrap(self.backend.re_union(a.term(), b.term()))
    }

    /// N-ary language concatenation. Zero parts is the empty language; a
    /// single part is returned unchanged.
    pub fn concat_regex(&self, parts: &[Regex<B>]) -> Regex<B> {
        match parts {
            [] => self.none(),
            [part] => part.clone(),
            _ => {
                let args: Vec<_> = parts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.re_concat(&args))
            }
        }
    }

    /// Kleene closure (zero or more repetitions).
    pub fn closure(&self, r: &Regex<B>) -> Regex<B> {
        Typed::wrap(self.backend.re_star(r.term()))
    }

    /// One or more repetitions, derived as `r · r*`.
    pub fn cross(&self, r: &Regex<B>) -> Regex<B> {
        self.concat_regex(&[r.clone(), self.closure(r)])
    }

    /// Zero or one occurrence, derived as `r ∪ {""}`.
    pub fn optional(&self, r: &Regex<B>) -> Regex<B> {
        self.union(r, &self.regex(""))
    }

    /// Exactly `repetitions` occurrences, derived by repeated concatenation.
    pub fn times(&self, r: &Regex<B>, repetitions: usize) -> Regex<B> {
        self.concat_regex(&vec![r.clone(); repetitions])
    }

    pub fn complement(&self, r: &Regex<B>) -> Result<Regex<B>> {
        Ok(Typed::wrap(self.backend.re_comp(r.term())?))
    }

    /// Strings accepted by both languages.
    pub fn intersection(&self, a: &Regex<B>, b: &Regex<B>) -> Result<Regex<B>> {
        Ok(Typed::wrap(self.backend.re_inter(a.term(), b.term())?))
    }

    /// Strings accepted by `a` and rejected by `b`.
    pub fn difference(&self, a: &Regex<B>, b: &Regex<B>) -> Result<Regex<B>> {
        Ok(Typed::wrap(self.backend.re_diff(a.term(), b.term())?))
    }
}
