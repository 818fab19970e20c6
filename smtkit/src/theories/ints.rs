// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Linear integer arithmetic.

use crate::formula::{Backend, Bool, Int, Typed};

/// Manager for integer arithmetic.
pub struct Ints<'a, B: Backend> {
    backend: &'a B,
}

#[allow(missing_docs)] // arithmetic operations are self-describing
impl<'a, B: Backend> Ints<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Ints { backend }
    }

    /// An integer literal.
    pub fn lit(&self, i: i64) -> Int<B> {
        Typed::wrap(self.backend.int_lit(i))
    }

    /// N-ary sum. Zero summands is the literal `0`; a single summand is
    /// returned unchanged.
    pub fn add(&self, ts: &[Int<B>]) -> Int<B> {
        match ts {
            [] => self.lit(0),
            [t] => t.clone(),
            _ => {
                let args: Vec<_> = ts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.add(&args))
            }
        }
    }

    pub fn sub(&self, a: &Int<B>, b: &Int<B>) -> Int<B> {
        Typed::wrap(self.backend.sub(a.term(), b.term()))
    }

    /// N-ary product. Zero factors is the literal `1`; a single factor is
    /// returned unchanged.
    pub fn mul(&self, ts: &[Int<B>]) -> Int<B> {
        match ts {
            [] => self.lit(1),
            [t] => t.clone(),
            _ => {
                let args: Vec<_> = ts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.mul(&args))
            }
        }
    }

    pub fn neg(&self, t: &Int<B>) -> Int<B> {
        Typed::wrap(self.backend.neg(t.term()))
    }

    pub fn lt(&self, a: &Int<B>, b: &Int<B>) -> Bool<B> {
        Typed::wrap(self.backend.lt(a.term(), b.term()))
    }

    pub fn le(&self, a: &Int<B>, b: &Int<B>) -> Bool<B> {
        Typed::wrap(self.backend.le(a.term(), b.term()))
    }

    pub fn gt(&self, a: &Int<B>, b: &Int<B>) -> Bool<B> {
        Typed::wrap(self.backend.gt(a.term(), b.term()))
    }

    pub fn ge(&self, a: &Int<B>, b: &Int<B>) -> Bool<B> {
        Typed::wrap(self.backend.ge(a.term(), b.term()))
    }
}
