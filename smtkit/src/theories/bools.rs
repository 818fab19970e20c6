// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Boolean connectives, equality, and if-then-else.

use crate::formula::{Backend, Bool, Kind, Typed};

/// Manager for the core boolean theory.
pub struct Bools<'a, B: Backend> {
    backend: &'a B,
}

#[allow(missing_docs)] // connectives are self-describing
impl<'a, B: Backend> Bools<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Bools { backend }
    }

    /// A boolean literal.
    pub fn lit(&self, b: bool) -> Bool<B> {
        Typed::wrap(self.backend.bool_lit(b))
    }

    pub fn not(&self, t: &Bool<B>) -> Bool<B> {
        Typed::wrap(self.backend.not(t.term()))
    }

    /// N-ary conjunction. Zero conjuncts is `true`; a single conjunct is
    /// returned unchanged rather than wrapped in a backend node.
    pub fn and(&self, ts: &[Bool<B>]) -> Bool<B> {
        match ts {
            [] => self.lit(true),
            [t] => t.clone(),
            _ => {
                let args: Vec<_> = ts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.and(&args))
            }
        }
    }

    /// N-ary disjunction, with the same degenerate cases as [`Bools::and`].
    pub fn or(&self, ts: &[Bool<B>]) -> Bool<B> {
        match ts {
            [] => self.lit(false),
            [t] => t.clone(),
            _ => {
                let args: Vec<_> = ts.iter().map(|t| t.term().clone()).collect();
                Typed::wrap(self.backend.or(&args))
            }
        }
    }

    pub fn implies(&self, a: &Bool<B>, b: &Bool<B>) -> Bool<B> {
        Typed::wrap(self.backend.implies(a.term(), b.term()))
    }

    pub fn iff(&self, a: &Bool<B>, b: &Bool<B>) -> Bool<B> {
        Typed::wrap(self.backend.iff(a.term(), b.term()))
    }

    pub fn xor(&self, a: &Bool<B>, b: &Bool<B>) -> Bool<B> {
        Typed::wrap(self.backend.xor(a.term(), b.term()))
    }

    /// Equality at any kind.
    pub fn eq<K: Kind>(&self, a: &Typed<B, K>, b: &Typed<B, K>) -> Bool<B> {
        Typed::wrap(self.backend.eq(a.term(), b.term()))
    }

    /// Pairwise distinctness at any kind.
    pub fn distinct<K: Kind>(&self, ts: &[Typed<B, K>]) -> Bool<B> {
        let args: Vec<_> = ts.iter().map(|t| t.term().clone()).collect();
        Typed::wrap(self.backend.distinct(&args))
    }

    /// If-then-else at any kind.
    pub fn ite<K: Kind>(
        &self,
        cond: &Bool<B>,
        then: &Typed<B, K>,
        else_: &Typed<B, K>,
    ) -> Typed<B, K> {
        Typed::wrap(self.backend.ite(cond.term(), then.term(), else_.term()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::BoolKind;
    use crate::testutil::ScriptedBackend;

    fn bool_var(backend: &ScriptedBackend, name: &str) -> Bool<ScriptedBackend> {
        Typed::<_, BoolKind>::wrap(backend.var(name))
    }

    #[test]
    fn test_degenerate_connectives() {
        let backend = ScriptedBackend::new();
        let bools = Bools::new(&backend);
        let p = bool_var(&backend, "p");
        let q = bool_var(&backend, "q");
        assert_eq!(bools.and(&[]), bools.lit(true));
        assert_eq!(bools.or(&[]), bools.lit(false));
        // single operands come back as the same handle
        assert_eq!(bools.and(&[p.clone()]), p);
        assert_eq!(bools.or(&[q.clone()]), q);
        insta::assert_display_snapshot!(bools.and(&[p.clone(), q.clone()]), @"(and p q)");
        insta::assert_display_snapshot!(bools.implies(&p, &q), @"(=> p q)");
    }
}
