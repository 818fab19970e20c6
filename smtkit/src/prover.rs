// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The incremental prover: a push/pop assertion stack bound to one proving
//! context, with interpolation over partitions of the asserted formulas.

use std::sync::{Arc, Mutex};

use smtlib::proc::SatResp;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::formula::{Backend, Bool, ProverContext, TermGuard, Typed};
use crate::interp;

/// An assertion stack over one proving context.
///
/// Each `push` opens one stack level and asserts exactly one formula at it,
/// so the stack depth equals the number of recorded formulas. The prover is
/// registered with its [`Environment`] for declaration fan-out until it is
/// closed; dropping the prover closes it.
pub struct Prover<'env, B: Backend> {
    env: &'env Environment<B>,
    id: usize,
    ctx: Arc<Mutex<B::Context>>,
    /// One asserted formula per stack level, oldest first. These handles are
    /// retained and released as levels are pushed and popped.
    asserted: Vec<B::Term>,
    simplify: bool,
    closed: bool,
}

impl<'env, B: Backend> std::fmt::Debug for Prover<'env, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prover")
            .field("id", &self.id)
            .field("depth", &self.asserted.len())
            .field("simplify", &self.simplify)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<'env, B: Backend> Prover<'env, B> {
    pub(crate) fn new(
        env: &'env Environment<B>,
        id: usize,
        ctx: Arc<Mutex<B::Context>>,
        simplify: bool,
    ) -> Self {
        Prover {
            env,
            id,
            ctx,
            asserted: vec![],
            simplify,
            closed: false,
        }
    }

    /// Current stack depth.
    pub fn depth(&self) -> usize {
        self.asserted.len()
    }

    /// Open a new stack level and assert `f` at it.
    ///
    /// Returns the handle that was actually asserted (which differs from
    /// `f` when simplification is enabled); this handle identifies the
    /// formula when building interpolation partitions.
    pub fn push(&mut self, f: &Bool<B>) -> Result<Bool<B>> {
        assert!(!self.closed, "push on a closed prover");
        let mut ctx = self.ctx.lock().unwrap();
        let t = if self.simplify {
            ctx.simplify(f.term())?
        } else {
            f.term().clone()
        };
        ctx.push();
        ctx.assert(&t);
        drop(ctx);
        self.env.backend().retain(&t);
        self.asserted.push(t.clone());
        Ok(Typed::wrap(t))
    }

    /// Discard the most recent stack level and its formula. Calling `pop` at
    /// depth 0 is a programming error.
    pub fn pop(&mut self) {
        assert!(!self.closed, "pop on a closed prover");
        let t = self.asserted.pop().expect("pop called at stack depth 0");
        self.env.backend().release(&t);
        self.ctx.lock().unwrap().pop();
    }

    /// Check whether the asserted formulas are unsatisfiable. An unknown
    /// response surfaces as [`Error::SolverUndecided`], never as a sat or
    /// unsat verdict.
    pub fn is_unsat(&mut self) -> Result<bool> {
        assert!(!self.closed, "is_unsat on a closed prover");
        let start_time = std::time::Instant::now();
        let resp = self.ctx.lock().unwrap().check_sat()?;
        log::debug!(
            "check-sat returned {resp:?} after {}ms ({} assertions)",
            start_time.elapsed().as_millis(),
            self.asserted.len()
        );
        match resp {
            SatResp::Unsat => Ok(true),
            SatResp::Sat => Ok(false),
            SatResp::Unknown(reason) => Err(Error::SolverUndecided(reason)),
        }
    }

    /// Get a model after a sat response.
    pub fn get_model(&mut self) -> Result<B::Term> {
        assert!(!self.closed, "get_model on a closed prover");
        self.ctx.lock().unwrap().get_model()
    }

    /// A handle for cancelling this prover's expensive calls from another
    /// thread.
    pub fn canceler(&self) -> <B::Context as ProverContext>::Canceler {
        self.ctx.lock().unwrap().canceler()
    }

    /// Compute a binary Craig interpolant between `formulas_of_a` and the
    /// rest of the asserted formulas.
    ///
    /// The complement side is the multiset difference: each formula of A is
    /// removed from the asserted formulas exactly once, so a formula pushed
    /// twice can appear once on each side.
    pub fn get_interpolant(&mut self, formulas_of_a: &[Bool<B>]) -> Result<Bool<B>> {
        let mut formulas_of_b: Vec<B::Term> = self.asserted.clone();
        for f in formulas_of_a {
            let pos = formulas_of_b
                .iter()
                .position(|t| t == f.term())
                .ok_or_else(|| {
                    Error::InterpolationPrecondition(format!(
                        "formula {f} of A is not among the asserted formulas"
                    ))
                })?;
            formulas_of_b.remove(pos);
        }
        let formulas_of_a: Vec<B::Term> =
            formulas_of_a.iter().map(|f| f.term().clone()).collect();
        // a binary interpolant is a sequence interpolant over 2 partitions
        let mut interpolants =
            self.tree_interpolants(&[formulas_of_a, formulas_of_b], &[0, 0])?;
        assert_eq!(interpolants.len(), 1);
        Ok(Typed::wrap(interpolants.pop().unwrap()))
    }

    /// Compute sequence interpolants over an ordered partitioning of
    /// asserted formulas: for each cut point, an interpolant between the
    /// partitions before it and the partitions after it.
    pub fn get_seq_interpolants(&mut self, partitions: &[Vec<Bool<B>>]) -> Result<Vec<Bool<B>>> {
        // a tree whose every subtree starts at 0 is a chain
        self.get_tree_interpolants(partitions, &vec![0; partitions.len()])
    }

    /// Compute tree interpolants: one interpolant per internal tree edge, in
    /// post-order. `start_of_subtree[i]` names the leftmost leaf of the
    /// subtree node `i` belongs to; the last node is the root.
    ///
    /// The conjunction of all partitions must be unsatisfiable and the
    /// subtree array must describe a well-formed rooted tree; violations
    /// surface as [`Error::InterpolationPrecondition`].
    pub fn get_tree_interpolants(
        &mut self,
        partitions: &[Vec<Bool<B>>],
        start_of_subtree: &[usize],
    ) -> Result<Vec<Bool<B>>> {
        let partitions: Vec<Vec<B::Term>> = partitions
            .iter()
            .map(|p| p.iter().map(|f| f.term().clone()).collect())
            .collect();
        let interpolants = self.tree_interpolants(&partitions, start_of_subtree)?;
        Ok(interpolants.into_iter().map(Typed::wrap).collect())
    }

    fn tree_interpolants(
        &mut self,
        partitions: &[Vec<B::Term>],
        start_of_subtree: &[usize],
    ) -> Result<Vec<B::Term>> {
        assert!(!self.closed, "interpolation on a closed prover");
        let backend = self.env.backend();
        // every intermediate handle is released when the guard drops, on
        // error paths included
        let mut guard = TermGuard::new(backend);
        let root = interp::build_marked_tree(backend, &mut guard, partitions, start_of_subtree)?;
        let start_time = std::time::Instant::now();
        let interpolants = self.ctx.lock().unwrap().compute_interpolants(&root)?;
        log::debug!(
            "interpolation over {} partitions took {}ms",
            partitions.len(),
            start_time.elapsed().as_millis()
        );
        if interpolants.len() != partitions.len() - 1 {
            return Err(Error::InterpolationPrecondition(format!(
                "expected {} interpolants for {} partitions, solver returned {}",
                partitions.len() - 1,
                partitions.len(),
                interpolants.len()
            )));
        }
        Ok(interpolants)
    }

    /// Roll back all remaining stack levels, release backend resources, and
    /// deregister from the environment. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        while !self.asserted.is_empty() {
            self.pop();
        }
        self.env.deregister(self.id);
        self.closed = true;
    }
}

impl<B: Backend> Drop for Prover<'_, B> {
    fn drop(&mut self) {
        self.close();
    }
}
