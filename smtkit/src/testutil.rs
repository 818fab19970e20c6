// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A scripted backend for tests.
//!
//! Terms are plain s-expressions, expensive solver responses are replayed
//! from a queue, every context logs the commands it receives, and
//! reference-count traffic is observable, which makes leak checks and
//! fan-out checks possible without a solver binary.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use smtlib::proc::SatResp;
use smtlib::sexp::{app, Sexp};

use crate::error::{Error, Result};
use crate::formula::{Backend, Canceler, ProverContext, ProverOptions};
use crate::smt2;
use crate::sorts::Signature;

/// Scripted response for one `compute_interpolants` call.
pub enum ScriptedInterpolants {
    /// The query was unsat; these are the interpolants, in post-order.
    Unsat(Vec<Sexp>),
    /// The query was satisfiable.
    Sat,
    /// The solver gave up, with a reason.
    Unknown(String),
}

#[derive(Default)]
struct Script {
    sat_results: VecDeque<SatResp>,
    interpolants: VecDeque<ScriptedInterpolants>,
    /// Commands seen by all contexts, tagged with the context id.
    log: Vec<String>,
}

/// A backend whose solver responses come from a script.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Rc<RefCell<Script>>,
    refcount: Rc<Cell<i64>>,
    next_ctx: Rc<Cell<usize>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next `check_sat`. Defaults to sat when the
    /// queue is empty.
    pub fn script_sat(&self, resp: SatResp) {
        self.script.borrow_mut().sat_results.push_back(resp);
    }

    /// Queue the response for the next `compute_interpolants`.
    pub fn script_interpolants(&self, resp: ScriptedInterpolants) {
        self.script.borrow_mut().interpolants.push_back(resp);
    }

    /// Everything every context was told, in order.
    pub fn log(&self) -> Vec<String> {
        self.script.borrow().log.clone()
    }

    /// Net retain minus release count. Zero when no handles are live.
    pub fn live_handles(&self) -> i64 {
        self.refcount.get()
    }
}

/// Cancellation flag for scripted contexts.
#[derive(Clone, Default)]
pub struct TestCanceler(Arc<AtomicBool>);

impl Canceler for TestCanceler {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A context that logs commands and replays scripted responses.
pub struct ScriptedContext {
    id: usize,
    script: Rc<RefCell<Script>>,
    canceler: TestCanceler,
    interpolation: bool,
}

impl ScriptedContext {
    fn log(&self, msg: String) {
        self.script.borrow_mut().log.push(format!("ctx{}: {msg}", self.id));
    }

    fn check_canceled(&self) -> Result<()> {
        if self.canceler.is_canceled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl ProverContext for ScriptedContext {
    type Term = Sexp;
    type Canceler = TestCanceler;

    fn declare(&mut self, name: &str, sig: &Signature) {
        self.log(format!("declare {name} {sig}"));
    }

    fn assert(&mut self, t: &Sexp) {
        self.log(format!("assert {t}"));
    }

    fn push(&mut self) {
        self.log("push".to_string());
    }

    fn pop(&mut self) {
        self.log("pop".to_string());
    }

    fn check_sat(&mut self) -> Result<SatResp> {
        self.check_canceled()?;
        self.log("check-sat".to_string());
        let resp = self.script.borrow_mut().sat_results.pop_front();
        Ok(resp.unwrap_or(SatResp::Sat))
    }

    fn get_model(&mut self) -> Result<Sexp> {
        self.check_canceled()?;
        self.log("get-model".to_string());
        Ok(app("model", []))
    }

    fn canceler(&self) -> TestCanceler {
        self.canceler.clone()
    }

    fn compute_interpolants(&mut self, root: &Sexp) -> Result<Vec<Sexp>> {
        if !self.interpolation {
            return Err(Error::UnsupportedOperation {
                op: "compute-interpolants",
                backend: "scripted".to_string(),
            });
        }
        self.check_canceled()?;
        self.log(format!("compute-interpolants {root}"));
        let resp = self.script.borrow_mut().interpolants.pop_front();
        match resp.expect("no scripted interpolant response queued") {
            ScriptedInterpolants::Unsat(interpolants) => Ok(interpolants),
            ScriptedInterpolants::Sat => Err(Error::InterpolationPrecondition(
                "the asserted partitions are satisfiable".to_string(),
            )),
            ScriptedInterpolants::Unknown(reason) => Err(Error::SolverUndecided(reason)),
        }
    }
}

impl Backend for ScriptedBackend {
    type Term = Sexp;
    type Context = ScriptedContext;

    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn new_context(&self, opts: &ProverOptions) -> Result<ScriptedContext> {
        let id = self.next_ctx.get();
        self.next_ctx.set(id + 1);
        self.script.borrow_mut().log.push(format!("ctx{id}: open"));
        Ok(ScriptedContext {
            id,
            script: self.script.clone(),
            canceler: TestCanceler::default(),
            interpolation: opts.interpolation,
        })
    }

    fn retain(&self, _t: &Sexp) {
        self.refcount.set(self.refcount.get() + 1);
    }

    fn release(&self, _t: &Sexp) {
        self.refcount.set(self.refcount.get() - 1);
    }

    // complement is native, so intersection and difference exercise the
    // derived De Morgan defaults
    smt2::sexp_term_ops!();
}
