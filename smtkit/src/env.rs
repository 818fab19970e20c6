// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The environment: canonical symbol table and proving-context registry.
//!
//! An [`Environment`] owns one backend and the canonical declaration of every
//! symbol. Declarations fan out synchronously to every live proving context,
//! and a context created later has every existing symbol replayed into it
//! before it is handed to the caller, so a formula built at any point is
//! assertable in every context. Declaring a symbol and registering a new
//! context are mutually exclusive; no context can observe a declaration
//! half-applied.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use itertools::Itertools;
use smtlib::sexp::{self, app, atom_s, sexp_l, Sexp};

use crate::error::{Error, Result};
use crate::formula::{Backend, Bool, BoolKind, Kind, ProverContext, ProverOptions, Typed};
use crate::prover::Prover;
use crate::sorts::{Signature, Sort};
use crate::theories::{Arrays, Bools, Ints, Strings};

/// An environment over one backend: symbol table plus context registry.
pub struct Environment<B: Backend> {
    backend: B,
    inner: Mutex<EnvInner<B>>,
}

struct EnvInner<B: Backend> {
    /// Declared symbols in declaration order. Entries are never removed.
    symbols: Vec<(String, Signature)>,
    /// Live proving contexts, notified of every new declaration.
    provers: Vec<RegisteredProver<B>>,
    next_id: usize,
}

struct RegisteredProver<B: Backend> {
    id: usize,
    ctx: Arc<Mutex<B::Context>>,
}

impl<B: Backend> Environment<B> {
    /// Create an environment with no symbols and no proving contexts.
    pub fn new(backend: B) -> Self {
        Environment {
            backend,
            inner: Mutex::new(EnvInner {
                symbols: vec![],
                provers: vec![],
                next_id: 0,
            }),
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Manager for the boolean theory.
    pub fn bools(&self) -> Bools<'_, B> {
        Bools::new(&self.backend)
    }

    /// Manager for integer arithmetic.
    pub fn ints(&self) -> Ints<'_, B> {
        Ints::new(&self.backend)
    }

    /// Manager for strings and regular languages.
    pub fn strings(&self) -> Strings<'_, B> {
        Strings::new(&self.backend)
    }

    /// Manager for the theory of arrays.
    pub fn arrays(&self) -> Arrays<'_, B> {
        Arrays::new(&self.backend)
    }

    /// The signature a symbol was declared with, if any.
    pub fn lookup(&self, name: &str) -> Option<Signature> {
        let inner = self.inner.lock().unwrap();
        find_symbol(&inner.symbols, name)
    }

    /// Number of live proving contexts registered for declaration fan-out.
    pub fn num_provers(&self) -> usize {
        self.inner.lock().unwrap().provers.len()
    }

    /// Declare a symbol and return a handle referencing it.
    ///
    /// Declaring the same name with the same signature again is a no-op;
    /// declaring it with a different signature is an
    /// [`Error::SymbolRedeclaration`]. A new declaration is sent to every
    /// live proving context before it is recorded.
    pub fn declare(&self, name: &str, sig: Signature) -> Result<B::Term> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(declared) = find_symbol(&inner.symbols, name) {
            if declared == sig {
                return Ok(self.backend.var(name));
            }
            return Err(Error::SymbolRedeclaration {
                name: name.to_string(),
                declared,
                requested: sig,
            });
        }
        for prover in &inner.provers {
            prover.ctx.lock().unwrap().declare(name, &sig);
        }
        inner.symbols.push((name.to_string(), sig));
        Ok(self.backend.var(name))
    }

    /// Wrap a handle at kind `K`, verifying its sort against the symbol
    /// table.
    pub fn typed<K: Kind>(&self, term: B::Term) -> Result<Typed<B, K>> {
        let symbols = self.inner.lock().unwrap().symbols.clone();
        Typed::checked(&self.backend, term, &|name| find_symbol(&symbols, name))
    }

    /// The sort of a handle, resolving symbols through the symbol table.
    pub fn sort_of(&self, term: &B::Term) -> Result<Sort> {
        let symbols = self.inner.lock().unwrap().symbols.clone();
        self.backend
            .sort_of(term, &|name| find_symbol(&symbols, name))
    }

    /// Create a proving context with every declared symbol replayed into it.
    pub fn new_prover(&self, opts: &ProverOptions) -> Result<Prover<'_, B>> {
        let mut inner = self.inner.lock().unwrap();
        let mut ctx = self.backend.new_context(opts)?;
        for (name, sig) in &inner.symbols {
            ctx.declare(name, sig);
        }
        let ctx = Arc::new(Mutex::new(ctx));
        let id = inner.next_id;
        inner.next_id += 1;
        inner.provers.push(RegisteredProver {
            id,
            ctx: ctx.clone(),
        });
        Ok(Prover::new(self, id, ctx, opts.simplify))
    }

    /// Stop fanning declarations out to a closed prover. Unknown ids are
    /// ignored, which makes closing a prover idempotent.
    pub(crate) fn deregister(&self, id: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.provers.retain(|p| p.id != id);
    }

    /// Ingest an SMT-LIB script: process its declarations through the normal
    /// declare-and-fan-out path and return the asserted formulas in order.
    ///
    /// Accepts `declare-fun`, `declare-const`, and `assert`, and ignores the
    /// benign bookkeeping commands a dumped script may carry (`set-logic`,
    /// `set-option`, `set-info`, `check-sat`, `exit`).
    pub fn parse(&self, text: &str) -> Result<Vec<Bool<B>>> {
        let cmds = sexp::parse_many(text).map_err(|err| Error::Parse(err.to_string()))?;
        let mut formulas = vec![];
        for cmd in cmds {
            if matches!(cmd, Sexp::Comment(_)) {
                continue;
            }
            let (head, args) = cmd
                .app()
                .ok_or_else(|| Error::Parse(format!("not a command: {cmd}")))?;
            match (head, args) {
                ("declare-fun", [name, arg_sorts, ret]) => {
                    let name = name
                        .atom_s()
                        .ok_or_else(|| Error::Parse(format!("bad declaration name {name}")))?;
                    let arg_sorts = arg_sorts
                        .list()
                        .ok_or_else(|| Error::Parse(format!("bad argument sorts for {name}")))?
                        .iter()
                        .map(Sort::from_sexp)
                        .collect::<Result<Vec<_>>>()?;
                    self.declare(name, Signature::func(arg_sorts, Sort::from_sexp(ret)?))?;
                }
                ("declare-const", [name, sort]) => {
                    let name = name
                        .atom_s()
                        .ok_or_else(|| Error::Parse(format!("bad declaration name {name}")))?;
                    self.declare(name, Signature::var(Sort::from_sexp(sort)?))?;
                }
                ("assert", [t]) => {
                    let term = self.backend.from_sexp(t)?;
                    formulas.push(self.typed::<BoolKind>(term)?);
                }
                ("set-logic" | "set-option" | "set-info" | "check-sat" | "exit", _) => {}
                _ => return Err(Error::Parse(format!("unsupported command {head}"))),
            }
        }
        Ok(formulas)
    }

    /// Render a formula as a self-contained textual assertion block: one
    /// declaration line for each symbol the formula references, in
    /// declaration order, followed by the assertion itself.
    pub fn dump(&self, f: &Bool<B>) -> String {
        let term = self.backend.to_sexp(f.term());
        let mut used = HashSet::new();
        collect_symbols(&term, &mut used);
        let symbols = self.inner.lock().unwrap().symbols.clone();
        let decls = symbols
            .iter()
            .filter(|(name, _)| used.contains(name.as_str()))
            .map(|(name, sig)| {
                app(
                    "declare-fun",
                    [
                        atom_s(name),
                        sexp_l(sig.args.iter().map(|s| s.sexp())),
                        sig.ret.sexp(),
                    ],
                )
                .to_string()
            });
        decls
            .chain([app("assert", [term]).to_string()])
            .join("\n")
    }
}

fn find_symbol(symbols: &[(String, Signature)], name: &str) -> Option<Signature> {
    symbols
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, sig)| sig.clone())
}

/// Collect every symbol atom occurring in a term (including function heads).
fn collect_symbols(t: &Sexp, out: &mut HashSet<String>) {
    match t {
        Sexp::Atom(_) => {
            if let Some(name) = t.atom_s() {
                out.insert(name.to_string());
            }
        }
        Sexp::Comment(_) => {}
        Sexp::List(ts) => {
            for t in ts {
                collect_symbols(t, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{BoolKind, IntKind, ProverOptions};
    use crate::testutil::ScriptedBackend;

    fn int_var(env: &Environment<ScriptedBackend>, name: &str) -> crate::formula::Int<ScriptedBackend> {
        let handle = env.declare(name, Signature::var(Sort::Int)).unwrap();
        env.typed::<IntKind>(handle).unwrap()
    }

    #[test]
    fn test_declaration_fans_out_to_all_provers() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend.clone());
        let _p1 = env.new_prover(&ProverOptions::default()).unwrap();
        let _p2 = env.new_prover(&ProverOptions::default()).unwrap();
        env.declare("s", Signature::var(Sort::Bool)).unwrap();
        let log = backend.log();
        assert!(log.contains(&"ctx0: declare s () Bool".to_string()));
        assert!(log.contains(&"ctx1: declare s () Bool".to_string()));
    }

    #[test]
    fn test_existing_symbols_replayed_into_new_prover() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend.clone());
        env.declare("x", Signature::var(Sort::Int)).unwrap();
        env.declare("f", Signature::func(vec![Sort::Int], Sort::Bool))
            .unwrap();
        let _prover = env.new_prover(&ProverOptions::default()).unwrap();
        insta::assert_debug_snapshot!(backend.log(), @r###"
        [
            "ctx0: open",
            "ctx0: declare x () Int",
            "ctx0: declare f (Int) Bool",
        ]
        "###);
    }

    #[test]
    fn test_redeclaration() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend.clone());
        env.declare("x", Signature::var(Sort::Int)).unwrap();
        // same signature is a no-op
        env.declare("x", Signature::var(Sort::Int)).unwrap();
        // a different signature is an error and leaves the table untouched
        let err = env.declare("x", Signature::var(Sort::Bool)).unwrap_err();
        assert!(matches!(err, Error::SymbolRedeclaration { .. }));
        assert_eq!(env.lookup("x"), Some(Signature::var(Sort::Int)));
        // no prover existed, so nothing was fanned out
        assert_eq!(backend.log(), Vec::<String>::new());
    }

    #[test]
    fn test_typed_wrap_checks_sorts() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend);
        let x = env.declare("x", Signature::var(Sort::Int)).unwrap();
        assert!(env.typed::<IntKind>(x.clone()).is_ok());
        let err = env.typed::<BoolKind>(x).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_script() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend.clone());
        let _prover = env.new_prover(&ProverOptions::default()).unwrap();
        let formulas = env
            .parse(
                "(set-logic ALL)
                 (declare-const x Int)
                 (declare-fun f (Int) Int)
                 (assert (= (f x) 1))
                 (assert (< x 0))
                 (check-sat)",
            )
            .unwrap();
        assert_eq!(formulas.len(), 2);
        // discovered symbols went through the normal declare-and-fan-out path
        assert!(backend.log().contains(&"ctx0: declare x () Int".to_string()));
        assert!(backend
            .log()
            .contains(&"ctx0: declare f (Int) Int".to_string()));
        assert_eq!(env.lookup("x"), Some(Signature::var(Sort::Int)));
    }

    #[test]
    fn test_parse_quantified_assertion() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend);
        let formulas = env
            .parse(
                "(declare-fun f (Int) Bool)
                 (assert (forall ((m Int)) (f m)))",
            )
            .unwrap();
        assert_eq!(formulas.len(), 1);
        insta::assert_display_snapshot!(&formulas[0], @"(forall ((m Int)) (f m))");
    }

    #[test]
    fn test_parse_rejects_ill_sorted_assertion() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend);
        let err = env
            .parse("(declare-const x Int) (assert x)")
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let err = env.parse("(pop 1)").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_dump_is_self_contained() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend);
        let x = int_var(&env, "x");
        env.declare("f", Signature::func(vec![Sort::Int], Sort::Int))
            .unwrap();
        // an unused symbol must not be dumped
        int_var(&env, "unused");
        let bools = env.bools();
        let fx = env
            .typed::<IntKind>(env.backend().apply("f", &[x.term().clone()]))
            .unwrap();
        let formula = bools.eq(&fx, &x);
        insta::assert_snapshot!(env.dump(&formula), @r###"
        (declare-fun x () Int)
        (declare-fun f (Int) Int)
        (assert (= (f x) x))
        "###);
    }

    #[test]
    fn test_dump_parse_roundtrip() {
        let backend = ScriptedBackend::new();
        let env = Environment::new(backend.clone());
        let x = int_var(&env, "x");
        let ints = env.ints();
        let formula = ints.lt(&x, &ints.lit(3));
        let dumped = env.dump(&formula);

        let env2 = Environment::new(ScriptedBackend::new());
        let parsed = env2.parse(&dumped).unwrap();
        assert_eq!(parsed, vec![formula]);
    }
}
