// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! SMT-LIB term construction and sort inference over s-expressions.
//!
//! These builders are the term language shared by every s-expression-based
//! backend. They do no simplification beyond what SMT-LIB requires to be
//! well-formed (for example `(and)` is not legal input for some solvers, so
//! the 0-ary conjunction is the literal `true`).

// most builders are self-describing one-liners
#![allow(missing_docs)]

use smtlib::sexp::{app, atom_i, atom_s, atom_str, sexp_l, Sexp};

use crate::error::{Error, Result};
use crate::sorts::{Signature, Sort};

/// A boolean literal.
pub fn bool_lit(b: bool) -> Sexp {
    atom_s(if b { "true" } else { "false" })
}

/// An integer literal (negative integers are rendered as a negation).
pub fn int_lit(i: i64) -> Sexp {
    if i >= 0 {
        atom_i(i as usize)
    } else {
        app("-", [atom_i(i.unsigned_abs() as usize)])
    }
}

/// A string literal.
pub fn str_lit(s: &str) -> Sexp {
    atom_str(s)
}

/// Reference a declared symbol by name.
pub fn var(name: &str) -> Sexp {
    atom_s(name)
}

/// Apply a declared function to arguments.
pub fn apply(name: &str, args: Vec<Sexp>) -> Sexp {
    app(name, args)
}

/// N-ary conjunction. The solver can error if no arguments are provided like
/// `(and)`, so 0-ary is the literal and unary passes the argument through.
pub fn and(mut args: Vec<Sexp>) -> Sexp {
    match args.len() {
        0 => bool_lit(true),
        1 => args.pop().unwrap(),
        _ => app("and", args),
    }
}

/// N-ary disjunction, with the same degenerate cases as [`and`].
pub fn or(mut args: Vec<Sexp>) -> Sexp {
    match args.len() {
        0 => bool_lit(false),
        1 => args.pop().unwrap(),
        _ => app("or", args),
    }
}

pub fn not(t: Sexp) -> Sexp {
    app("not", [t])
}

pub fn implies(a: Sexp, b: Sexp) -> Sexp {
    app("=>", [a, b])
}

pub fn iff(a: Sexp, b: Sexp) -> Sexp {
    app("=", [a, b])
}

pub fn xor(a: Sexp, b: Sexp) -> Sexp {
    app("xor", [a, b])
}

pub fn eq(a: Sexp, b: Sexp) -> Sexp {
    app("=", [a, b])
}

pub fn distinct(args: Vec<Sexp>) -> Sexp {
    app("distinct", args)
}

pub fn ite(cond: Sexp, then: Sexp, else_: Sexp) -> Sexp {
    app("ite", [cond, then, else_])
}

pub fn add(args: Vec<Sexp>) -> Sexp {
    app("+", args)
}

pub fn sub(a: Sexp, b: Sexp) -> Sexp {
    app("-", [a, b])
}

pub fn mul(args: Vec<Sexp>) -> Sexp {
    app("*", args)
}

pub fn neg(t: Sexp) -> Sexp {
    app("-", [t])
}

pub fn lt(a: Sexp, b: Sexp) -> Sexp {
    app("<", [a, b])
}

pub fn le(a: Sexp, b: Sexp) -> Sexp {
    app("<=", [a, b])
}

pub fn gt(a: Sexp, b: Sexp) -> Sexp {
    app(">", [a, b])
}

pub fn ge(a: Sexp, b: Sexp) -> Sexp {
    app(">=", [a, b])
}

// String theory (SMT-LIB Unicode strings).

pub fn str_concat(args: Vec<Sexp>) -> Sexp {
    app("str.++", args)
}

pub fn str_len(s: Sexp) -> Sexp {
    app("str.len", [s])
}

pub fn str_contains(s: Sexp, sub: Sexp) -> Sexp {
    app("str.contains", [s, sub])
}

pub fn str_prefix(prefix: Sexp, s: Sexp) -> Sexp {
    app("str.prefixof", [prefix, s])
}

pub fn str_suffix(suffix: Sexp, s: Sexp) -> Sexp {
    app("str.suffixof", [suffix, s])
}

pub fn str_at(s: Sexp, i: Sexp) -> Sexp {
    app("str.at", [s, i])
}

pub fn str_substr(s: Sexp, offset: Sexp, len: Sexp) -> Sexp {
    app("str.substr", [s, offset, len])
}

pub fn str_index_of(s: Sexp, sub: Sexp, start: Sexp) -> Sexp {
    app("str.indexof", [s, sub, start])
}

pub fn str_replace(s: Sexp, target: Sexp, replacement: Sexp) -> Sexp {
    app("str.replace", [s, target, replacement])
}

pub fn str_replace_all(s: Sexp, target: Sexp, replacement: Sexp) -> Sexp {
    app("str.replace_all", [s, target, replacement])
}

pub fn str_lt(a: Sexp, b: Sexp) -> Sexp {
    app("str.<", [a, b])
}

pub fn str_le(a: Sexp, b: Sexp) -> Sexp {
    app("str.<=", [a, b])
}

pub fn str_to_int(s: Sexp) -> Sexp {
    app("str.to_int", [s])
}

pub fn str_from_int(i: Sexp) -> Sexp {
    app("str.from_int", [i])
}

pub fn str_in_re(s: Sexp, re: Sexp) -> Sexp {
    app("str.in_re", [s, re])
}

// Regular languages.

/// The language containing exactly one string.
pub fn re_lit(s: Sexp) -> Sexp {
    app("str.to_re", [s])
}

pub fn re_none() -> Sexp {
    atom_s("re.none")
}

pub fn re_all() -> Sexp {
    atom_s("re.all")
}

pub fn re_allchar() -> Sexp {
    atom_s("re.allchar")
}

pub fn re_range(lo: Sexp, hi: Sexp) -> Sexp {
    app("re.range", [lo, hi])
}

pub fn re_union(a: Sexp, b: Sexp) -> Sexp {
    app("re.union", [a, b])
}

pub fn re_inter(a: Sexp, b: Sexp) -> Sexp {
    app("re.inter", [a, b])
}

pub fn re_diff(a: Sexp, b: Sexp) -> Sexp {
    app("re.diff", [a, b])
}

pub fn re_concat(args: Vec<Sexp>) -> Sexp {
    app("re.++", args)
}

pub fn re_star(r: Sexp) -> Sexp {
    app("re.*", [r])
}

pub fn re_comp(r: Sexp) -> Sexp {
    app("re.comp", [r])
}

// Arrays.

pub fn select(array: Sexp, index: Sexp) -> Sexp {
    app("select", [array, index])
}

pub fn store(array: Sexp, index: Sexp, value: Sexp) -> Sexp {
    app("store", [array, index, value])
}

/// A constant array: every index maps to `value`. Rendered with a
/// sort-qualified head, `((as const (Array I E)) value)`.
pub fn array_const(index: &Sort, element: &Sort, value: Sexp) -> Sexp {
    let head = sexp_l([
        atom_s("as"),
        atom_s("const"),
        Sort::array(index.clone(), element.clone()).sexp(),
    ]);
    sexp_l([head, value])
}

/// Operators whose application always has boolean sort.
const BOOL_OPS: &[&str] = &[
    "not",
    "and",
    "or",
    "=>",
    "xor",
    "=",
    "distinct",
    "<",
    "<=",
    ">",
    ">=",
    "str.contains",
    "str.prefixof",
    "str.suffixof",
    "str.in_re",
    "str.<",
    "str.<=",
];

/// Operators whose application always has integer sort.
const INT_OPS: &[&str] = &[
    "+",
    "-",
    "*",
    "div",
    "mod",
    "abs",
    "str.len",
    "str.indexof",
    "str.to_int",
    "str.to_code",
];

/// Operators whose application always has string sort.
const STR_OPS: &[&str] = &[
    "str.++",
    "str.at",
    "str.substr",
    "str.replace",
    "str.replace_all",
    "str.from_int",
    "str.from_code",
];

/// Compute the sort of a term, resolving free symbols through `lookup`.
///
/// The term is assumed to be well-formed; this checks only as much structure
/// as sort computation requires. Unknown symbols are reported as
/// [`Error::Parse`] so that terms from untrusted text can be rejected.
pub fn infer_sort(t: &Sexp, lookup: &dyn Fn(&str) -> Option<Signature>) -> Result<Sort> {
    if t.atom_i().is_some() {
        return Ok(Sort::Int);
    }
    if t.atom_str().is_some() {
        return Ok(Sort::Str);
    }
    if let Some(name) = t.atom_s() {
        return match name {
            "true" | "false" => Ok(Sort::Bool),
            "re.none" | "re.all" | "re.allchar" => Ok(Sort::Regex),
            _ => match lookup(name) {
                Some(sig) if sig.args.is_empty() => Ok(sig.ret),
                Some(_) => Err(Error::Parse(format!("function {name} used without arguments"))),
                None => Err(Error::Parse(format!("unknown symbol {name}"))),
            },
        };
    }
    if let Some((head, args)) = t.app() {
        if BOOL_OPS.contains(&head) {
            return Ok(Sort::Bool);
        }
        if INT_OPS.contains(&head) {
            return Ok(Sort::Int);
        }
        if STR_OPS.contains(&head) {
            return Ok(Sort::Str);
        }
        if head.starts_with("re.") || head == "str.to_re" {
            return Ok(Sort::Regex);
        }
        return match head {
            "ite" if args.len() == 3 => infer_sort(&args[1], lookup),
            "forall" | "exists" if args.len() == 2 => {
                let bound = bound_symbols(&args[0], &mut |s| Sort::from_sexp(s))?;
                let scoped = scoped_lookup(&bound, lookup);
                match infer_sort(&args[1], &scoped)? {
                    Sort::Bool => Ok(Sort::Bool),
                    other => Err(Error::Parse(format!(
                        "quantified body has sort {other}, not Bool"
                    ))),
                }
            }
            "let" if args.len() == 2 => {
                // each binding takes the sort of its right-hand side
                let bound = bound_symbols(&args[0], &mut |t| infer_sort(t, lookup))?;
                let scoped = scoped_lookup(&bound, lookup);
                infer_sort(&args[1], &scoped)
            }
            "select" if args.len() == 2 => match infer_sort(&args[0], lookup)? {
                Sort::Array { element, .. } => Ok(*element),
                other => Err(Error::Parse(format!("select applied to non-array sort {other}"))),
            },
            "store" if args.len() == 3 => infer_sort(&args[0], lookup),
            _ => match lookup(head) {
                Some(sig) => Ok(sig.ret),
                None => Err(Error::Parse(format!("unknown function {head}"))),
            },
        };
    }
    // a sort-qualified constant-array application, ((as const (Array I E)) v)
    if let Some(elems) = t.list() {
        if let Some(("as", [konst, sort])) = elems.first().and_then(|h| h.app()) {
            if konst.atom_s() == Some("const") {
                return Sort::from_sexp(sort);
            }
        }
    }
    Err(Error::Parse(format!("not a term: {t}")))
}

/// A binder's `((name rhs) ...)` list, with each right-hand side resolved to
/// a sort by `sort_of` (the sort itself for a quantifier, the bound term for
/// a `let`).
fn bound_symbols(
    bindings: &Sexp,
    sort_of: &mut dyn FnMut(&Sexp) -> Result<Sort>,
) -> Result<Vec<(String, Signature)>> {
    let bindings = bindings
        .list()
        .ok_or_else(|| Error::Parse(format!("malformed binding list {bindings}")))?;
    bindings
        .iter()
        .map(|b| match b.list() {
            Some([name, rhs]) => {
                let name = name
                    .atom_s()
                    .ok_or_else(|| Error::Parse(format!("bad bound name {name}")))?;
                Ok((name.to_string(), Signature::var(sort_of(rhs)?)))
            }
            _ => Err(Error::Parse(format!("malformed binding {b}"))),
        })
        .collect()
}

/// A lookup that resolves bound names before falling back to the outer
/// symbol table.
fn scoped_lookup<'a>(
    bound: &'a [(String, Signature)],
    lookup: &'a dyn Fn(&str) -> Option<Signature>,
) -> impl Fn(&str) -> Option<Signature> + 'a {
    move |name| {
        bound
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, sig)| sig.clone())
            .or_else(|| lookup(name))
    }
}

/// Implement the term half of [`Backend`](crate::formula::Backend) by
/// delegating to this module's builders, for backends whose `Term` is
/// [`Sexp`]. Expanded inside an `impl Backend` block; the expansion leaves
/// `name`, `new_context`, and the reference-count hooks to the backend.
macro_rules! sexp_term_ops {
    () => {
        fn sort_of(
            &self,
            t: &::smtlib::sexp::Sexp,
            lookup: &dyn Fn(&str) -> Option<$crate::sorts::Signature>,
        ) -> $crate::error::Result<$crate::sorts::Sort> {
            $crate::smt2::infer_sort(t, lookup)
        }

        fn to_sexp(&self, t: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            t.clone()
        }

        fn from_sexp(
            &self,
            s: &::smtlib::sexp::Sexp,
        ) -> $crate::error::Result<::smtlib::sexp::Sexp> {
            Ok(s.clone())
        }

        fn var(&self, name: &str) -> ::smtlib::sexp::Sexp {
            $crate::smt2::var(name)
        }

        fn apply(
            &self,
            name: &str,
            args: &[::smtlib::sexp::Sexp],
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::apply(name, args.to_vec())
        }

        fn mark_interpolant(&self, t: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            ::smtlib::sexp::app("interp", [t.clone()])
        }

        fn bool_lit(&self, b: bool) -> ::smtlib::sexp::Sexp {
            $crate::smt2::bool_lit(b)
        }

        fn not(&self, t: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::not(t.clone())
        }

        fn and(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::and(args.to_vec())
        }

        fn or(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::or(args.to_vec())
        }

        fn implies(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::implies(a.clone(), b.clone())
        }

        fn iff(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::iff(a.clone(), b.clone())
        }

        fn xor(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::xor(a.clone(), b.clone())
        }

        fn ite(
            &self,
            cond: &::smtlib::sexp::Sexp,
            then: &::smtlib::sexp::Sexp,
            else_: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::ite(cond.clone(), then.clone(), else_.clone())
        }

        fn eq(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::eq(a.clone(), b.clone())
        }

        fn distinct(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::distinct(args.to_vec())
        }

        fn int_lit(&self, i: i64) -> ::smtlib::sexp::Sexp {
            $crate::smt2::int_lit(i)
        }

        fn add(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::add(args.to_vec())
        }

        fn sub(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::sub(a.clone(), b.clone())
        }

        fn mul(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::mul(args.to_vec())
        }

        fn neg(&self, t: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::neg(t.clone())
        }

        fn lt(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::lt(a.clone(), b.clone())
        }

        fn le(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::le(a.clone(), b.clone())
        }

        fn gt(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::gt(a.clone(), b.clone())
        }

        fn ge(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::ge(a.clone(), b.clone())
        }

        fn str_lit(&self, s: &str) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_lit(s)
        }

        fn str_concat(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_concat(args.to_vec())
        }

        fn str_len(&self, s: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_len(s.clone())
        }

        fn str_contains(
            &self,
            s: &::smtlib::sexp::Sexp,
            sub: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_contains(s.clone(), sub.clone())
        }

        fn str_prefix(
            &self,
            prefix: &::smtlib::sexp::Sexp,
            s: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_prefix(prefix.clone(), s.clone())
        }

        fn str_suffix(
            &self,
            suffix: &::smtlib::sexp::Sexp,
            s: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_suffix(suffix.clone(), s.clone())
        }

        fn str_at(
            &self,
            s: &::smtlib::sexp::Sexp,
            i: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_at(s.clone(), i.clone())
        }

        fn str_substr(
            &self,
            s: &::smtlib::sexp::Sexp,
            offset: &::smtlib::sexp::Sexp,
            len: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_substr(s.clone(), offset.clone(), len.clone())
        }

        fn str_index_of(
            &self,
            s: &::smtlib::sexp::Sexp,
            sub: &::smtlib::sexp::Sexp,
            start: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_index_of(s.clone(), sub.clone(), start.clone())
        }

        fn str_replace(
            &self,
            s: &::smtlib::sexp::Sexp,
            target: &::smtlib::sexp::Sexp,
            to: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_replace(s.clone(), target.clone(), to.clone())
        }

        fn str_replace_all(
            &self,
            s: &::smtlib::sexp::Sexp,
            target: &::smtlib::sexp::Sexp,
            to: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_replace_all(s.clone(), target.clone(), to.clone())
        }

        fn str_lt(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_lt(a.clone(), b.clone())
        }

        fn str_le(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_le(a.clone(), b.clone())
        }

        fn str_to_int(&self, s: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_to_int(s.clone())
        }

        fn str_from_int(&self, i: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_from_int(i.clone())
        }

        fn str_in_re(
            &self,
            s: &::smtlib::sexp::Sexp,
            re: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::str_in_re(s.clone(), re.clone())
        }

        fn re_lit(&self, s: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_lit(s.clone())
        }

        fn re_none(&self) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_none()
        }

        fn re_all(&self) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_all()
        }

        fn re_allchar(&self) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_allchar()
        }

        fn re_range(
            &self,
            lo: &::smtlib::sexp::Sexp,
            hi: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_range(lo.clone(), hi.clone())
        }

        fn re_union(
            &self,
            a: &::smtlib::sexp::Sexp,
            b: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_union(a.clone(), b.clone())
        }

        fn re_concat(&self, args: &[::smtlib::sexp::Sexp]) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_concat(args.to_vec())
        }

        fn re_star(&self, r: &::smtlib::sexp::Sexp) -> ::smtlib::sexp::Sexp {
            $crate::smt2::re_star(r.clone())
        }

        fn re_comp(
            &self,
            r: &::smtlib::sexp::Sexp,
        ) -> $crate::error::Result<::smtlib::sexp::Sexp> {
            Ok($crate::smt2::re_comp(r.clone()))
        }

        fn select(
            &self,
            array: &::smtlib::sexp::Sexp,
            index: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::select(array.clone(), index.clone())
        }

        fn array_const(
            &self,
            index: &$crate::sorts::Sort,
            element: &$crate::sorts::Sort,
            value: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::array_const(index, element, value.clone())
        }

        fn store(
            &self,
            array: &::smtlib::sexp::Sexp,
            index: &::smtlib::sexp::Sexp,
            value: &::smtlib::sexp::Sexp,
        ) -> ::smtlib::sexp::Sexp {
            $crate::smt2::store(array.clone(), index.clone(), value.clone())
        }
    };
}
pub(crate) use sexp_term_ops;
