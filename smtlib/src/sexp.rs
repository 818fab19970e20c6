// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! S-expressions: the data type, a `peg` parser, and an SMT-LIB printer.
//!
//! Comments are part of the grammar because solvers embed them in their
//! responses (CVC5 annotates models this way). String literals (`"abc"`) are
//! a distinct atom variant from symbols: in the string theory `"abc"` the
//! literal and `abc` the symbol are different terms, and quoting must
//! survive a print/parse round trip.

use peg::str::LineCol;
use serde::Serialize;
use std::fmt;

/// A leaf of an s-expression.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub enum Atom {
    I(usize),
    S(String),
    /// An SMT-LIB string literal, printed with surrounding double quotes.
    Str(String),
}

/// An s-expression, including comments.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub enum Sexp {
    Atom(Atom),
    Comment(String),
    List(Vec<Sexp>),
}

/// A symbol atom.
pub fn atom_s<S: AsRef<str>>(s: S) -> Sexp {
    Sexp::Atom(Atom::S(s.as_ref().to_string()))
}

/// An integer atom.
pub fn atom_i(i: usize) -> Sexp {
    Sexp::Atom(Atom::I(i))
}

/// A string-literal atom.
pub fn atom_str<S: AsRef<str>>(s: S) -> Sexp {
    Sexp::Atom(Atom::Str(s.as_ref().to_string()))
}

/// A list from an iterable of elements.
pub fn sexp_l<I>(i: I) -> Sexp
where
    I: IntoIterator,
    I::IntoIter: Iterator<Item = Sexp>,
{
    Sexp::List(i.into_iter().collect())
}

/// An application: a list headed by the symbol `head`, followed by `args`.
pub fn app<I>(head: &str, args: I) -> Sexp
where
    I: IntoIterator,
    I::IntoIter: Iterator<Item = Sexp>,
{
    let mut ss = vec![atom_s(head)];
    #[allow(clippy::useless_conversion)]
    ss.extend(args.into_iter());
    Sexp::List(ss)
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::I(i) => write!(f, "{i}"),
            // symbols with characters the bare grammar cannot carry get
            // pipe-quoted
            Atom::S(s) if s.contains([' ', '\"', '\'']) => write!(f, "|{s}|"),
            Atom::S(s) => write!(f, "{s}"),
            // SMT-LIB escapes a double quote inside a string literal by
            // doubling it
            Atom::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(a) => write!(f, "{a}"),
            Sexp::Comment(c) => write!(f, ";{c}"),
            Sexp::List(ss) => write_list(f, ss),
        }
    }
}

/// Print a list's elements space-separated, except that comments get their
/// own line (a comment runs to end of line, so printing one inline would
/// swallow the rest of the list).
fn write_list(f: &mut fmt::Formatter<'_>, ss: &[Sexp]) -> fmt::Result {
    write!(f, "(")?;
    for (i, s) in ss.iter().enumerate() {
        let last = i == ss.len() - 1;
        let this_comment = matches!(s, Sexp::Comment(_));
        let next_comment = !last && matches!(ss[i + 1], Sexp::Comment(_));
        let space = if last || this_comment || next_comment {
            ""
        } else {
            " "
        };
        if this_comment {
            write!(f, "\n{s}\n{space}")?;
        } else {
            write!(f, "{s}{space}")?;
        }
    }
    write!(f, ")")
}

impl Sexp {
    /// The elements, if this is a list.
    pub fn list(&self) -> Option<&[Sexp]> {
        if let Sexp::List(ss) = self {
            Some(ss)
        } else {
            None
        }
    }

    /// The symbol name, if this is a symbol atom.
    pub fn atom_s(&self) -> Option<&str> {
        if let Sexp::Atom(Atom::S(s)) = self {
            Some(s)
        } else {
            None
        }
    }

    /// The value, if this is an integer atom.
    pub fn atom_i(&self) -> Option<usize> {
        if let Sexp::Atom(Atom::I(i)) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// The contents, if this is a string literal.
    pub fn atom_str(&self) -> Option<&str> {
        if let Sexp::Atom(Atom::Str(s)) = self {
            Some(s)
        } else {
            None
        }
    }

    /// The head symbol and arguments, if this is of the form `(head args..)`.
    pub fn app(&self) -> Option<(&str, &[Sexp])> {
        self.list().and_then(|ss| {
            if !ss.is_empty() {
                if let Some(head) = ss[0].atom_s() {
                    return Some((head, &ss[1..]));
                }
            }
            None
        })
    }
}

peg::parser! {
grammar parser() for str {
  rule symbol_start() = ['a'..='z' | 'A'..='Z' | '_' | '\'' | '<' | '>' | ':' | '=' | '$' | '@' | '+' | '-' | '*' | '/' | '!' | '.' | '?']
  rule symbol_char() = symbol_start() / ['0'..='9' | '#' | '%']
  rule symbol() = quiet! { symbol_start() symbol_char()* } / expected!("atom")

  rule whitespace() = [' ' | '\t' | '\n' | '\r']
  rule _ = whitespace()*

  rule string_lit() -> Atom
  = "\"" s:$(([^'"'] / "\"\"")*) "\"" { Atom::Str(s.replace("\"\"", "\"")) }

  rule quoted_symbol() -> Atom
  = "|" s:$([^'|']*) "|" { Atom::S(s.to_string()) }

  rule bare_symbol() -> Atom
  = s:$(symbol()) { Atom::S(s.to_string()) }

  rule number() -> Atom
  = i:$(['0'..='9']+) { Atom::I(i.parse().unwrap()) }

  rule atom() -> Sexp
  = a:(string_lit() /
       quoted_symbol() /
       bare_symbol() /
       number()) { Sexp::Atom(a) }

  rule comment() -> Sexp
  = ";" s:$(([^'\n']*)) ['\n'] { Sexp::Comment(s.to_string()) }

  rule list() -> Sexp
  = "(" _ ss:(sexp() ** _) _ ")" { Sexp::List(ss) }

  rule sexp() -> Sexp
  = atom() / comment() / list()

  /// One sexp, tolerating surrounding whitespace.
  pub(super) rule sexp_whitespace() -> Sexp
  = _ s:sexp() _ { s }

  /// A whitespace-separated sequence of sexps.
  pub(super) rule sexps() -> Vec<Sexp>
  = _ ss:(sexp() ** _) _ { ss }
}
}

/// Parse one s-expression, tolerating surrounding whitespace.
pub fn parse(s: &str) -> Result<Sexp, peg::error::ParseError<LineCol>> {
    parser::sexp_whitespace(s)
}

/// Parse a whitespace-separated sequence of s-expressions.
pub fn parse_many(s: &str) -> Result<Vec<Sexp>, peg::error::ParseError<LineCol>> {
    parser::sexps(s)
}
