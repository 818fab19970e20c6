// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Mirror a solver session into an `.smt2` file.
//!
//! The saved file replays everything sent over the solver's stdin, so a
//! failing query can be re-run with the solver binary directly. Files are
//! named by a hash of their contents; saving the same session twice
//! overwrites the same file instead of accumulating copies.

use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
};

use crate::sexp::Sexp;

/// Accumulates the s-expressions sent to a solver, for saving on demand.
#[derive(Debug)]
pub struct Tee {
    dir: PathBuf,
    session: Vec<Sexp>,
}

impl Tee {
    /// An empty record that will save under `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            session: vec![],
        }
    }

    /// Record one s-expression sent to the solver.
    pub fn append(&mut self, s: Sexp) {
        self.session.push(s)
    }

    fn render(&self) -> String {
        let lines: Vec<String> = self
            .session
            .iter()
            .map(|s| match s {
                // an empty comment is a blank separator line
                Sexp::Comment(c) if c.is_empty() => String::new(),
                Sexp::Comment(c) => format!(";; {c}"),
                _ => s.to_string(),
            })
            .collect();
        lines.join("\n")
    }

    /// Write the session so far to a content-addressed `.smt2` file under
    /// the configured directory, returning the file name.
    pub fn save(&self) -> io::Result<PathBuf> {
        let contents = self.render();
        let mut hasher = DefaultHasher::new();
        contents.hash(&mut hasher);
        let digest = format!("{:016x}", hasher.finish());
        let fname = PathBuf::from(format!("query-{}.smt2", &digest[..8]));
        fs::write(self.dir.join(&fname), &contents)?;
        Ok(fname)
    }
}

#[cfg(test)]
mod tests {
    use super::Tee;
    use crate::sexp::{app, atom_s, Sexp};

    fn sample_session() -> Tee {
        let mut tee = Tee::new(std::env::temp_dir());
        tee.append(Sexp::Comment("z3 -in -smt2".to_string()));
        tee.append(app("declare-const", [atom_s("x"), atom_s("Int")]));
        tee.append(Sexp::Comment("".to_string()));
        tee.append(app("check-sat", []));
        tee
    }

    #[test]
    fn test_render_comments_and_blank_lines() {
        insta::assert_snapshot!(sample_session().render(), @r"
        ;; z3 -in -smt2
        (declare-const x Int)

        (check-sat)
        ");
    }

    #[test]
    fn test_save_is_deterministic() {
        let tee = sample_session();
        let first = tee.save().unwrap();
        let second = tee.save().unwrap();
        assert_eq!(first, second);
        let saved = std::fs::read_to_string(std::env::temp_dir().join(&first)).unwrap();
        assert_eq!(saved, tee.render());
    }
}
