// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Locate solver binaries.

use std::{
    env,
    path::{Path, PathBuf},
};

/// The repo's local solver directory, `solvers/` next to the workspace
/// members.
fn local_solver_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("smtlib package has no parent directory")
        .join("solvers")
}

/// Resolve the invocation for the solver binary named `bin`.
///
/// An environment variable named after the solver (`Z3_BIN` for `z3`)
/// takes priority, then a binary in the repo's `solvers/` directory, and
/// finally `bin` itself, to be looked up on `$PATH`.
pub fn solver_path(bin: &str) -> String {
    if let Some(path) = env::var_os(format!("{}_BIN", bin.to_uppercase())) {
        return path.to_string_lossy().into();
    }
    let bin = if env::consts::OS == "windows" && !bin.ends_with(".exe") {
        format!("{bin}.exe")
    } else {
        bin.to_string()
    };
    let local = local_solver_dir().join(&bin);
    if local.exists() {
        return local.to_string_lossy().into();
    }
    bin
}
