// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A running solver process, driven over stdin/stdout.
//!
//! [`SmtProc`] speaks plain SMT-LIB: commands go down the pipe as
//! s-expressions and responses are read back with an echo-marker protocol
//! that delimits where each response ends. Everything solver-specific lives
//! in the [`SolverCmd`] used to launch the process; this module treats all
//! solvers uniformly.
//!
//! Expensive calls (check-sat, get-model, interpolant computation) can be
//! interrupted from another thread through an [`SmtPid`]. Cancellation is a
//! small state machine: a solver that is idle is only flagged, and dies at
//! its next expensive call; a solver inside an expensive call is signalled
//! immediately.

use crate::conf::SolverCmd;
use crate::sexp::{self, app, atom_i, atom_s, sexp_l, Sexp};
use crate::tee::Tee;
use nix::{errno::Errno, sys::signal, unistd::Pid};
use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    sync::{Arc, Mutex},
};
use thiserror::Error;

/// Lifecycle of the solver process, shared between [`SmtProc`] and every
/// [`SmtPid`] cloned from it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum LifeCycle {
    /// Between commands. A kill request here only flags the process; it is
    /// acted on at the next expensive call.
    Idle,
    /// Inside an expensive call. A kill request here sends SIGKILL.
    Busy,
    /// A kill was requested while idle. Commands without a response are
    /// swallowed; the next call that needs the solver kills it instead.
    CancelPending,
    /// SIGKILL was sent; the zombie still needs a `wait`.
    Reapable,
    /// The process has exited and been reaped.
    Closed,
}

/// A handle to one running solver process.
#[derive(Debug)]
pub struct SmtProc {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    tee: Option<Tee>,
    // shared with SmtPid so a late kill never signals a reused pid
    state: Arc<Mutex<LifeCycle>>,
}

/// A cancellation handle for an [`SmtProc`], usable from any thread.
#[derive(Clone)]
pub struct SmtPid {
    pid: Pid,
    state: Arc<Mutex<LifeCycle>>,
}

/// SatResp is a solver's response to a `(check-sat)` or similar command.
///
/// For unknown it also returns the reason the solver provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResp {
    /// The query is satisfiable.
    Sat,
    /// The query is unsatisfiable (and thus negated assertions are valid).
    Unsat,
    /// Unknown whether the query is sat or unsat. The reason is the one given
    /// by (get-info :reason-unknown).
    ///
    /// This can happen due to a timeout or limitations of quantifier
    /// instantiation heuristics, for example.
    Unknown(String),
}

/// An error from trying to call the solver.
#[derive(Error, Debug)]
pub enum SolverError {
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
    /// Solver returned an `(error ...)` response
    #[error("solver returned an error:\n{0}")]
    UnexpectedClose(String),
    /// Solver killed through an [`SmtPid`]
    #[error("solver was killed")]
    Killed,
}

type Result<T> = std::result::Result<T, SolverError>;

impl SmtPid {
    /// Request that the solver be killed.
    ///
    /// If the solver is inside an expensive call this signals it right away;
    /// otherwise the process is flagged and dies when it next reaches one.
    pub fn kill(&self) {
        let mut state = self.state.lock().unwrap();
        match *state {
            LifeCycle::CancelPending | LifeCycle::Reapable | LifeCycle::Closed => {}
            LifeCycle::Idle => *state = LifeCycle::CancelPending,
            LifeCycle::Busy => {
                if let Err(errno) = signal::kill(self.pid, signal::Signal::SIGKILL) {
                    // ESRCH means the process is already gone
                    if errno != Errno::ESRCH {
                        panic!("killing solver process {} failed with {errno}", self.pid);
                    }
                }
                *state = LifeCycle::Reapable;
            }
        }
    }

    /// Check whether a kill has been requested or carried out.
    pub fn is_killed(&self) -> bool {
        !matches!(*self.state.lock().unwrap(), LifeCycle::Idle | LifeCycle::Busy)
    }
}

impl Drop for SmtProc {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SmtProc {
    /// Launch a solver.
    ///
    /// `tee`, when given, mirrors the whole session into an `.smt2` file
    /// under that path for debugging.
    pub fn new(cmd: SolverCmd, tee: Option<&Path>) -> Result<Self> {
        let mut child = Command::new(OsStr::new(&cmd.cmd))
            .args(cmd.args.iter().map(OsString::from))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(SolverError::from)?;
        let tee = tee.map(|path| {
            let mut f = Tee::new(path);
            f.append(Sexp::Comment(cmd.cmdline()));
            f
        });
        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        let mut proc = Self {
            child,
            stdin,
            stdout,
            tee,
            state: Arc::new(Mutex::new(LifeCycle::Idle)),
        };
        for (option, val) in &cmd.options {
            proc.send(&app(
                "set-option",
                [atom_s(format!(":{option}")), atom_s(val)],
            ));
        }
        if let Some(logic) = &cmd.logic {
            proc.send(&app("set-logic", [atom_s(logic)]));
        }
        Ok(proc)
    }

    /// Get a cancellation handle for this process.
    pub fn pid(&self) -> SmtPid {
        // Child guarantees a positive pid, so u32 -> i32 cannot truncate
        let pid = Pid::from_raw(self.child.id().try_into().unwrap());
        SmtPid {
            pid,
            state: self.state.clone(),
        }
    }

    /// Low-level API to send the solver a command that produces no response.
    ///
    /// After a cancellation the command is silently dropped; the error
    /// surfaces at the next call that needs an answer.
    pub fn send(&mut self, data: &Sexp) {
        let state = self.state.clone();
        let mut state = state.lock().unwrap();
        if self.reap(&mut state).is_err() {
            return;
        }
        drop(state);
        self.write_sexp(data);
    }

    /// Send a command and parse its response as a single s-expression.
    pub fn command(&mut self, data: &Sexp) -> Result<Sexp> {
        self.send(data);
        self.read_response(|s| sexp::parse(s).expect("could not parse solver response"))
    }

    /// Send a command whose response is a sequence of s-expressions (for
    /// example an interpolant list preceded by a status atom).
    ///
    /// Counts as an expensive call for cancellation purposes.
    pub fn command_multi(&mut self, data: &Sexp) -> Result<Vec<Sexp>> {
        self.send(data);
        self.enter_busy()?;
        let resp = self
            .read_response(|s| sexp::parse_many(s).expect("could not parse solver response"))?;
        self.leave_busy()?;
        Ok(resp)
    }

    /// Send the solver `(push 1)`.
    pub fn push(&mut self) {
        self.send(&app("push", [atom_i(1)]));
    }

    /// Send the solver `(pop 1)`.
    pub fn pop(&mut self) {
        self.send(&app("pop", [atom_i(1)]));
    }

    /// Assert a formula.
    pub fn assert(&mut self, t: &Sexp) {
        self.send(&app("assert", [t.clone()]));
    }

    /// Declare a constant or function. `args` is empty for a constant.
    pub fn declare(&mut self, name: &str, args: Vec<Sexp>, ret: Sexp) {
        self.send(&app("declare-fun", [atom_s(name), sexp_l(args), ret]));
    }

    /// Fetch an attribute with `(get-info <attribute>)`.
    pub fn get_info(&mut self, attribute: &str) -> Result<Sexp> {
        let resp = self.command(&app("get-info", [atom_s(attribute)]))?;
        match resp {
            Sexp::List(s) => {
                assert_eq!(s.len(), 2);
                assert_eq!(
                    &s[0],
                    &atom_s(attribute),
                    "unexpected response to get-info {}",
                    &s[0],
                );
                Ok(s[1].clone())
            }
            _ => panic!("unexpected get-info format {resp}"),
        }
    }

    /// Send `(check-sat)`. Fetches the reason for an unknown verdict but
    /// does not fetch a model for sat.
    pub fn check_sat(&mut self) -> Result<SatResp> {
        self.send(&app("check-sat", []));
        self.enter_busy()?;
        let raw = self.read_response(|s| s.to_string())?;
        let resp = self.parse_sat(&raw)?;
        if matches!(resp, SatResp::Unknown(_)) {
            if let Some(name) = self.save_tee() {
                log::debug!("unknown response saved to {}", name.display());
            }
        }
        self.leave_busy()?;
        Ok(resp)
    }

    /// Get a model (following a sat reply) as an s-expression.
    pub fn get_model(&mut self) -> Result<Sexp> {
        self.enter_busy()?;
        let model = self.command(&app("get-model", []))?;
        self.leave_busy()?;
        Ok(model)
    }

    /// Ask the solver to simplify a term, returning the simplified term.
    pub fn simplify(&mut self, t: &Sexp) -> Result<Sexp> {
        self.command(&app("simplify", [t.clone()]))
    }

    /// Flush the tee file, if one was set up, and return its name.
    pub fn save_tee(&self) -> Option<PathBuf> {
        self.tee.as_ref().and_then(|tee| match tee.save() {
            Ok(name) => Some(name),
            Err(err) => {
                log::error!("failed to save tee: {err}");
                None
            }
        })
    }

    /// Add a comment to the tee'd file.
    ///
    /// The comment is a closure so that it is not rendered when no tee is
    /// set up.
    pub fn comment_with<F>(&mut self, comment: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(f) = &mut self.tee {
            let comment = comment();
            f.append(Sexp::Comment("".to_string()));
            f.append(Sexp::Comment(comment));
        }
    }

    /// The echo marker delimiting the end of a response.
    const DONE: &'static str = "<<DONE>>";

    fn write_sexp(&mut self, data: &Sexp) {
        writeln!(self.stdin, "{data}").expect("I/O error: failed to send to solver");
        if let Some(f) = &mut self.tee {
            f.append(data.clone());
        }
    }

    fn write_line(&mut self, line: &str) -> std::result::Result<(), io::Error> {
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read a response off the pipe: echo the end marker, then accumulate
    /// lines until the marker comes back, and hand everything before it to
    /// `parse`.
    fn read_response<F, T>(&mut self, parse: F) -> Result<T>
    where
        F: FnOnce(&str) -> T,
    {
        if let Err(err) = self.write_line(&format!(r#"(echo "{}")"#, Self::DONE)) {
            if err.kind() == ErrorKind::BrokenPipe {
                self.bail_if_killed()?;
            }
            return Err(SolverError::from(err));
        }
        let mut buf = String::new();
        loop {
            let line_start = buf.len();
            let n = self.stdout.read_line(&mut buf)?;
            if n == 0 {
                // pipe closed: either we killed the solver or it died with
                // an error message
                self.bail_if_killed()?;
                return Err(SolverError::UnexpectedClose(Self::extract_error(&buf)));
            }
            let line = buf[line_start..line_start + n].trim_end();
            // Z3 echoes the marker bare; CVC quotes it (as SMT-LIB says to)
            if line == Self::DONE || line == format!("\"{}\"", Self::DONE) {
                return Ok(parse(buf[..line_start].trim_end()));
            }
        }
    }

    /// Pull the message out of an `(error "...")` response, which solvers
    /// may interleave with an ordinary verdict.
    fn extract_error(resp: &str) -> String {
        let sexps = sexp::parse_many(resp)
            .unwrap_or_else(|err| panic!("could not parse error response {resp}: {err}"));
        sexps
            .iter()
            .find_map(|s| {
                s.app().and_then(|(head, args)| {
                    if head == "error" && args.len() == 1 {
                        args[0].atom_str().or_else(|| args[0].atom_s())
                    } else {
                        None
                    }
                })
            })
            .unwrap_or_else(|| panic!("no error sexp found in {resp}"))
            .to_string()
    }

    fn parse_sat(&mut self, resp: &str) -> Result<SatResp> {
        match resp {
            "sat" => Ok(SatResp::Sat),
            "unsat" => Ok(SatResp::Unsat),
            "unknown" => {
                let reason = self
                    .get_info(":reason-unknown")
                    .expect("could not get :reason-unknown");
                Ok(SatResp::Unknown(reason.to_string()))
            }
            _ => {
                self.bail_if_killed()?;
                Err(SolverError::UnexpectedClose(Self::extract_error(resp)))
            }
        }
    }

    /// Act on a pending cancellation while holding the state lock: kill
    /// and/or reap the process as needed and report `Killed`, or confirm the
    /// process is still live.
    fn reap(&mut self, state: &mut LifeCycle) -> Result<()> {
        match *state {
            LifeCycle::Idle | LifeCycle::Busy => return Ok(()),
            LifeCycle::CancelPending => {
                self.child
                    .kill()
                    .expect("could not kill after cancellation request");
                self.child
                    .wait()
                    .expect("could not wait after cancellation request");
            }
            LifeCycle::Reapable => {
                self.child
                    .wait()
                    .expect("could not wait for killed child");
            }
            LifeCycle::Closed => {}
        }
        *state = LifeCycle::Closed;
        Err(SolverError::Killed)
    }

    /// Mark the start of an expensive call, so a kill request signals the
    /// process instead of merely flagging it.
    fn enter_busy(&mut self) -> Result<()> {
        let state = self.state.clone();
        let mut state = state.lock().unwrap();
        self.reap(&mut state)?;
        assert_eq!(*state, LifeCycle::Idle, "expensive calls cannot nest");
        *state = LifeCycle::Busy;
        Ok(())
    }

    /// Mark the end of an expensive call.
    fn leave_busy(&mut self) -> Result<()> {
        let state = self.state.clone();
        let mut state = state.lock().unwrap();
        self.reap(&mut state)?;
        assert_eq!(*state, LifeCycle::Busy, "no expensive call in progress");
        *state = LifeCycle::Idle;
        Ok(())
    }

    fn bail_if_killed(&mut self) -> Result<()> {
        let state = self.state.clone();
        let mut state = state.lock().unwrap();
        self.reap(&mut state)
    }

    fn shutdown(&mut self) {
        _ = writeln!(self.stdin, "(exit)");
        _ = self.stdin.flush();
        _ = self.child.kill();
        _ = self.child.wait();
        *self.state.lock().unwrap() = LifeCycle::Closed;
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        conf::{CvcConf, Z3Conf},
        path::solver_path,
        proc::{SatResp, SmtProc, SolverError},
        sexp::{app, atom_s, parse},
    };
    use eyre::Context;
    use std::{sync::mpsc, thread, time::Duration};

    /// Start a Z3 process, or skip the test if Z3 is not installed.
    fn start_z3() -> Option<SmtProc> {
        let z3 = Z3Conf::new(&solver_path("z3")).done();
        match SmtProc::new(z3, None) {
            Ok(proc) => Some(proc),
            Err(_) => {
                eprintln!("could not find z3, skipping test");
                None
            }
        }
    }

    #[test]
    fn test_check_sat_z3() {
        let Some(mut solver) = start_z3() else { return };
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        assert!(
            matches!(response, SatResp::Sat),
            "empty assertion set should be sat, got {response:?}"
        );
    }

    #[test]
    fn test_push_pop_z3() {
        let Some(mut solver) = start_z3() else { return };
        solver.declare("p", vec![], atom_s("Bool"));
        solver.push();
        solver.assert(&parse("(and p (not p))").unwrap());
        assert_eq!(solver.check_sat().unwrap(), SatResp::Unsat);
        solver.pop();
        assert_eq!(solver.check_sat().unwrap(), SatResp::Sat);
    }

    #[test]
    fn test_multi_line_response_z3() {
        let Some(mut solver) = start_z3() else { return };
        solver.declare("x", vec![], atom_s("Int"));
        solver.assert(&parse("(= x 2)").unwrap());
        assert_eq!(solver.check_sat().unwrap(), SatResp::Sat);
        // the model spans several lines; the marker protocol must find its end
        let model = solver.get_model().unwrap();
        assert!(model.to_string().contains('x'));
    }

    #[test]
    fn test_command_multi_z3() {
        let Some(mut solver) = start_z3() else { return };
        solver.declare("x", vec![], atom_s("Int"));
        solver.assert(&parse("(= x 7)").unwrap());
        assert_eq!(solver.check_sat().unwrap(), SatResp::Sat);
        // a pending echo and the get-value answer come back as separate
        // s-expressions in a single response
        solver.send(&parse("(echo \"values:\")").unwrap());
        let resp = solver
            .command_multi(&parse("(get-value (x))").unwrap())
            .unwrap();
        assert_eq!(resp.len(), 2);
        assert_eq!(resp[0].atom_str(), Some("values:"));
        insta::assert_snapshot!(&resp[1], @"((x 7))");
    }

    #[test]
    fn test_cvc5_strings() {
        let cvc5 = CvcConf::new_cvc5(&solver_path("cvc5")).done();
        let Ok(mut solver) = SmtProc::new(cvc5, None) else {
            eprintln!("could not find cvc5, skipping test");
            return;
        };
        solver.declare("w", vec![], atom_s("String"));
        solver.assert(&parse("(and (str.prefixof \"ab\" w) (= (str.len w) 1))").unwrap());
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        insta::assert_debug_snapshot!(response, @"Unsat");
    }

    #[test]
    fn test_z3_error_response() {
        let Some(mut solver) = start_z3() else { return };
        // unbound symbol
        solver.send(&parse("(assert q)").unwrap());
        let r = solver.check_sat();
        assert!(matches!(r, Err(SolverError::UnexpectedClose(_))));
    }

    #[test]
    fn test_kill_during_check_sat() {
        let Some(mut solver) = start_z3() else { return };
        let pid = solver.pid();
        // a floating-point non-theorem that takes Z3 a long time to refute
        let slow_query = "
(set-logic QF_FP)
(declare-const a Float32)
(declare-const b Float32)
(declare-const r0 Float32)
(declare-const r1 Float32)
(assert (= r0 (fp.abs a)))
(assert (= r1 (fp.abs b)))
(assert (not (= (fp.mul RNE r0 r1) (fp.mul RNE (fp.abs a) (fp.abs b)))))
"
        .trim();
        for line in slow_query.lines().filter(|line| !line.is_empty()) {
            solver.send(&parse(line).unwrap());
        }
        let (send, recv) = mpsc::channel();
        thread::spawn(move || {
            send.send(solver.check_sat()).unwrap();
        });
        // give check-sat a moment to start before killing it
        thread::sleep(Duration::from_millis(50));
        pid.kill();
        let r = recv.recv().unwrap();
        assert!(
            matches!(r, Err(SolverError::Killed)),
            "killed check-sat returned {r:?}"
        );
    }

    #[test]
    fn test_kill_while_idle() {
        let Some(mut solver) = start_z3() else { return };
        let pid = solver.pid();

        solver.send(&parse("(set-logic QF_LIA)").unwrap());

        // the solver is idle, so this only flags it
        pid.kill();
        assert!(pid.is_killed());

        // commands without a response are swallowed after the flag
        solver.send(&parse("(declare-const a Int)").unwrap());
        solver.send(&parse("(assert (= a (+ a 1)))").unwrap());

        // the next expensive call reports the kill
        assert!(matches!(solver.check_sat(), Err(SolverError::Killed)));
    }

    #[test]
    fn test_get_info_z3() {
        let Some(mut solver) = start_z3() else { return };
        let name = solver.get_info(":name").unwrap();
        assert_eq!(name.atom_str(), Some("Z3"));
    }
}
