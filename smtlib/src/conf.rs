// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Launch configurations for the supported solvers: Z3, CVC4/CVC5, and
//! SMTInterpol.
//!
//! Each builder knows one binary's flags and startup options and produces a
//! [`SolverCmd`], which is all [`SmtProc`](crate::proc::SmtProc) needs to
//! launch and initialize the process.

/// The full invocation of a solver binary.
#[derive(Debug, Clone)]
pub struct SolverCmd {
    /// Binary to launch
    pub cmd: String,
    /// Arguments to pass
    pub args: Vec<String>,
    /// SMT options to send on startup
    pub options: Vec<(String, String)>,
    /// SMT-LIB logic to set on startup (None leaves the solver's default)
    pub logic: Option<String>,
}

impl SolverCmd {
    fn args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
    }

    /// Record an option to send as `(set-option :name val)` on startup.
    fn option<S: AsRef<str>>(&mut self, name: &str, val: S) {
        self.options
            .push((name.to_string(), val.as_ref().to_string()));
    }

    /// Render the command line, for logging.
    pub fn cmdline(&self) -> String {
        #[allow(clippy::useless_format)]
        let args: Vec<_> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(' ') {
                    format!("\"{a}\"")
                } else {
                    format!("{a}")
                }
            })
            .collect();
        format!("{} {}", &self.cmd, args.join(" "))
    }
}

fn base_cmd(cmd: &str) -> SolverCmd {
    SolverCmd {
        cmd: cmd.to_string(),
        args: vec![],
        options: vec![],
        logic: Some("ALL".to_string()),
    }
}

/// Builder for a Z3 [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct Z3Conf(SolverCmd);

impl Z3Conf {
    /// A Z3 configuration with model production enabled and a generous
    /// default timeout. `cmd` is the path to the binary.
    pub fn new(cmd: &str) -> Self {
        let mut cmd = base_cmd(cmd);
        cmd.args(["-in", "-smt2"]);
        cmd.option("produce-models", "true");
        cmd.option("model.completion", "true");
        let mut conf = Self(cmd);
        conf.timeout_ms(Some(30000 * 100));
        conf
    }

    /// Enable proof construction, needed for interpolant generation.
    pub fn interpolation(&mut self) {
        self.0.option("produce-proofs", "true");
    }

    /// Set a per-query time limit. None restores Z3's own default.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        // Z3's default timeout value
        let ms = ms.unwrap_or(4294967295);
        self.0.option("timeout", format!("{ms}"));
    }

    /// Set the solver's random seed.
    pub fn seed(&mut self, seed: usize) {
        self.0.option("smt.random_seed", format!("{seed}"));
        self.0.option("sat.random_seed", format!("{seed}"));
    }

    /// Finish, producing the command to launch.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}

/// Builder for a CVC4 or CVC5 [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct CvcConf(SolverCmd);

impl CvcConf {
    fn new_cvc(cmd: &str) -> Self {
        let mut cmd = base_cmd(cmd);
        // --lang smt2 is needed when feeding CVC4 over stdin; from a .smt2
        // file it would infer the format
        cmd.args(vec!["-q", "--lang", "smt2"]);
        cmd.option("interactive", "false");
        cmd.option("incremental", "true");
        cmd.option("produce-models", "true");
        cmd.option("seed", "1");
        Self(cmd)
    }

    /// A CVC4 configuration. `cmd` is the path to the binary.
    pub fn new_cvc4(cmd: &str) -> Self {
        let mut conf = Self::new_cvc(cmd);
        // CVC4 gates the string theory's extended operators behind this flag
        conf.0.option("strings-exp", "true");
        conf
    }

    /// A CVC5 configuration. `cmd` is the path to the binary.
    pub fn new_cvc5(cmd: &str) -> Self {
        Self::new_cvc(cmd)
    }

    /// Set a per-query time limit. None sets no time limit.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        let ms = ms.unwrap_or(0);
        self.0.option("tlimit-per", format!("{ms}"));
    }

    /// Set the solver's random seed.
    pub fn seed(&mut self, seed: usize) {
        self.0.option("seed", format!("{seed}"));
    }

    /// Finish, producing the command to launch.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}

/// Builder for an SMTInterpol [`SolverCmd`], launched through a JVM.
#[derive(Debug, Clone)]
pub struct SmtInterpolConf(SolverCmd);

impl SmtInterpolConf {
    /// An SMTInterpol configuration. `java` is the path to the JVM and `jar`
    /// the path to the SMTInterpol jar file.
    pub fn new(java: &str, jar: &str) -> Self {
        let mut cmd = base_cmd(java);
        cmd.args(["-jar", jar, "-q"]);
        cmd.option("produce-models", "true");
        // SMTInterpol does not implement ALL
        cmd.logic = Some("QF_AUFLIA".to_string());
        Self(cmd)
    }

    /// Set a per-query time limit. None sets no time limit.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        if let Some(ms) = ms {
            self.0.option("timeout", format!("{ms}"));
        }
    }

    /// Set the solver's random seed.
    pub fn seed(&mut self, seed: usize) {
        self.0.option("random-seed", format!("{seed}"));
    }

    /// Finish, producing the command to launch.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}
