//! An SMT solver running as a subprocess
//!
//! The script is piped to the solver's stdin. After the `(check-sat)` reply
//! the model or the unsat core is requested on the same pipe.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process;
use std::time::{Duration, Instant};

use log::{error, trace};

use super::{SmtSolver, SolverResponse};
use crate::error::{Error, Result};

fn io_error(e: io::Error) -> Error {
    Error::Solver(e.to_string())
}

/// A solver binary such as `cvc4`
///
/// One process is started per [`SmtSolver::check`] call. A time limit is
/// passed as `--tlimit=<ms>`.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    program: OsString,
    args: Vec<OsString>,
}

impl ProcessSolver {
    /// Runs `program` with `--lang=smt2 --incremental`
    pub fn new(program: impl Into<OsString>) -> Self {
        Self::with_args(program, ["--lang=smt2", "--incremental"])
    }

    /// Runs `program` with explicit arguments
    pub fn with_args<I, A>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl SmtSolver for ProcessSolver {
    fn check(&mut self, script: &str, timeout: Option<Duration>) -> Result<SolverResponse> {
        let mut args = self.args.clone();
        if let Some(limit) = timeout {
            args.push(format!("--tlimit={}", limit.as_millis()).into());
        }
        let mut session = Session::spawn(&self.program, args)?;
        let start = Instant::now();
        session.send(script)?;
        let reply = session.recv()?;
        match reply.trim() {
            "sat" => {
                session.send("(get-model)")?;
                Ok(SolverResponse::Sat(session.recv()?))
            }
            "unsat" => {
                session.send("(get-unsat-core)")?;
                let core = session.recv()?;
                // cores were not enabled for this script
                if core.trim_start().starts_with("(error") {
                    Ok(SolverResponse::Unsat(None))
                } else {
                    Ok(SolverResponse::Unsat(Some(core)))
                }
            }
            "unknown" | "timeout" => match timeout {
                Some(limit) if start.elapsed() >= limit => Ok(SolverResponse::Timeout),
                _ if reply.trim() == "timeout" => Ok(SolverResponse::Timeout),
                _ => Ok(SolverResponse::Unknown),
            },
            other => {
                error!("unexpected solver reply: {}", other);
                Err(Error::Solver(format!("unexpected reply '{}'", other)))
            }
        }
    }
}

struct Session {
    handle: process::Child,
    stdin: io::BufWriter<process::ChildStdin>,
    stdout: io::Lines<io::BufReader<process::ChildStdout>>,
}

impl Session {
    fn spawn(program: &OsString, args: Vec<OsString>) -> Result<Self> {
        let mut handle = process::Command::new(program)
            .args(args)
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .spawn()
            .map_err(io_error)?;
        let stdin = handle
            .stdin
            .take()
            .ok_or_else(|| Error::Solver("solver stdin is not piped".to_string()))?;
        let stdout = handle
            .stdout
            .take()
            .ok_or_else(|| Error::Solver("solver stdout is not piped".to_string()))?;
        Ok(Self {
            handle,
            stdin: io::BufWriter::new(stdin),
            stdout: io::BufReader::new(stdout).lines(),
        })
    }

    fn send(&mut self, text: &str) -> Result<()> {
        trace!("-> {}", text);
        writeln!(self.stdin, "{}", text).map_err(io_error)?;
        self.stdin.flush().map_err(io_error)
    }

    /// Reads one reply: a bare word or a balanced s-expression
    fn recv(&mut self) -> Result<String> {
        let mut reply = String::new();
        let mut depth = 0usize;
        for line in self.stdout.by_ref() {
            let line = line.map_err(io_error)?;
            trace!("<- {}", line);
            if line.trim().is_empty() && reply.is_empty() {
                continue;
            }
            depth = paren_depth(&line, depth);
            reply.push_str(&line);
            reply.push('\n');
            if depth == 0 {
                return Ok(reply);
            }
        }
        Err(Error::Solver("solver closed its output".to_string()))
    }
}

/// Nesting depth after `line`, ignoring parentheses in `|symbols|`, strings and comments
fn paren_depth(line: &str, mut depth: usize) -> usize {
    let mut quoted: Option<char> = None;
    for c in line.chars() {
        match (quoted, c) {
            (Some(q), c) if c == q => quoted = None,
            (Some(_), _) => {}
            (None, '|' | '"') => quoted = Some(c),
            (None, ';') => break,
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) => {}
        }
    }
    depth
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.handle.kill();
        let _ = self.handle.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_ignores_quoted_parens() {
        assert_eq!(paren_depth("(model", 0), 1);
        assert_eq!(paren_depth("(define-fun |a (b| () Bool true)", 1), 1);
        assert_eq!(paren_depth(")", 1), 0);
        assert_eq!(paren_depth("; ((", 0), 0);
    }

    #[test]
    fn missing_binary_is_a_solver_error() {
        let mut solver = ProcessSolver::new("alloy2smt-no-such-solver");
        let result = solver.check("(check-sat)", None);
        assert!(matches!(result, Err(Error::Solver(_))));
    }
}
