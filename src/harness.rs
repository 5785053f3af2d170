//! Scenario bookkeeping: outcomes, warnings and the run summary.

use crate::client::ProbeConfig;
use crate::Error;

/// Run-wide configuration for the conventions the server contract leaves
/// open: the probe shape and whether raw control characters in paths fail a
/// scenario or only warn.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Shape and expected status of the liveness probe.
    pub probe: ProbeConfig,
    /// Treat an unexpected status for `\r`/`\n` paths as fatal instead of
    /// advisory.
    pub ctrl_path_fatal: bool,
}

/// Accumulated outcomes for one run.
///
/// Scenario failures are plain `Result`s recorded here, never panics or
/// ambient globals, so every exit path of a scenario body ends in exactly
/// one `record` call.
#[derive(Debug, Default)]
pub struct RunCtx {
    passed: u32,
    failed: u32,
    warnings: u32,
}

impl RunCtx {
    /// A fresh context with zeroed counters.
    pub fn new() -> Self {
        RunCtx::default()
    }

    /// Record one scenario outcome along with the warnings it produced.
    ///
    /// Warnings are printed first, then the PASS or FAIL line; a failure
    /// prints its captured cause and never aborts the run.
    pub fn record(&mut self, name: &str, result: Result<(), Error>, warnings: Vec<String>) {
        for warning in &warnings {
            println!("WARN [{}] Warning from test: {}", name, warning);
        }
        self.warnings += warnings.len() as u32;

        match result {
            Ok(()) => {
                println!("PASS [{}]", name);
                self.passed += 1;
            }
            Err(e) => {
                println!();
                println!("FAIL [{}]", name);
                println!("    {}", e);
                println!();
                self.failed += 1;
            }
        }
    }

    /// Number of failed scenarios so far.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// The one-line run summary.
    pub fn summary(&self) -> String {
        let mut line = format!("{} tests passed, {} tests failed", self.passed, self.failed);
        if self.warnings > 0 {
            line.push_str(&format!(", {} warnings", self.warnings));
        }
        line
    }
}
