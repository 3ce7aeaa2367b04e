//! Build output in the buildpack line format.
//!
//! ```text
//! -----> Installing binaries
//!        Resolving node version 14.x...
//!  !     Dangerous semver range (>) in engines.node
//! ```
//!
//! The reporter is user-facing output, separate from tracing diagnostics.
//! Write errors are ignored: a closed stdout must not fail the build.

use std::io::Write;

const HEADER: &str = "-----> ";
const DETAIL: &str = "       ";
const WARNING: &str = " !     ";

/// Writes status lines to a build log.
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    warnings: usize,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out, warnings: 0 }
    }

    /// Start a section.
    pub fn header(&mut self, message: &str) {
        self.line(HEADER, message);
    }

    /// Report progress within a section.
    pub fn info(&mut self, message: &str) {
        self.line(DETAIL, message);
    }

    /// Report something the user should fix.
    pub fn warning(&mut self, message: &str) {
        self.warnings += 1;
        self.line(WARNING, message);
    }

    /// Echo tool output, indented under the current section.
    pub fn output(&mut self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.line(DETAIL, line);
        }
    }

    /// Number of warnings written so far.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, prefix: &str, message: &str) {
        let _ = writeln!(self.out, "{prefix}{message}");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_line_prefixes() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.header("Installing binaries");
        reporter.info("Resolving node version 14.x...");
        reporter.warning("Node version not specified");

        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(
            written(reporter),
            "-----> Installing binaries\n       Resolving node version 14.x...\n !     Node version not specified\n"
        );
    }

    #[test]
    fn test_output_indents_and_skips_blank_lines() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.output("added 3 packages\n\n  audited 4 packages\n");
        assert_eq!(
            written(reporter),
            "       added 3 packages\n         audited 4 packages\n"
        );
    }
}
