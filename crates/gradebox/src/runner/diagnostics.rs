//! Compiler diagnostic parsing
//!
//! Parses the toolchain's textual output into structured diagnostics.
//! The expected shape is the javac family's
//! `file:line: severity: message`, optionally followed by the offending
//! source line and a caret line marking the column:
//!
//! ```text
//! Calculator.java:10: error: ';' expected
//!         return a + b
//!                     ^
//! ```
//!
//! The parser is lenient: lines that do not look like diagnostics (notes,
//! summary trailers, arbitrary toolchain chatter) are skipped, and the raw
//! output is always retained alongside the parsed list.

use crate::types::{Diagnostic, Severity};

/// Parse every diagnostic in the compiler output, in emission order.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    let lines: Vec<&str> = output.lines().collect();
    let mut diagnostics = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let Some(diagnostic) = parse_header(lines[i]) else {
            i += 1;
            continue;
        };

        // A header may be followed by the source line and a caret line; the
        // caret position gives the 1-indexed column. The source line slot
        // must not itself be a header, or the caret belongs elsewhere.
        let source_is_header = lines.get(i + 1).is_some_and(|l| parse_header(l).is_some());
        if !source_is_header
            && let Some(column) = caret_column(lines.get(i + 2).copied())
        {
            diagnostics.push(diagnostic.with_column(column));
            i += 3;
        } else {
            diagnostics.push(diagnostic);
            i += 1;
        }
    }

    diagnostics
}

/// Parse a `file:line: severity: message` header line
fn parse_header(line: &str) -> Option<Diagnostic> {
    let (file, rest) = line.split_once(':')?;
    let (line_no, rest) = rest.split_once(':')?;

    let file = file.trim();
    if file.is_empty() {
        return None;
    }

    let line_no: u32 = line_no.trim().parse().ok()?;

    let rest = rest.trim_start();
    let (severity, message) = if let Some(message) = rest.strip_prefix("error:") {
        (Severity::Error, message)
    } else if let Some(message) = rest.strip_prefix("warning:") {
        (Severity::Warning, message)
    } else {
        return None;
    };

    Some(Diagnostic {
        severity,
        file: file.to_owned(),
        line: line_no,
        column: None,
        message: message.trim().to_owned(),
    })
}

/// Column marked by a caret line (whitespace followed by a single `^`)
fn caret_column(line: Option<&str>) -> Option<u32> {
    let line = line?;
    let trimmed = line.trim_end();
    if trimmed.ends_with('^') && trimmed[..trimmed.len() - 1].chars().all(|c| c.is_whitespace()) {
        Some(trimmed.chars().count() as u32)
    } else {
        None
    }
}
