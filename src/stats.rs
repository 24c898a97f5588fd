//! Log statistics extraction

use std::collections::BTreeSet;
use std::fmt;

/// Aggregate counts over a batch of raw log lines.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogStats {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Distinct bracketed component tags seen across the batch.
    pub components: BTreeSet<String>,
}

impl LogStats {
    /// Summarize a batch of lines. Pure; an empty batch yields all-zero
    /// counts and an empty component set.
    pub fn summarize<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut stats = LogStats::default();
        for line in lines {
            let line = line.as_ref();
            stats.total += 1;
            // First match wins; a line never lands in more than one bucket.
            if line.contains("ERROR") {
                stats.errors += 1;
            } else if line.contains("WARNING") {
                stats.warnings += 1;
            } else if line.contains("INFO") {
                stats.infos += 1;
            }
            if let Some(tag) = component_tag(line) {
                stats.components.insert(tag.to_string());
            }
        }
        stats
    }
}

impl fmt::Display for LogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total lines: {}", self.total)?;
        writeln!(f, "Errors: {}", self.errors)?;
        writeln!(f, "Warnings: {}", self.warnings)?;
        write!(f, "Info: {}", self.infos)?;
        if !self.components.is_empty() {
            let tags: Vec<&str> = self.components.iter().map(String::as_str).collect();
            write!(f, "\nComponents: {}", tags.join(", "))?;
        }
        Ok(())
    }
}

/// The text strictly between the first `[` and the first `]`, when the line
/// carries a non-empty bracketed tag.
fn component_tag(line: &str) -> Option<&str> {
    let open = line.find('[')?;
    let close = line.find(']')?;
    if close > open + 1 {
        Some(&line[open + 1..close])
    } else {
        None
    }
}
