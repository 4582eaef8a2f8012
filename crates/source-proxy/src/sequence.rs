//! Sequential filenames
//!
//! A stored filename may carry a numeric run (`report-007.csv`). Before each
//! store the proxy advances that run by one, so clients can upload the
//! "next" file of a series without tracking the counter themselves.

use crate::config::ProxyConfig;

use regex::Regex;

pub const DEFAULT_MATCH_EXPRESSION: &str = "[0-9]+";

#[derive(Debug, thiserror::Error)]
#[error("error compiling match expression of <{expression}>")]
pub struct SequenceError {
    expression: String,
    #[source]
    source: regex::Error,
}

/// The compiled filename pattern.
///
/// Built once at startup and shared read-only by every request; cloning is
/// cheap.
#[derive(Debug, Clone)]
pub struct FilenameSequence {
    pattern: Regex,
}

impl FilenameSequence {
    /// Compiles `expression`.
    ///
    /// # Errors
    /// Returns [`SequenceError`] if `expression` is not a valid regular expression.
    pub fn new(expression: &str) -> Result<Self, SequenceError> {
        match Regex::new(expression) {
            Ok(pattern) => Ok(Self { pattern }),
            Err(source) => Err(SequenceError {
                expression: expression.to_owned(),
                source,
            }),
        }
    }

    /// Compiles the configured match expression.
    ///
    /// # Errors
    /// Returns [`SequenceError`] if the expression is not a valid regular expression.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, SequenceError> {
        Self::new(&config.match_expression)
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns `candidate` with its first numeric run incremented by one.
    ///
    /// The new number keeps the width of the old one, so zero padding
    /// survives (`007` becomes `008`) and a full run grows (`99` becomes
    /// `100`). Everything around the run is copied verbatim.
    ///
    /// When there is no match, or the match is not a decimal number, or the
    /// increment would overflow, `candidate` is returned unchanged.
    ///
    /// ```
    /// # use source_proxy::sequence::{FilenameSequence, DEFAULT_MATCH_EXPRESSION};
    /// let seq = FilenameSequence::new(DEFAULT_MATCH_EXPRESSION).unwrap();
    /// assert_eq!(seq.normalize("report-007.csv"), "report-008.csv");
    /// assert_eq!(seq.normalize("report.csv"), "report.csv");
    /// ```
    #[must_use]
    pub fn normalize(&self, candidate: &str) -> String {
        let Some(caps) = self.pattern.captures(candidate) else { return candidate.to_owned() };

        let run = if self.pattern.captures_len() > 1 { caps.get(1) } else { caps.get(0) };
        let Some(run) = run else { return candidate.to_owned() };
        let Some(next) = increment(run.as_str()) else { return candidate.to_owned() };

        let mut out = String::with_capacity(candidate.len() + 1);
        out.push_str(&candidate[..run.start()]);
        out.push_str(&next);
        out.push_str(&candidate[run.end()..]);
        out
    }
}

fn increment(digits: &str) -> Option<String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = digits.parse().ok()?;
    let next = n.checked_add(1)?;
    Some(format!("{next:0width$}", width = digits.len()))
}
