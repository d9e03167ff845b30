//! Response rules
//!
//! A rule set is an ordered list of (pattern, response, delay) triples plus
//! the echo flag. Rules are immutable once loaded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single request pattern and the canned response it triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleRecord", into = "RuleRecord")]
pub struct ResponseRule {
    pattern: String,
    response: Vec<u8>,
    delay: Duration,
}

/// On-disk shape of a rule
#[derive(Serialize, Deserialize)]
struct RuleRecord {
    request_pattern: String,
    response_data: String,
    delay_ms: u64,
}

impl From<RuleRecord> for ResponseRule {
    fn from(record: RuleRecord) -> Self {
        Self {
            pattern: record.request_pattern,
            response: record.response_data.into_bytes(),
            delay: Duration::from_millis(record.delay_ms),
        }
    }
}

impl From<ResponseRule> for RuleRecord {
    fn from(rule: ResponseRule) -> Self {
        Self {
            request_pattern: rule.pattern,
            response_data: String::from_utf8_lossy(&rule.response).into_owned(),
            delay_ms: u64::try_from(rule.delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl ResponseRule {
    /// Create a rule responding immediately
    pub fn new(pattern: impl Into<String>, response: impl Into<Vec<u8>>) -> Self {
        Self {
            pattern: pattern.into(),
            response: response.into(),
            delay: Duration::ZERO,
        }
    }

    /// Set the latency applied before the response is returned
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Substring looked for in the decoded request
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Bytes written back on a match
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Simulated device latency
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether this rule's pattern occurs in the decoded request
    pub fn matches(&self, decoded: &str) -> bool {
        decoded.contains(self.pattern.as_str())
    }
}

/// Ordered rules plus the echo flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Return every request verbatim, bypassing the rules
    #[serde(default)]
    pub echo_mode: bool,
    /// Rules in declaration order
    #[serde(default, rename = "response_rules")]
    pub rules: Vec<ResponseRule>,
}

impl RuleSet {
    /// Rule set in echo mode
    pub fn echo() -> Self {
        Self {
            echo_mode: true,
            rules: Vec::new(),
        }
    }

    /// Rule set matching the given rules in order
    pub fn with_rules(rules: Vec<ResponseRule>) -> Self {
        Self {
            echo_mode: false,
            rules,
        }
    }

    /// First rule whose pattern occurs in the request
    ///
    /// The request is decoded as UTF-8 with invalid sequences replaced.
    /// Echo mode is not considered here.
    pub fn find_match(&self, request: &[u8]) -> Option<&ResponseRule> {
        let decoded = String::from_utf8_lossy(request);
        self.rules.iter().find(|rule| rule.matches(&decoded))
    }
}
