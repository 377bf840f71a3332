//! Severity classification.

use serde::{Deserialize, Serialize};

/// Ordered severity classification driving exit status and report grouping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse from the catalog's string form.
    pub fn parse_str(s: &str) -> Option<Severity> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Points contributed to the report risk score.
    pub fn risk_points(&self) -> u32 {
        match self {
            Severity::Critical => 100,
            Severity::High => 50,
            Severity::Medium => 20,
            Severity::Low => 0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn parse_round_trip() {
        for s in ["low", "medium", "high", "critical"] {
            assert_eq!(Severity::parse_str(s).unwrap().name(), s);
        }
        assert!(Severity::parse_str("severe").is_none());
    }
}
