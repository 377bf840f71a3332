//! Structured scan report for the report/CLI collaborator.

use serde::{Deserialize, Serialize};

use crate::findings::{Finding, Severity};

/// Run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInfo {
    pub duration_ms: u64,
    pub files_scanned: usize,
    pub target: String,
}

/// Finding counts by effective severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.effective_severity() {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}

/// Install recommendation derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "DO NOT INSTALL")]
    DoNotInstall,
}

impl Verdict {
    pub fn from_risk_score(score: u32) -> Self {
        if score <= 40 {
            Verdict::Safe
        } else if score <= 80 {
            Verdict::Review
        } else {
            Verdict::DoNotInstall
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Review => "REVIEW",
            Verdict::DoNotInstall => "DO NOT INSTALL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// `min(100, Σ per-finding points)`.
    pub risk_score: u32,
    pub verdict: Verdict,
    pub counts: SeverityCounts,
}

/// The complete run output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_info: ScanInfo,
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn build(
        findings: Vec<Finding>,
        duration_ms: u64,
        files_scanned: usize,
        target: String,
    ) -> Self {
        let risk_score = risk_score(&findings);
        Self {
            scan_info: ScanInfo {
                duration_ms,
                files_scanned,
                target,
            },
            summary: ScanSummary {
                risk_score,
                verdict: Verdict::from_risk_score(risk_score),
                counts: SeverityCounts::from_findings(&findings),
            },
            findings,
        }
    }

    /// Process exit status for CI gating: 2 with any critical finding, 1
    /// with any high finding, else 0.
    pub fn exit_code(&self) -> i32 {
        if self.summary.counts.critical > 0 {
            2
        } else if self.summary.counts.high > 0 {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Order-independent point sum, saturating at 100.
pub fn risk_score(findings: &[Finding]) -> u32 {
    let total: u32 = findings
        .iter()
        .map(|f| f.effective_severity().risk_points())
        .sum();
    total.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        let mut f = Finding::new(
            "a.js",
            1,
            "backdoor",
            "m",
            "x",
            "x",
            1.0,
            1.0,
            severity,
        );
        f.adjusted_severity = severity;
        f
    }

    #[test]
    fn risk_score_saturates() {
        // One critical (100) plus one medium (20) saturates at 100.
        let findings = vec![finding(Severity::Critical), finding(Severity::Medium)];
        assert_eq!(risk_score(&findings), 100);
        let report = ScanReport::build(findings, 5, 2, "pkg".into());
        assert_eq!(report.summary.verdict, Verdict::DoNotInstall);
        assert_eq!(report.summary.verdict.to_string(), "DO NOT INSTALL");
    }

    #[test]
    fn risk_score_is_order_independent() {
        let a = vec![finding(Severity::High), finding(Severity::Medium)];
        let b = vec![finding(Severity::Medium), finding(Severity::High)];
        assert_eq!(risk_score(&a), risk_score(&b));
        assert_eq!(risk_score(&a), 70);
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(Verdict::from_risk_score(0), Verdict::Safe);
        assert_eq!(Verdict::from_risk_score(40), Verdict::Safe);
        assert_eq!(Verdict::from_risk_score(41), Verdict::Review);
        assert_eq!(Verdict::from_risk_score(80), Verdict::Review);
        assert_eq!(Verdict::from_risk_score(81), Verdict::DoNotInstall);
    }

    #[test]
    fn exit_codes() {
        let critical = ScanReport::build(vec![finding(Severity::Critical)], 0, 1, "t".into());
        assert_eq!(critical.exit_code(), 2);
        let high = ScanReport::build(vec![finding(Severity::High)], 0, 1, "t".into());
        assert_eq!(high.exit_code(), 1);
        let medium = ScanReport::build(vec![finding(Severity::Medium)], 0, 1, "t".into());
        assert_eq!(medium.exit_code(), 0);
        let empty = ScanReport::build(Vec::new(), 0, 0, "t".into());
        assert_eq!(empty.exit_code(), 0);
    }

    #[test]
    fn report_serializes() {
        let report = ScanReport::build(vec![finding(Severity::Low)], 3, 1, "pkg".into());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"risk_score\": 0"));
        assert!(json.contains("\"SAFE\""));
    }
}
