//! Score and severity properties.

use proptest::prelude::*;

use packguard_analysis::findings::{Finding, Severity};
use packguard_analysis::report::{risk_score, Verdict};

fn finding_with(severity: Severity) -> Finding {
    let mut f = Finding::new("a.js", 1, "backdoor", "m", "x", "x", 1.0, 1.0, severity);
    f.adjusted_severity = severity;
    f
}

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

proptest! {
    /// The risk score is a pure sum: permuting the finding order never
    /// changes it, and it saturates at 100.
    #[test]
    fn risk_score_is_order_independent_and_saturated(
        severities in proptest::collection::vec(severity_strategy(), 0..24),
    ) {
        let findings: Vec<Finding> = severities.iter().map(|s| finding_with(*s)).collect();
        let mut reversed = findings.clone();
        reversed.reverse();

        let forward = risk_score(&findings);
        let backward = risk_score(&reversed);
        prop_assert_eq!(forward, backward);
        prop_assert!(forward <= 100);
    }

    /// Verdict bands are monotone in the risk score.
    #[test]
    fn verdict_is_monotone(a in 0u32..=100, b in 0u32..=100) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |v: Verdict| match v {
            Verdict::Safe => 0,
            Verdict::Review => 1,
            Verdict::DoNotInstall => 2,
        };
        prop_assert!(rank(Verdict::from_risk_score(lo)) <= rank(Verdict::from_risk_score(hi)));
    }
}
