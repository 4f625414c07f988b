use crate::model::{ComparisonOutcome, OutcomeStatus, ReconSummary, Verdict};

/// Compute summary statistics from field outcomes.
pub fn compute_summary(outcomes: &[ComparisonOutcome]) -> ReconSummary {
    let mut same = 0;
    let mut mismatch = 0;
    let mut info = 0;
    let mut error = 0;

    for o in outcomes {
        match o.status {
            OutcomeStatus::Same => same += 1,
            OutcomeStatus::Mismatch => mismatch += 1,
            OutcomeStatus::Info => info += 1,
            OutcomeStatus::Error => error += 1,
        }
    }

    ReconSummary {
        total_fields: outcomes.len(),
        same,
        mismatch,
        info,
        error,
        verdict: if mismatch + error == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        },
    }
}
