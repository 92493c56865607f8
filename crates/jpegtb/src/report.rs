use serde::Serialize;

use crate::{HarnessError, scorer::Comparison};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed { score: f64, threshold: f64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed { .. })
    }
}

/// Tally of test case outcomes over one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Scoreboard {
    cases: Vec<CaseResult>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, result: &Result<Comparison, HarnessError>) {
        let outcome = match result {
            Ok(comparison) => CaseOutcome::Passed {
                score: comparison.score,
                threshold: comparison.threshold,
            },
            Err(err) => CaseOutcome::Failed {
                reason: err.to_string(),
            },
        };
        self.cases.push(CaseResult {
            name: name.into(),
            outcome,
        });
    }

    pub fn cases(&self) -> &[CaseResult] {
        &self.cases
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "cases={}, passed={}, failed={}",
            self.cases.len(),
            self.passed(),
            self.failed()
        )
    }
}
