//! Held-out evaluation: accuracy, per-outcome precision/recall/F1 and a
//! confusion matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::MatchOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub outcome: MatchOutcome,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// One entry per outcome, in label order.
    pub per_class: Vec<ClassMetrics>,
    /// `confusion[actual][predicted]`, indexed by `MatchOutcome::index`.
    pub confusion: [[usize; 3]; 3],
}

/// Score `predicted` against `actual`. Empty input scores zero.
pub fn evaluate(actual: &[MatchOutcome], predicted: &[MatchOutcome]) -> EvaluationReport {
    let mut confusion = [[0usize; 3]; 3];
    for (a, p) in actual.iter().zip(predicted) {
        confusion[a.index()][p.index()] += 1;
    }

    let total = actual.len().min(predicted.len());
    let correct: usize = (0..3).map(|i| confusion[i][i]).sum();
    let accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };

    let per_class = MatchOutcome::ALL
        .iter()
        .map(|&outcome| {
            let i = outcome.index();
            let tp = confusion[i][i];
            let support: usize = confusion[i].iter().sum();
            let predicted_as: usize = confusion.iter().map(|row| row[i]).sum();
            let precision = ratio(tp, predicted_as);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                outcome,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    EvaluationReport {
        accuracy,
        per_class,
        confusion,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.outcome.to_string(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        let support: usize = self.per_class.iter().map(|m| m.support).sum();
        write!(f, "{:>10} {:>29.3} {:>9}", "accuracy", self.accuracy, support)
    }
}
