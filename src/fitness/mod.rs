// Cost model organization
// cost_table holds the business costs, table the joined data, this module the evaluation

pub mod cost_table;
pub mod table;

pub use cost_table::{CostBreakdown, CostTable, Quadrant, QuadrantCosts, QuadrantCounts};
pub use table::{EvaluationRow, EvaluationTable};

use crate::classes::DamageClass;
use crate::dna::ThresholdVector;
use crate::error::InputError;

/// converts a threshold vector into a total dollar cost over a joined table.
/// pure: holds only read-only references, so it is safe to share across rayon workers.
#[derive(Clone, Copy, Debug)]
pub struct CostModel<'a> {
    costs: &'a CostTable,
    table: &'a EvaluationTable,
}

impl<'a> CostModel<'a> {
    pub fn new(costs: &'a CostTable, table: &'a EvaluationTable) -> Self {
        Self { costs, table }
    }

    /// total cost of classifying every row with `thresholds` (lower is better).
    /// a probability equal to its threshold counts as a negative prediction.
    #[inline]
    pub fn evaluate(&self, thresholds: &ThresholdVector) -> u64 {
        profiling::scope!("CostModel::evaluate");
        DamageClass::ALL
            .iter()
            .map(|&class| {
                let counts = self.class_counts(class, thresholds.get(class));
                self.costs.for_class(class).total(&counts)
            })
            .sum()
    }

    /// same as `evaluate` for a dynamically sized vector; rejects wrong arity
    pub fn evaluate_slice(&self, thresholds: &[f64]) -> Result<u64, InputError> {
        let thresholds = ThresholdVector::from_slice(thresholds)?;
        Ok(self.evaluate(&thresholds))
    }

    /// per-class quadrant tallies and costs for one vector
    pub fn breakdown(&self, thresholds: &ThresholdVector) -> CostBreakdown {
        let mut out = CostBreakdown::default();
        for class in DamageClass::ALL {
            let counts = self.class_counts(class, thresholds.get(class));
            out.costs[class.index()] = self.costs.for_class(class).total(&counts);
            out.counts[class.index()] = counts;
        }
        out
    }

    /// single pass over one class column; no allocation
    #[inline]
    fn class_counts(&self, class: DamageClass, threshold: f64) -> QuadrantCounts {
        let col = self.table.column(class);
        let mut counts = QuadrantCounts::default();
        for (&p, &actual) in col.probs.iter().zip(&col.flags) {
            counts.record(Quadrant::classify(p > threshold, actual));
        }
        counts
    }
}
