use serde::{Deserialize, Serialize};

use crate::classes::{DamageClass, CLASS_COUNT};

/// outcome of one per-class prediction against ground truth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    TP,
    TN,
    FP,
    FN,
}

impl Quadrant {
    #[inline]
    pub fn classify(predicted: bool, actual: bool) -> Self {
        match (predicted, actual) {
            (true, true) => Quadrant::TP,
            (true, false) => Quadrant::FP,
            (false, true) => Quadrant::FN,
            (false, false) => Quadrant::TN,
        }
    }
}

/// dollar cost of each quadrant for a single class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantCosts {
    #[serde(rename = "TP")]
    pub tp: u32,
    #[serde(rename = "TN")]
    pub tn: u32,
    #[serde(rename = "FP")]
    pub fp: u32,
    #[serde(rename = "FN")]
    pub fn_: u32,
}

impl QuadrantCosts {
    pub const fn new(tp: u32, tn: u32, fp: u32, fn_: u32) -> Self {
        Self { tp, tn, fp, fn_ }
    }

    #[inline]
    pub fn cost(&self, quadrant: Quadrant) -> u32 {
        match quadrant {
            Quadrant::TP => self.tp,
            Quadrant::TN => self.tn,
            Quadrant::FP => self.fp,
            Quadrant::FN => self.fn_,
        }
    }

    /// total cost of a tally of outcomes
    #[inline]
    pub fn total(&self, counts: &QuadrantCounts) -> u64 {
        counts.tp * self.tp as u64
            + counts.tn * self.tn as u64
            + counts.fp * self.fp as u64
            + counts.fn_ * self.fn_ as u64
    }
}

/// per-class quadrant costs. built once from configuration and shared read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostTable {
    #[serde(rename = "D00")]
    pub d00: QuadrantCosts,
    #[serde(rename = "D10")]
    pub d10: QuadrantCosts,
    #[serde(rename = "D20")]
    pub d20: QuadrantCosts,
    #[serde(rename = "D40")]
    pub d40: QuadrantCosts,
}

impl CostTable {
    #[inline]
    pub fn for_class(&self, class: DamageClass) -> &QuadrantCosts {
        match class {
            DamageClass::D00 => &self.d00,
            DamageClass::D10 => &self.d10,
            DamageClass::D20 => &self.d20,
            DamageClass::D40 => &self.d40,
        }
    }

    #[inline]
    pub fn cost(&self, class: DamageClass, quadrant: Quadrant) -> u32 {
        self.for_class(class).cost(quadrant)
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            d00: QuadrantCosts::new(1000, 0, 1200, 2000),
            d10: QuadrantCosts::new(900, 0, 1100, 1800),
            d20: QuadrantCosts::new(1400, 0, 1600, 2200),
            d40: QuadrantCosts::new(1800, 0, 2000, 3000),
        }
    }
}

/// tally of outcomes for one class over a table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuadrantCounts {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
}

impl QuadrantCounts {
    #[inline]
    pub fn record(&mut self, quadrant: Quadrant) {
        match quadrant {
            Quadrant::TP => self.tp += 1,
            Quadrant::TN => self.tn += 1,
            Quadrant::FP => self.fp += 1,
            Quadrant::FN => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// per-class breakdown of one evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub counts: [QuadrantCounts; CLASS_COUNT],
    pub costs: [u64; CLASS_COUNT],
}

impl CostBreakdown {
    pub fn total(&self) -> u64 {
        self.costs.iter().sum()
    }
}
