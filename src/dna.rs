use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classes::{DamageClass, CLASS_COUNT};
use crate::error::InputError;

/// per-class decision thresholds, one component per damage class in fixed order.
/// every constructor and mutator keeps components inside the search bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; CLASS_COUNT]")]
pub struct ThresholdVector([f64; CLASS_COUNT]);

impl From<[f64; CLASS_COUNT]> for ThresholdVector {
    fn from(values: [f64; CLASS_COUNT]) -> Self {
        Self::new(values)
    }
}

impl ThresholdVector {
    /// build from raw components, clamping each into [0, 1]
    pub fn new(values: [f64; CLASS_COUNT]) -> Self {
        Self(values).clamped(0.0, 1.0)
    }

    /// build from a dynamically sized slice (e.g. parsed from the command line)
    pub fn from_slice(values: &[f64]) -> Result<Self, InputError> {
        let arr: [f64; CLASS_COUNT] = values
            .try_into()
            .map_err(|_| InputError::ThresholdArity {
                expected: CLASS_COUNT,
                actual: values.len(),
            })?;
        Ok(Self::new(arr))
    }

    /// each component drawn independently and uniformly from [low, high]
    pub fn random<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> Self {
        profiling::scope!("ThresholdVector::random");
        let mut values = [0.0; CLASS_COUNT];
        for v in &mut values {
            *v = rng.random_range(low..=high);
        }
        Self(values)
    }

    #[inline]
    pub fn get(&self, class: DamageClass) -> f64 {
        self.0[class.index()]
    }

    #[inline]
    pub fn as_array(&self) -> &[f64; CLASS_COUNT] {
        &self.0
    }

    /// overwrite one component, clamped to [low, high]
    #[inline]
    pub fn set_clamped(&mut self, index: usize, value: f64, low: f64, high: f64) {
        self.0[index] = clamp_component(value, low, high);
    }

    pub fn clamped(mut self, low: f64, high: f64) -> Self {
        for v in &mut self.0 {
            *v = clamp_component(*v, low, high);
        }
        self
    }

    /// components rounded to `decimals` places (for reports)
    pub fn rounded(&self, decimals: i32) -> [f64; CLASS_COUNT] {
        let scale = 10f64.powi(decimals);
        self.0.map(|v| (v * scale).round() / scale)
    }

    /// (class, threshold) pairs in class order
    pub fn iter(&self) -> impl Iterator<Item = (DamageClass, f64)> + '_ {
        DamageClass::ALL.iter().map(move |&c| (c, self.0[c.index()]))
    }
}

/// NaN would survive clamp(); pin it to the lower bound
#[inline]
fn clamp_component(value: f64, low: f64, high: f64) -> f64 {
    if value.is_nan() {
        low
    } else {
        value.clamp(low, high)
    }
}

/// a candidate threshold vector and its cost, once evaluated.
/// cost is None until the engine evaluates it; copies of an unchanged vector keep theirs.
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub thresholds: ThresholdVector,
    pub cost: Option<u64>,
}

impl Individual {
    pub fn new(thresholds: ThresholdVector) -> Self {
        Self { thresholds, cost: None }
    }

    pub fn evaluated(thresholds: ThresholdVector, cost: u64) -> Self {
        Self {
            thresholds,
            cost: Some(cost),
        }
    }

    /// cost for ordering; unevaluated individuals sort last
    #[inline]
    pub fn cost_or_max(&self) -> u64 {
        self.cost.unwrap_or(u64::MAX)
    }
}
