use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::dna::{Individual, ThresholdVector};

use super::Engine;

/// uniform crossover: each component independently taken from either parent
pub fn uniform_crossover<R: Rng + ?Sized>(
    rng: &mut R,
    parent1: &ThresholdVector,
    parent2: &ThresholdVector,
) -> ThresholdVector {
    profiling::scope!("uniform_crossover");
    let (a, b) = (parent1.as_array(), parent2.as_array());
    ThresholdVector::new(std::array::from_fn(|i| if rng.random::<bool>() { a[i] } else { b[i] }))
}

/// gaussian mutation: with probability `rate` per component add N(0, sigma) noise,
/// then clamp that component to [low, high]. untouched components keep their value.
pub fn gaussian_mutation<R: Rng + ?Sized>(
    rng: &mut R,
    thresholds: &ThresholdVector,
    rate: f64,
    noise: &Normal<f64>,
    low: f64,
    high: f64,
) -> ThresholdVector {
    profiling::scope!("gaussian_mutation");
    let mut out = *thresholds;
    for (i, &t) in thresholds.as_array().iter().enumerate() {
        if rng.random::<f64>() < rate {
            out.set_clamped(i, t + noise.sample(rng), low, high);
        }
    }
    out
}

impl Engine {
    /// tournament x2 -> crossover -> mutation. a child identical to one of its
    /// parents inherits that parent's cost so it is not scored again.
    pub(super) fn breed_child(&mut self) -> Individual {
        profiling::scope!("breed_child");
        let p1 = self.tournament();
        let p2 = self.tournament();

        let child = uniform_crossover(
            &mut self.rng,
            &self.population[p1].thresholds,
            &self.population[p2].thresholds,
        );
        let child = gaussian_mutation(
            &mut self.rng,
            &child,
            self.cfg.mutation_rate,
            &self.noise,
            self.cfg.low,
            self.cfg.high,
        );

        let cost = [p1, p2]
            .into_iter()
            .find(|&p| self.population[p].thresholds == child)
            .and_then(|p| self.population[p].cost);
        Individual { thresholds: child, cost }
    }
}
