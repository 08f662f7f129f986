use rand::seq::index;
use rand::Rng;

use crate::dna::Individual;

use super::Engine;

/// draw `size` distinct members uniformly at random and return the index of the cheapest.
/// ties go to the member drawn first. unevaluated members lose to any evaluated one.
pub fn tournament_select<R: Rng + ?Sized>(rng: &mut R, population: &[Individual], size: usize) -> usize {
    profiling::scope!("tournament_select");
    let size = size.clamp(1, population.len().max(1));
    index::sample(rng, population.len(), size)
        .iter()
        .min_by_key(|&i| population[i].cost_or_max())
        .unwrap_or(0)
}

impl Engine {
    /// one parent pick from the current (fully evaluated) population
    #[inline]
    pub(super) fn tournament(&mut self) -> usize {
        tournament_select(&mut self.rng, &self.population, self.cfg.tournament_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::ThresholdVector;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn population(costs: &[u64]) -> Vec<Individual> {
        costs
            .iter()
            .enumerate()
            .map(|(i, &c)| Individual::evaluated(ThresholdVector::new([i as f64 / 10.0; 4]), c))
            .collect()
    }

    #[test]
    fn test_full_tournament_picks_global_minimum() {
        let pop = population(&[50, 20, 90, 5, 70, 5]);
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..200 {
            let idx = tournament_select(&mut rng, &pop, pop.len());
            assert_eq!(pop[idx].cost, Some(5));
        }
    }

    #[test]
    fn test_single_member_tournament_is_uniform_pick() {
        let pop = population(&[1, 2, 3, 4]);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut seen = [false; 4];
        for _ in 0..400 {
            seen[tournament_select(&mut rng, &pop, 1)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_never_picks_the_worst_with_two_or_more() {
        let pop = population(&[10, 20, 30, 40, 999]);
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..500 {
            let idx = tournament_select(&mut rng, &pop, 2);
            assert_ne!(pop[idx].cost, Some(999));
        }
    }
}
