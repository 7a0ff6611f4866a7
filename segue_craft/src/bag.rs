// Phased weighted lottery.
//
// Candidates are registered under an integer phase with a weight. A draw
// looks only at the lowest phase holding at least one candidate and picks
// within it proportionally to weight (cumulative-sum sampling over a
// BTreeMap, so iteration order and therefore results are stable for a given
// RNG state). Higher phases are fallbacks and never dilute a lower one.
//
// Registrations with a weight that is not finite and strictly positive are
// ignored, so a phase fed only zero-score candidates stays empty. Adding the
// same id twice to one phase accumulates its weight.
//
// **Critical constraint: determinism.** Draws consume exactly one
// `next_f64()` from the supplied `CraftRng`.

use crate::error::CraftError;
use segue_prng::CraftRng;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug)]
pub struct SelectionBag<T: Ord + Clone> {
    phases: BTreeMap<u32, BTreeMap<T, f64>>,
}

impl<T: Ord + Clone> Default for SelectionBag<T> {
    fn default() -> Self {
        Self {
            phases: BTreeMap::new(),
        }
    }
}

impl<T: Ord + Clone> SelectionBag<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, phase: u32, id: T, weight: f64) {
        if !(weight.is_finite() && weight > 0.0) {
            return;
        }
        *self.phases.entry(phase).or_default().entry(id).or_insert(0.0) += weight;
    }

    pub fn add_unweighted(&mut self, phase: u32, id: T) {
        self.add(phase, id, 1.0);
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Number of distinct candidates across all phases.
    pub fn len(&self) -> usize {
        self.phases.values().map(BTreeMap::len).sum()
    }

    /// Lowest phase holding a candidate.
    pub fn active_phase(&self) -> Option<u32> {
        self.phases.keys().next().copied()
    }

    pub fn pick(&self, rng: &mut CraftRng) -> Result<T, CraftError> {
        let Some(table) = self.phases.values().next() else {
            return Err(CraftError::exhausted("selection bag is empty"));
        };
        let total: f64 = table.values().sum();
        let target = rng.next_f64() * total;
        let mut cumulative = 0.0;
        for (id, weight) in table {
            cumulative += weight;
            if target < cumulative {
                return Ok(id.clone());
            }
        }
        // Rounding can leave target a hair above the final cumulative sum.
        table
            .keys()
            .next_back()
            .cloned()
            .ok_or_else(|| CraftError::exhausted("selection bag phase is empty"))
    }
}

impl<T: Ord + Clone + fmt::Display> fmt::Display for SelectionBag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phases.is_empty() {
            return f.write_str("(empty)");
        }
        for (n, (phase, table)) in self.phases.iter().enumerate() {
            if n > 0 {
                f.write_str(" ")?;
            }
            write!(f, "[{phase}:")?;
            for (id, weight) in table {
                write!(f, " {id}={weight}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_is_exhausted() {
        let bag: SelectionBag<u32> = SelectionBag::new();
        let err = bag.pick(&mut CraftRng::new(1)).unwrap_err();
        assert!(matches!(err, CraftError::SelectionExhausted { .. }));
    }

    #[test]
    fn only_populated_phase_is_drawn() {
        let mut bag = SelectionBag::new();
        bag.add(3, 30u32, 1.0);
        bag.add(3, 31, 2.0);
        let mut rng = CraftRng::new(2);
        for _ in 0..200 {
            let id = bag.pick(&mut rng).unwrap();
            assert!(id == 30 || id == 31);
        }
    }

    #[test]
    fn lowest_phase_always_wins() {
        let mut bag = SelectionBag::new();
        bag.add(1, 10u32, 0.01);
        bag.add(3, 30, 1000.0);
        let mut rng = CraftRng::new(3);
        for _ in 0..200 {
            assert_eq!(bag.pick(&mut rng).unwrap(), 10);
        }
    }

    #[test]
    fn non_positive_weights_are_ignored() {
        let mut bag = SelectionBag::new();
        bag.add(1, 10u32, 0.0);
        bag.add(1, 11, -2.0);
        bag.add(1, 12, f64::NAN);
        bag.add(2, 20, 1.0);
        assert_eq!(bag.active_phase(), Some(2));
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.pick(&mut CraftRng::new(4)).unwrap(), 20);
    }

    #[test]
    fn weights_bias_the_draw() {
        let mut bag = SelectionBag::new();
        bag.add(1, 'a', 9.0);
        bag.add(1, 'b', 1.0);
        let mut rng = CraftRng::new(5);
        let a_count = (0..2000).filter(|_| bag.pick(&mut rng).unwrap() == 'a').count();
        assert!(a_count > 1600, "a drawn {a_count} times");
        assert!(a_count < 2000, "b never drawn");
    }

    #[test]
    fn repeated_adds_accumulate() {
        let mut bag = SelectionBag::new();
        bag.add(1, 'a', 1.0);
        bag.add(1, 'a', 2.0);
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.to_string(), "[1: a=3]");
    }

    #[test]
    fn same_seed_same_draws() {
        let mut bag = SelectionBag::new();
        for id in 0..10u32 {
            bag.add(1, id, 1.0 + id as f64);
        }
        let draws = |seed| {
            let mut rng = CraftRng::new(seed);
            (0..20).map(|_| bag.pick(&mut rng).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(draws(77), draws(77));
    }
}
