// Meme isometry: affinity between a reference meme set and candidates.
//
// `score` counts candidate memes that match the reference either exactly or
// by soundalike key (see `phonetic.rs`). It feeds selection-bag weights and
// never filters on its own; admissibility goes through the embedded
// `MemeStack`.
//
// The constellation of a meme set is its memes deduplicated, sorted and
// joined with `_`. Two segments with the same unordered memes share a
// constellation, which is how repeated combinations are recognized across
// chain history.

use crate::normalize;
use crate::phonetic::reduce;
use crate::stack::MemeStack;
use crate::taxonomy::MemeTaxonomy;
use std::collections::BTreeSet;

pub const CONSTELLATION_DELIMITER: &str = "_";

/// Canonical, order- and duplicate-insensitive identity of a meme set.
pub fn constellation_of<I, S>(memes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = memes
        .into_iter()
        .map(|m| normalize(m.as_ref()))
        .filter(|m| !m.is_empty())
        .collect();
    unique
        .into_iter()
        .collect::<Vec<_>>()
        .join(CONSTELLATION_DELIMITER)
}

#[derive(Clone, Debug, Default)]
pub struct MemeIsometry {
    stack: MemeStack,
    reduced: BTreeSet<String>,
}

impl MemeIsometry {
    pub fn of<I, S>(taxonomy: &MemeTaxonomy, memes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stack = MemeStack::new(taxonomy, memes);
        let reduced = stack
            .memes()
            .iter()
            .map(|m| reduce(m))
            .filter(|key| !key.is_empty())
            .collect();
        Self { stack, reduced }
    }

    /// An isometry with no reference memes: scores zero, allows whatever a
    /// permissive stack allows.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        self.stack.memes()
    }

    /// Number of distinct candidates matching a reference meme exactly or
    /// by soundalike key.
    pub fn score<I, S>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates: BTreeSet<String> = candidates
            .into_iter()
            .map(|m| normalize(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        candidates
            .iter()
            .filter(|c| self.sources().contains(*c) || self.reduced.contains(&reduce(c)))
            .count()
    }

    pub fn is_allowed<I, S>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stack.is_allowed(candidates)
    }

    pub fn constellation(&self) -> String {
        self.stack.constellation()
    }
}
