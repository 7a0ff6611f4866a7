// Meme stack: the memes already committed to a segment, plus the taxonomy.
//
// `is_allowed(candidates)` answers whether content carrying `candidates` may
// join what is already committed:
//
//   1. no anti/numeric/unique exclusion between any committed meme and any
//      candidate, nor between two candidates;
//   2. every strong meme in committed + candidates finds its plain body in
//      that union;
//   3. the taxonomy allows the union.
//
// Exclusions are checked pairwise across the two sides rather than on the
// merged set, since merging would collapse a committed `$SOLO` and a
// candidate `$SOLO` into one entry and hide the conflict.
//
// `conflicts_with(meme)` is the narrower check used when memes are committed
// one at a time: it skips the strong rule, which constrains content chosen
// together rather than individual memes.

use crate::isometry::constellation_of;
use crate::matchers::{excludes, strong_requirements_met};
use crate::normalize;
use crate::taxonomy::MemeTaxonomy;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemeStack {
    taxonomy: MemeTaxonomy,
    memes: BTreeSet<String>,
}

impl MemeStack {
    pub fn new<I, S>(taxonomy: &MemeTaxonomy, memes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            taxonomy: taxonomy.clone(),
            memes: normalized_set(memes),
        }
    }

    pub fn memes(&self) -> &BTreeSet<String> {
        &self.memes
    }

    pub fn taxonomy(&self) -> &MemeTaxonomy {
        &self.taxonomy
    }

    pub fn is_allowed<I, S>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = normalized_set(candidates);

        let crosses = self
            .memes
            .iter()
            .any(|committed| targets.iter().any(|target| excludes(committed, target)));
        if crosses || has_internal_exclusion(&targets) {
            return false;
        }

        let union: BTreeSet<&str> = self
            .memes
            .iter()
            .chain(targets.iter())
            .map(String::as_str)
            .collect();
        strong_requirements_met(union.iter().copied()) && self.taxonomy.is_allowed(union)
    }

    /// Whether the committed set is admissible on its own.
    pub fn is_valid(&self) -> bool {
        !has_internal_exclusion(&self.memes)
            && strong_requirements_met(self.memes.iter().map(String::as_str))
            && self.taxonomy.is_allowed(&self.memes)
    }

    /// True if committing `meme` alongside the stack would break an
    /// exclusion rule or the taxonomy.
    pub fn conflicts_with(&self, meme: &str) -> bool {
        let meme = normalize(meme);
        self.memes.iter().any(|committed| excludes(committed, &meme))
            || !self
                .taxonomy
                .is_allowed(self.memes.iter().map(String::as_str).chain([meme.as_str()]))
    }

    pub fn constellation(&self) -> String {
        constellation_of(&self.memes)
    }
}

fn normalized_set<I, S>(memes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    memes
        .into_iter()
        .map(|m| normalize(m.as_ref()))
        .filter(|m| !m.is_empty())
        .collect()
}

fn has_internal_exclusion(memes: &BTreeSet<String>) -> bool {
    memes
        .iter()
        .enumerate()
        .any(|(i, a)| memes.iter().skip(i + 1).any(|b| excludes(a, b)))
}
