// Segue meme constraint system.
//
// Memes are short uppercase tags attached to authored content ("PEACE",
// "!LEMONS", "2STEP", "$SOLO", "DRUMS!"). Craft uses them two ways: as hard
// admissibility rules deciding which content may sound together, and as a
// soft affinity score biasing the selection lottery toward content that
// shares vocabulary with what is already committed.
//
// Architecture:
// - matchers.rs: the four modifier-driven exclusion rules (anti, numeric,
//   strong, unique), each a pure predicate over parsed tags
// - taxonomy.rs: configured categories of mutually exclusive memes
// - stack.rs: a committed meme set plus taxonomy, answering "may content with
//   these memes be added now?"
// - isometry.rs: affinity scoring (exact and soundalike) and the canonical
//   constellation identity of a meme set
// - phonetic.rs: soundalike reduction used by isometry
//
// Modifiers are interpreted by the matchers only. The taxonomy compares
// normalized memes verbatim, so `$RED` is not a member of a category holding
// `RED`.

pub mod isometry;
pub mod matchers;
pub mod phonetic;
pub mod stack;
pub mod taxonomy;

pub use isometry::{CONSTELLATION_DELIMITER, MemeIsometry, constellation_of};
pub use stack::MemeStack;
pub use taxonomy::{MemeCategory, MemeTaxonomy};

/// Conform a raw tag to meme form: drop everything except ASCII letters,
/// digits, `!` and `$`, then uppercase.
///
/// ```
/// assert_eq!(segue_meme::normalize(" lemons! "), "LEMONS!");
/// assert_eq!(segue_meme::normalize("Deep-House"), "DEEPHOUSE");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '!' || *c == '$')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_modifiers() {
        assert_eq!(normalize("!lemons"), "!LEMONS");
        assert_eq!(normalize("$solo"), "$SOLO");
        assert_eq!(normalize("2 step"), "2STEP");
    }

    #[test]
    fn normalize_strips_punctuation_and_whitespace() {
        assert_eq!(normalize("  rock & roll  "), "ROCKROLL");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("---"), "");
    }
}
