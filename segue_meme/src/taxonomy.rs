// Meme taxonomy: named categories of mutually exclusive memes.
//
// A taxonomy is configured per template, e.g.
//
//   COLOR[BLUE,GREEN,RED];SEASON[FALL,SPRING,SUMMER,WINTER]
//
// and forbids any meme set holding two or more members of one category
// ("RED" with "BLUE"). It accepts either that string form or a structured list
// of `{ "name": ..., "memes": [...] }` objects when deserialized. A string
// that does not parse yields an empty taxonomy, which allows everything.
//
// Members are compared verbatim after normalization; modifiers are the
// matchers' business (see `matchers.rs`).

use crate::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One category: a name and its finite vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeCategory {
    pub name: String,
    pub memes: BTreeSet<String>,
}

impl MemeCategory {
    pub fn new<I, S>(name: &str, memes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: normalize(name),
            memes: memes
                .into_iter()
                .map(|m| normalize(m.as_ref()))
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// How many of this category's members appear in `memes`.
    pub fn count_present(&self, memes: &BTreeSet<String>) -> usize {
        self.memes.iter().filter(|m| memes.contains(*m)).count()
    }
}

/// Configured set of categories. Empty means permissive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaxonomySource", into = "TaxonomySource")]
pub struct MemeTaxonomy {
    categories: Vec<MemeCategory>,
}

/// Either accepted serialized shape of a taxonomy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum TaxonomySource {
    Text(String),
    List(Vec<MemeCategory>),
}

impl From<TaxonomySource> for MemeTaxonomy {
    fn from(source: TaxonomySource) -> Self {
        match source {
            TaxonomySource::Text(text) => MemeTaxonomy::parse(&text),
            TaxonomySource::List(categories) => MemeTaxonomy::from_categories(categories),
        }
    }
}

impl From<MemeTaxonomy> for TaxonomySource {
    fn from(taxonomy: MemeTaxonomy) -> Self {
        TaxonomySource::List(taxonomy.categories)
    }
}

impl MemeTaxonomy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from categories, normalizing names and members. Categories
    /// with an empty name are dropped.
    pub fn from_categories(categories: Vec<MemeCategory>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| MemeCategory::new(&c.name, c.memes))
                .filter(|c| !c.name.is_empty())
                .collect(),
        }
    }

    /// Parse `NAME[MEME,MEME];NAME[...]`. Anything malformed yields an empty
    /// taxonomy.
    pub fn parse(text: &str) -> Self {
        let mut categories = Vec::new();
        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            match parse_category(part) {
                Some(category) => categories.push(category),
                None => return Self::empty(),
            }
        }
        Self { categories }
    }

    pub fn categories(&self) -> &[MemeCategory] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Name of the first category listing `meme`, if any.
    pub fn category_of(&self, meme: &str) -> Option<&str> {
        let meme = normalize(meme);
        self.categories
            .iter()
            .find(|c| c.memes.contains(&meme))
            .map(|c| c.name.as_str())
    }

    /// False iff some category has two or more members present in `memes`.
    pub fn is_allowed<I, S>(&self, memes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let present: BTreeSet<String> = memes.into_iter().map(|m| normalize(m.as_ref())).collect();
        self.categories
            .iter()
            .all(|category| category.count_present(&present) < 2)
    }
}

fn parse_category(part: &str) -> Option<MemeCategory> {
    let open = part.find('[')?;
    let inner = part[open + 1..].strip_suffix(']')?;
    if inner.contains('[') || inner.contains(']') {
        return None;
    }
    let name = normalize(&part[..open]);
    if name.is_empty() {
        return None;
    }
    Some(MemeCategory::new(&name, inner.split(',')))
}

impl fmt::Display for MemeTaxonomy {
    /// Canonical string form; parses back to an equal taxonomy.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .categories
            .iter()
            .map(|c| {
                let members: Vec<&str> = c.memes.iter().map(String::as_str).collect();
                format!("{}[{}]", c.name, members.join(","))
            })
            .collect();
        write!(f, "{}", rendered.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS_AND_SEASONS: &str = "COLOR[BLUE,GREEN,RED];SEASON[FALL,SPRING,SUMMER,WINTER]";

    #[test]
    fn parses_string_form() {
        let taxonomy = MemeTaxonomy::parse(COLORS_AND_SEASONS);
        assert_eq!(taxonomy.categories().len(), 2);
        assert_eq!(taxonomy.category_of("red"), Some("COLOR"));
        assert_eq!(taxonomy.category_of("WINTER"), Some("SEASON"));
        assert_eq!(taxonomy.category_of("PURPLE"), None);
    }

    #[test]
    fn two_members_of_one_category_are_refused() {
        let taxonomy = MemeTaxonomy::parse(COLORS_AND_SEASONS);
        assert!(taxonomy.is_allowed(["RED", "WINTER"]));
        assert!(!taxonomy.is_allowed(["RED", "BLUE"]));
        assert!(!taxonomy.is_allowed(["RED", "WINTER", "SUMMER"]));
        assert!(taxonomy.is_allowed(["RED", "RED"]));
    }

    #[test]
    fn modifiers_are_not_members() {
        let taxonomy = MemeTaxonomy::parse(COLORS_AND_SEASONS);
        assert!(taxonomy.is_allowed(["RED", "$BLUE"]));
        assert!(taxonomy.is_allowed(["!RED", "BLUE"]));
    }

    #[test]
    fn malformed_string_is_permissive() {
        for text in ["COLOR[RED", "[RED,BLUE]", "COLOR RED,BLUE", "A[B[C]]"] {
            let taxonomy = MemeTaxonomy::parse(text);
            assert!(taxonomy.is_empty(), "expected empty taxonomy for {text:?}");
            assert!(taxonomy.is_allowed(["RED", "BLUE"]));
        }
        assert!(MemeTaxonomy::parse("").is_empty());
    }

    #[test]
    fn display_round_trips() {
        let taxonomy = MemeTaxonomy::parse(" season[winter, fall] ; color[red,blue] ");
        assert_eq!(taxonomy.to_string(), "SEASON[FALL,WINTER];COLOR[BLUE,RED]");
        assert_eq!(MemeTaxonomy::parse(&taxonomy.to_string()), taxonomy);
    }

    #[test]
    fn deserializes_from_string_or_list() {
        let from_text: MemeTaxonomy = serde_json::from_str(&format!("\"{COLORS_AND_SEASONS}\"")).unwrap();
        let from_list: MemeTaxonomy = serde_json::from_str(
            r#"[{"name":"color","memes":["red","green","blue"]},
                {"name":"season","memes":["fall","spring","summer","winter"]}]"#,
        )
        .unwrap();
        assert_eq!(from_text, from_list);

        let json = serde_json::to_string(&from_text).unwrap();
        let back: MemeTaxonomy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, from_text);
    }
}
