// Modifier-driven exclusion rules between memes.
//
// Each rule parses a raw meme into a body plus the modifier it cares about,
// ignoring every other modifier:
//
//   Anti     `!X`   conflicts with plain `X` (exactly one side negated)
//   Numeric  `NX`   conflicts with `MX` when N != M (`2STEP` vs `4STEP`)
//   Strong   `X!`   requires a plain `X` somewhere among its peers
//   Unique   `$X`   conflicts with any other `$X`
//
// A meme set is admissible only if no rule reports a violation. The rules are
// independent; `stack.rs` combines them with the taxonomy.

/// Parsed view of a meme for the anti rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AntiMeme {
    pub body: String,
    pub is_anti: bool,
}

impl AntiMeme {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('!') {
            Some(body) if !body.is_empty() => Self {
                body: body.to_string(),
                is_anti: true,
            },
            _ => Self {
                body: raw.to_string(),
                is_anti: false,
            },
        }
    }

    /// True when the bodies match and exactly one of the pair is negated.
    pub fn violates(&self, other: &Self) -> bool {
        !self.body.is_empty() && self.body == other.body && self.is_anti != other.is_anti
    }

    pub fn is_allowed(&self, others: &[Self]) -> bool {
        !others.iter().any(|other| self.violates(other))
    }
}

/// Parsed view of a meme for the numeric rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericMeme {
    pub body: String,
    /// Leading integer, if the meme starts with digits followed by a body.
    pub prefix: Option<u64>,
}

impl NumericMeme {
    pub fn parse(raw: &str) -> Self {
        let digits = raw.chars().take_while(|c| c.is_ascii_digit()).count();
        let (number, body) = raw.split_at(digits);
        match (number.parse::<u64>(), body.is_empty()) {
            (Ok(prefix), false) => Self {
                body: body.to_string(),
                prefix: Some(prefix),
            },
            _ => Self {
                body: raw.to_string(),
                prefix: None,
            },
        }
    }

    /// True when both carry a numeric prefix over the same body but the
    /// prefixes differ.
    pub fn violates(&self, other: &Self) -> bool {
        match (self.prefix, other.prefix) {
            (Some(a), Some(b)) => self.body == other.body && a != b,
            _ => false,
        }
    }

    pub fn is_allowed(&self, others: &[Self]) -> bool {
        !others.iter().any(|other| self.violates(other))
    }
}

/// Parsed view of a meme for the strong rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrongMeme {
    pub body: String,
    pub is_strong: bool,
}

impl StrongMeme {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix('!') {
            Some(body) if !body.is_empty() => Self {
                body: body.to_string(),
                is_strong: true,
            },
            _ => Self {
                body: raw.to_string(),
                is_strong: false,
            },
        }
    }

    /// A strong meme is allowed only if some plain meme with its body is
    /// among `others`. Non-strong memes are always allowed.
    pub fn is_allowed(&self, others: &[Self]) -> bool {
        !self.is_strong
            || others
                .iter()
                .any(|other| !other.is_strong && other.body == self.body)
    }
}

/// Parsed view of a meme for the unique rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueMeme {
    pub body: String,
    pub is_unique: bool,
}

impl UniqueMeme {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('$') {
            Some(body) if !body.is_empty() => Self {
                body: body.to_string(),
                is_unique: true,
            },
            _ => Self {
                body: raw.to_string(),
                is_unique: false,
            },
        }
    }

    pub fn violates(&self, other: &Self) -> bool {
        self.is_unique && other.is_unique && self.body == other.body
    }

    pub fn is_allowed(&self, others: &[Self]) -> bool {
        !others.iter().any(|other| self.violates(other))
    }
}

/// True if the pair is excluded by the anti, numeric or unique rule.
///
/// The strong rule is not pairwise and is checked separately over a whole
/// set with [`strong_requirements_met`].
pub fn excludes(a: &str, b: &str) -> bool {
    AntiMeme::parse(a).violates(&AntiMeme::parse(b))
        || NumericMeme::parse(a).violates(&NumericMeme::parse(b))
        || UniqueMeme::parse(a).violates(&UniqueMeme::parse(b))
}

/// True if every strong meme in `memes` finds its plain body in `memes`.
pub fn strong_requirements_met<'a>(memes: impl IntoIterator<Item = &'a str>) -> bool {
    let parsed: Vec<StrongMeme> = memes.into_iter().map(StrongMeme::parse).collect();
    parsed.iter().all(|meme| meme.is_allowed(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_conflicts_only_when_exactly_one_is_negated() {
        let anti = AntiMeme::parse("!LEMONS");
        assert!(anti.violates(&AntiMeme::parse("LEMONS")));
        assert!(AntiMeme::parse("LEMONS").violates(&anti));
        assert!(!anti.violates(&AntiMeme::parse("!LEMONS")));
        assert!(!AntiMeme::parse("LEMONS").violates(&AntiMeme::parse("LEMONS")));
        assert!(!anti.violates(&AntiMeme::parse("LIMES")));
    }

    #[test]
    fn anti_bare_bang_is_not_a_negation() {
        let bang = AntiMeme::parse("!");
        assert!(!bang.is_anti);
        assert!(!bang.violates(&AntiMeme::parse("")));
    }

    #[test]
    fn numeric_conflicts_on_same_body_different_prefix() {
        let two = NumericMeme::parse("2STEP");
        assert_eq!(two.prefix, Some(2));
        assert_eq!(two.body, "STEP");
        assert!(two.violates(&NumericMeme::parse("4STEP")));
        assert!(!two.violates(&NumericMeme::parse("2STEP")));
        assert!(!two.violates(&NumericMeme::parse("2STEPUP")));
        assert!(!two.violates(&NumericMeme::parse("STEP")));
    }

    #[test]
    fn numeric_all_digits_has_no_prefix() {
        let n = NumericMeme::parse("1999");
        assert_eq!(n.prefix, None);
        assert!(!n.violates(&NumericMeme::parse("2000")));
    }

    #[test]
    fn strong_requires_plain_body() {
        let strong = StrongMeme::parse("DRUMS!");
        assert!(strong.is_strong);
        assert!(strong.is_allowed(&[StrongMeme::parse("DRUMS")]));
        assert!(!strong.is_allowed(&[StrongMeme::parse("BASS")]));
        assert!(!strong.is_allowed(&[StrongMeme::parse("DRUMS!")]));
        assert!(StrongMeme::parse("BASS").is_allowed(&[]));
    }

    #[test]
    fn unique_conflicts_with_same_unique_body_only() {
        let solo = UniqueMeme::parse("$SOLO");
        assert!(!solo.is_allowed(&[UniqueMeme::parse("$SOLO")]));
        assert!(solo.is_allowed(&[UniqueMeme::parse("$DUET")]));
        assert!(solo.is_allowed(&[UniqueMeme::parse("SOLO")]));
    }

    #[test]
    fn excludes_is_symmetric() {
        let pairs = [
            ("!LEMONS", "LEMONS"),
            ("2STEP", "4STEP"),
            ("$SOLO", "$SOLO"),
            ("RED", "BLUE"),
            ("2STEP", "2STEPUP"),
        ];
        for (a, b) in pairs {
            assert_eq!(excludes(a, b), excludes(b, a), "asymmetric for {a} / {b}");
        }
        assert!(excludes("!LEMONS", "LEMONS"));
        assert!(!excludes("RED", "BLUE"));
    }

    #[test]
    fn strong_requirements_over_a_set() {
        assert!(strong_requirements_met(["DRUMS!", "DRUMS", "BASS"]));
        assert!(!strong_requirements_met(["DRUMS!", "BASS"]));
        assert!(strong_requirements_met(std::iter::empty()));
    }
}
