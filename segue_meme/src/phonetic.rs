// Soundalike reduction for fuzzy meme comparison.
//
// Reduces a meme to a Soundex-style key so that authors' spelling variants
// ("GROOVE" / "GRUV", "COLOUR" / "COLOR") score as affinity in isometry.
// Modifiers and a leading numeric prefix are kept verbatim around the key, so
// `!LEMONS` never reduces to the same key as `LEMONS` and `2STEP` stays apart
// from `4STEP`.
//
// Key layout: [leading `!`/`$`][leading digits][letter + 3 digits][trailing `!`]

/// Consonant class of an uppercase ASCII letter. `Some(0)` marks a vowel
/// (separates runs), `None` marks H/W (transparent).
fn sound_class(c: char) -> Option<u8> {
    match c {
        'B' | 'F' | 'P' | 'V' => Some(1),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some(2),
        'D' | 'T' => Some(3),
        'L' => Some(4),
        'M' | 'N' => Some(5),
        'R' => Some(6),
        'H' | 'W' => None,
        _ => Some(0),
    }
}

/// Soundex key of the letters in `word`; empty if it has no letters.
pub fn soundex(word: &str) -> String {
    let mut letters = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase());
    let Some(first) = letters.next() else {
        return String::new();
    };

    let mut key = String::with_capacity(4);
    key.push(first);
    let mut previous = sound_class(first);
    for c in letters {
        if key.len() == 4 {
            break;
        }
        let class = sound_class(c);
        match class {
            None => continue,
            Some(0) => {}
            Some(digit) if class != previous => key.push(char::from(b'0' + digit)),
            Some(_) => {}
        }
        previous = class;
    }
    while key.len() < 4 {
        key.push('0');
    }
    key
}

/// Reduce a normalized meme to its soundalike key, preserving modifiers.
pub fn reduce(meme: &str) -> String {
    let mut rest = meme;
    let mut head = String::new();
    while let Some(c) = rest.chars().next().filter(|c| *c == '!' || *c == '$') {
        head.push(c);
        rest = &rest[1..];
    }
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    head.push_str(&rest[..digits]);
    rest = &rest[digits..];

    let (body, tail) = match rest.strip_suffix('!') {
        Some(body) => (body, "!"),
        None => (rest, ""),
    };
    let key = soundex(body);
    if key.is_empty() {
        return String::new();
    }
    format!("{head}{key}{tail}")
}
