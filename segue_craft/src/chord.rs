// Canonical chord and key names.
//
// Authored content spells the same chord many ways ("Bb min7", "A#m7",
// "a# minor 7"). Segments carry one spelling so downstream voicing and
// comparison work on plain string equality:
//
// - root letter uppercased, accidentals as `#`, flats respelled as the
//   enharmonic sharp (`Bb` -> `A#`, `Cb` -> `B`)
// - whitespace dropped
// - quality words folded: `minor`/`min`/`-` -> `m`, `major`/`maj` dropped
//   unless a seventh follows (`maj7`), `M7` -> `maj7`
// - a slash bass is canonicalized like a root
// - empty, `NC`, `N.C.` and `X` mean no chord and become `NC`
//
// Keys use the same rules, so "C minor" becomes "Cm" and "Eb major" "D#".

pub const NO_CHORD: &str = "NC";

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Split a leading note name off `text`, returning its canonical spelling
/// and the rest.
fn split_root(text: &str) -> Option<(&'static str, &str)> {
    let mut chars = text.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let natural: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut rest = chars.as_str();
    let mut pitch = natural;
    if let Some(after) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('♯')) {
        pitch += 1;
        rest = after;
    } else if let Some(after) = rest.strip_prefix('♭') {
        pitch -= 1;
        rest = after;
    } else if let Some(after) = rest.strip_prefix('b') {
        pitch -= 1;
        rest = after;
    }
    Some((SHARP_NAMES[pitch.rem_euclid(12) as usize], rest))
}

fn canonical_quality(quality: &str) -> String {
    let lower = quality.to_ascii_lowercase();
    if let Some(rest) = quality.strip_prefix("M7") {
        return format!("maj7{rest}");
    }
    for word in ["minor", "min"] {
        if lower.starts_with(word) {
            return format!("m{}", &quality[word.len()..]);
        }
    }
    if let Some(rest) = quality.strip_prefix('-') {
        return format!("m{rest}");
    }
    for word in ["major", "maj"] {
        if lower.starts_with(word) {
            let rest = &quality[word.len()..];
            return if rest.starts_with('7') {
                format!("maj{rest}")
            } else {
                rest.to_string()
            };
        }
    }
    quality.to_string()
}

/// Canonical spelling of a chord name. Names without a recognizable root
/// are returned with whitespace removed.
pub fn canonical_chord_name(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || matches!(compact.to_ascii_uppercase().as_str(), "NC" | "N.C." | "X") {
        return NO_CHORD.to_string();
    }
    let Some((root, rest)) = split_root(&compact) else {
        return compact;
    };
    let (quality, bass) = match rest.split_once('/') {
        Some((quality, bass)) => (quality, Some(bass)),
        None => (rest, None),
    };
    let mut name = format!("{root}{}", canonical_quality(quality));
    if let Some(bass) = bass {
        name.push('/');
        match split_root(bass) {
            Some((bass_root, bass_rest)) => {
                name.push_str(bass_root);
                name.push_str(bass_rest);
            }
            None => name.push_str(bass),
        }
    }
    name
}

/// Canonical spelling of a key. An empty key stays empty.
pub fn canonical_key(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    canonical_chord_name(raw)
}
