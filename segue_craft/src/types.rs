// Identifiers and small enums shared across the craft crate.
//
// Record ids are UUID v4 values minted from the caller's `CraftRng`, so a
// seeded run reproduces ids as well as choices. Segments use a compact
// integer id since they are addressed by position in a chain.
//
// **Critical constraint: determinism.** Never mint ids from OS entropy or an
// external UUID library; always thread the run's `CraftRng` through.

use segue_prng::CraftRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Record ids: deterministic UUID v4
// ---------------------------------------------------------------------------

/// A UUID v4 drawn from the craft PRNG.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegueUuid([u8; 16]);

impl SegueUuid {
    pub fn new_v4(rng: &mut CraftRng) -> Self {
        let mut bytes = rng.next_128_bits();
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    /// Parse the 8-4-4-4-12 hex form.
    pub fn parse(s: &str) -> Option<Self> {
        let hex: Vec<u8> = s.bytes().filter(|b| *b != b'-').collect();
        if hex.len() != 32 || !hex.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, pair) in hex.chunks(2).enumerate() {
            let text = std::str::from_utf8(pair).ok()?;
            bytes[i] = u8::from_str_radix(text, 16).ok()?;
        }
        Some(Self(bytes))
    }
}

// Serialized as the hex string so ids can key JSON maps.
impl Serialize for SegueUuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SegueUuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SegueUuid::parse(&s).ok_or_else(|| serde::de::Error::custom("invalid UUID format"))
    }
}

impl fmt::Debug for SegueUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegueUuid({self})")
    }
}

impl fmt::Display for SegueUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub SegueUuid);

        impl $name {
            pub fn new(rng: &mut CraftRng) -> Self {
                Self(SegueUuid::new_v4(rng))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

record_id!(/// Authored program (macro, main, rhythm or detail).
ProgramId);
record_id!(/// Sequence owned by a program.
SequenceId);
record_id!(/// Binding of a sequence into a program chapter at an offset.
BindingId);
record_id!(/// Chord placed in a program sequence.
ChordId);
record_id!(/// Voicing of a program sequence chord.
VoicingId);
record_id!(/// Meme attached to a program or a sequence binding.
ContentMemeId);
record_id!(/// A generated chain of segments.
ChainId);
record_id!(/// Any record owned by a segment (choice, meme, chord, voicing, message).
SegmentChildId);

/// Segments are addressed by a compact integer id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment[{}]", self.0)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Program layer. Only Macro and Main are chosen by macro/main craft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgramType {
    Macro,
    Main,
    Rhythm,
    Detail,
}

/// Publication state of authored content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramState {
    #[default]
    Draft,
    Published,
}

/// How a segment relates to the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentType {
    /// First segment of a chain.
    Initial,
    /// Same main program continues at its next offset.
    Continue,
    /// New main program, same macro program advanced one chapter.
    NextMain,
    /// New macro program, which implies a new main program.
    NextMacro,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentState {
    #[default]
    Planned,
    Crafting,
    Crafted,
    Failed,
}

/// Instrument voice a chord voicing is written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoiceType {
    Bass,
    Pad,
    Stab,
    Sticky,
    Stripe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Debug,
    Info,
    Warning,
    Error,
}
