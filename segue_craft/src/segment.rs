// Segment records and their children.
//
// A `Segment` is one unit of the generated timeline. Craft fills in its
// derived fields (key, tempo, intensity, total, duration, delta) and appends
// children: exactly one macro and one main `SegmentChoice`, the committed
// `SegmentMeme`s, the `SegmentChord`s copied from the main sequence with their
// `SegmentChordVoicing`s, and `SegmentMessage` reports.
//
// Children are a closed set of kinds, carried through the store as the
// `SegmentEntity` tagged union. Each child holds its parent segment id; the
// store owns all of them and drops them with the segment.

use crate::types::{
    BindingId, ChainId, MessageKind, ProgramId, ProgramType, SegmentChildId, SegmentId,
    SegmentState, SegmentType, SequenceId, VoiceType,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub chain_id: ChainId,
    pub kind: SegmentType,
    #[serde(default)]
    pub state: SegmentState,
    /// Position of the segment in its chain, starting at 0.
    pub offset: u64,
    /// Beats accumulated under the current main program before this segment.
    pub delta: u32,
    pub key: String,
    pub tempo: f64,
    pub intensity: f64,
    /// Length in beats.
    pub total: u32,
    pub duration_micros: u64,
    pub begin_at_chain_micros: u64,
}

impl Segment {
    /// A segment awaiting craft. Derived fields start zeroed.
    pub fn planned(id: SegmentId, chain_id: ChainId, offset: u64, kind: SegmentType, begin_at_chain_micros: u64) -> Self {
        Self {
            id,
            chain_id,
            kind,
            state: SegmentState::Planned,
            offset,
            delta: 0,
            key: String::new(),
            tempo: 0.0,
            intensity: 0.0,
            total: 0,
            duration_micros: 0,
            begin_at_chain_micros,
        }
    }

    pub fn end_at_chain_micros(&self) -> u64 {
        self.begin_at_chain_micros.saturating_add(self.duration_micros)
    }
}

// ---------------------------------------------------------------------------
// Choices
// ---------------------------------------------------------------------------

/// One end of a choice's retention window, in delta units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaBound {
    #[default]
    Unlimited,
    At(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentChoice {
    pub id: SegmentChildId,
    pub segment_id: SegmentId,
    pub program_id: ProgramId,
    pub program_type: ProgramType,
    pub program_sequence_id: Option<SequenceId>,
    pub program_sequence_binding_id: Option<BindingId>,
    pub delta_in: DeltaBound,
    pub delta_out: DeltaBound,
}

impl SegmentChoice {
    /// Whether the choice is retained at `delta` (bounds inclusive).
    pub fn is_active_at_delta(&self, delta: u32) -> bool {
        let after_in = match self.delta_in {
            DeltaBound::Unlimited => true,
            DeltaBound::At(bound) => bound <= delta,
        };
        let before_out = match self.delta_out {
            DeltaBound::Unlimited => true,
            DeltaBound::At(bound) => delta <= bound,
        };
        after_in && before_out
    }
}

// ---------------------------------------------------------------------------
// Other children
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeme {
    pub id: SegmentChildId,
    pub segment_id: SegmentId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentChord {
    pub id: SegmentChildId,
    pub segment_id: SegmentId,
    pub position: f64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentChordVoicing {
    pub id: SegmentChildId,
    pub segment_id: SegmentId,
    pub segment_chord_id: SegmentChildId,
    pub voice_type: VoiceType,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMessage {
    pub id: SegmentChildId,
    pub segment_id: SegmentId,
    pub kind: MessageKind,
    pub body: String,
}

/// Any record owned by a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SegmentEntity {
    Choice(SegmentChoice),
    Meme(SegmentMeme),
    Chord(SegmentChord),
    ChordVoicing(SegmentChordVoicing),
    Message(SegmentMessage),
}

impl SegmentEntity {
    pub fn segment_id(&self) -> SegmentId {
        match self {
            SegmentEntity::Choice(c) => c.segment_id,
            SegmentEntity::Meme(m) => m.segment_id,
            SegmentEntity::Chord(c) => c.segment_id,
            SegmentEntity::ChordVoicing(v) => v.segment_id,
            SegmentEntity::Message(m) => m.segment_id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SegmentEntity::Choice(_) => "SegmentChoice",
            SegmentEntity::Meme(_) => "SegmentMeme",
            SegmentEntity::Chord(_) => "SegmentChord",
            SegmentEntity::ChordVoicing(_) => "SegmentChordVoicing",
            SegmentEntity::Message(_) => "SegmentMessage",
        }
    }
}

impl fmt::Display for SegmentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentEntity::Choice(c) => write!(f, "{} {:?} {}", self.kind_name(), c.program_type, c.program_id),
            SegmentEntity::Meme(m) => write!(f, "{} {}", self.kind_name(), m.name),
            SegmentEntity::Chord(c) => write!(f, "{} {}@{}", self.kind_name(), c.name, c.position),
            SegmentEntity::ChordVoicing(v) => write!(f, "{} {:?}", self.kind_name(), v.voice_type),
            SegmentEntity::Message(m) => write!(f, "{} {:?}", self.kind_name(), m.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segue_prng::CraftRng;

    fn choice(delta_in: DeltaBound, delta_out: DeltaBound) -> SegmentChoice {
        let mut rng = CraftRng::new(1);
        SegmentChoice {
            id: SegmentChildId::new(&mut rng),
            segment_id: SegmentId(0),
            program_id: ProgramId::new(&mut rng),
            program_type: ProgramType::Main,
            program_sequence_id: None,
            program_sequence_binding_id: None,
            delta_in,
            delta_out,
        }
    }

    #[test]
    fn unlimited_choice_is_always_active() {
        let c = choice(DeltaBound::Unlimited, DeltaBound::Unlimited);
        assert!(c.is_active_at_delta(0));
        assert!(c.is_active_at_delta(u32::MAX));
    }

    #[test]
    fn delta_window_is_inclusive() {
        let c = choice(DeltaBound::At(16), DeltaBound::At(48));
        assert!(!c.is_active_at_delta(15));
        assert!(c.is_active_at_delta(16));
        assert!(c.is_active_at_delta(48));
        assert!(!c.is_active_at_delta(49));
    }

    #[test]
    fn half_open_windows() {
        assert!(choice(DeltaBound::At(8), DeltaBound::Unlimited).is_active_at_delta(1000));
        assert!(!choice(DeltaBound::Unlimited, DeltaBound::At(8)).is_active_at_delta(9));
    }

    #[test]
    fn entity_reports_owner_and_kind() {
        let mut rng = CraftRng::new(2);
        let meme = SegmentEntity::Meme(SegmentMeme {
            id: SegmentChildId::new(&mut rng),
            segment_id: SegmentId(4),
            name: "JAZZ".into(),
        });
        assert_eq!(meme.segment_id(), SegmentId(4));
        assert_eq!(meme.kind_name(), "SegmentMeme");
        assert_eq!(meme.to_string(), "SegmentMeme JAZZ");
    }

    #[test]
    fn planned_segment_ends_where_it_begins() {
        let mut rng = CraftRng::new(3);
        let seg = Segment::planned(SegmentId(1), ChainId::new(&mut rng), 1, SegmentType::Continue, 500);
        assert_eq!(seg.state, SegmentState::Planned);
        assert_eq!(seg.end_at_chain_micros(), 500);
    }
}
