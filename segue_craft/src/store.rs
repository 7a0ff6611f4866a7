// Segment store seam and its in-memory implementation.
//
// `SegmentStore` is the mutable side of craft: the segment under
// construction, its children, and read access to earlier segments of the
// chain. Reads return owned records so the engine never holds a borrow of the
// store across a write.
//
// `put(entity, forced)` appends a child. A non-forced put may be refused by
// the store (the ledger refuses a meme already present on the segment); the
// engine logs and reports a refused non-forced put and carries on, while a
// failed forced put aborts craft.
//
// `SegmentLedger` keeps segments keyed by id and each segment's children in
// per-kind vectors. Removing or resetting a segment drops its children with
// it.

use crate::segment::{
    Segment, SegmentChoice, SegmentChord, SegmentChordVoicing, SegmentEntity, SegmentMeme,
    SegmentMessage,
};
use crate::types::{ChainId, ProgramId, ProgramType, SegmentId, SegmentState};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no such segment: {0}")]
    UnknownSegment(SegmentId),
    #[error("segment already stored: {0}")]
    DuplicateSegment(SegmentId),
    #[error("meme {name} already committed to {segment}")]
    DuplicateMeme { segment: SegmentId, name: String },
}

pub trait SegmentStore {
    fn add_segment(&mut self, segment: Segment) -> Result<(), StoreError>;
    fn put(&mut self, entity: SegmentEntity, forced: bool) -> Result<(), StoreError>;
    fn update_segment(&mut self, segment: &Segment) -> Result<(), StoreError>;

    fn segment(&self, id: SegmentId) -> Option<Segment>;
    /// Segments of a chain, ordered by offset.
    fn segments_of_chain(&self, chain: ChainId) -> Vec<Segment>;
    fn choices_of_segment(&self, id: SegmentId) -> Vec<SegmentChoice>;
    fn memes_of_segment(&self, id: SegmentId) -> Vec<SegmentMeme>;
    fn chords_of_segment(&self, id: SegmentId) -> Vec<SegmentChord>;
    fn voicings_of_segment(&self, id: SegmentId) -> Vec<SegmentChordVoicing>;
    fn messages_of_segment(&self, id: SegmentId) -> Vec<SegmentMessage>;

    /// The segment directly before `segment` in its chain.
    fn previous_segment(&self, segment: &Segment) -> Option<Segment> {
        let offset = segment.offset.checked_sub(1)?;
        self.segments_of_chain(segment.chain_id)
            .into_iter()
            .find(|s| s.offset == offset)
    }

    /// The previous segment's choice of the given program type.
    fn previous_choice_of_type(&self, segment: &Segment, kind: ProgramType) -> Option<SegmentChoice> {
        let previous = self.previous_segment(segment)?;
        self.choices_of_segment(previous.id)
            .into_iter()
            .find(|c| c.program_type == kind)
    }

    /// Earlier segments of the chain whose main choice is `program`.
    fn segments_with_same_main_program(&self, segment: &Segment, program: ProgramId) -> Vec<Segment> {
        self.segments_of_chain(segment.chain_id)
            .into_iter()
            .filter(|s| s.offset < segment.offset)
            .filter(|s| {
                self.choices_of_segment(s.id)
                    .iter()
                    .any(|c| c.program_type == ProgramType::Main && c.program_id == program)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// In-memory ledger
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
struct SegmentChildren {
    choices: Vec<SegmentChoice>,
    memes: Vec<SegmentMeme>,
    chords: Vec<SegmentChord>,
    voicings: Vec<SegmentChordVoicing>,
    messages: Vec<SegmentMessage>,
}

#[derive(Clone, Debug, Default)]
pub struct SegmentLedger {
    segments: BTreeMap<SegmentId, Segment>,
    children: BTreeMap<SegmentId, SegmentChildren>,
}

impl SegmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a segment and everything it owns.
    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        self.children.remove(&id);
        self.segments.remove(&id)
    }

    /// Drop a segment's children and return it to Planned so it can be
    /// crafted again.
    pub fn reset_segment(&mut self, id: SegmentId) -> Result<(), StoreError> {
        let segment = self
            .segments
            .get_mut(&id)
            .ok_or(StoreError::UnknownSegment(id))?;
        segment.state = SegmentState::Planned;
        self.children.insert(id, SegmentChildren::default());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn children_of(&self, id: SegmentId) -> Option<&SegmentChildren> {
        self.children.get(&id)
    }
}

impl SegmentStore for SegmentLedger {
    fn add_segment(&mut self, segment: Segment) -> Result<(), StoreError> {
        if self.segments.contains_key(&segment.id) {
            return Err(StoreError::DuplicateSegment(segment.id));
        }
        self.children.insert(segment.id, SegmentChildren::default());
        self.segments.insert(segment.id, segment);
        Ok(())
    }

    fn put(&mut self, entity: SegmentEntity, forced: bool) -> Result<(), StoreError> {
        let id = entity.segment_id();
        let children = self
            .children
            .get_mut(&id)
            .ok_or(StoreError::UnknownSegment(id))?;
        match entity {
            SegmentEntity::Choice(c) => children.choices.push(c),
            SegmentEntity::Meme(m) => {
                if !forced && children.memes.iter().any(|existing| existing.name == m.name) {
                    return Err(StoreError::DuplicateMeme {
                        segment: id,
                        name: m.name,
                    });
                }
                children.memes.push(m);
            }
            SegmentEntity::Chord(c) => children.chords.push(c),
            SegmentEntity::ChordVoicing(v) => children.voicings.push(v),
            SegmentEntity::Message(m) => children.messages.push(m),
        }
        Ok(())
    }

    fn update_segment(&mut self, segment: &Segment) -> Result<(), StoreError> {
        let stored = self
            .segments
            .get_mut(&segment.id)
            .ok_or(StoreError::UnknownSegment(segment.id))?;
        *stored = segment.clone();
        Ok(())
    }

    fn segment(&self, id: SegmentId) -> Option<Segment> {
        self.segments.get(&id).cloned()
    }

    fn segments_of_chain(&self, chain: ChainId) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self
            .segments
            .values()
            .filter(|s| s.chain_id == chain)
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.offset);
        segments
    }

    fn choices_of_segment(&self, id: SegmentId) -> Vec<SegmentChoice> {
        self.children_of(id).map(|c| c.choices.clone()).unwrap_or_default()
    }

    fn memes_of_segment(&self, id: SegmentId) -> Vec<SegmentMeme> {
        self.children_of(id).map(|c| c.memes.clone()).unwrap_or_default()
    }

    fn chords_of_segment(&self, id: SegmentId) -> Vec<SegmentChord> {
        self.children_of(id).map(|c| c.chords.clone()).unwrap_or_default()
    }

    fn voicings_of_segment(&self, id: SegmentId) -> Vec<SegmentChordVoicing> {
        self.children_of(id).map(|c| c.voicings.clone()).unwrap_or_default()
    }

    fn messages_of_segment(&self, id: SegmentId) -> Vec<SegmentMessage> {
        self.children_of(id).map(|c| c.messages.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::DeltaBound;
    use crate::types::{SegmentChildId, SegmentType};
    use segue_prng::CraftRng;

    fn ledger_with_chain(rng: &mut CraftRng, count: u64) -> (SegmentLedger, ChainId) {
        let chain = ChainId::new(rng);
        let mut ledger = SegmentLedger::new();
        for offset in 0..count {
            let kind = if offset == 0 { SegmentType::Initial } else { SegmentType::Continue };
            ledger
                .add_segment(Segment::planned(SegmentId(offset), chain, offset, kind, 0))
                .unwrap();
        }
        (ledger, chain)
    }

    fn meme(rng: &mut CraftRng, segment: u64, name: &str) -> SegmentEntity {
        SegmentEntity::Meme(SegmentMeme {
            id: SegmentChildId::new(rng),
            segment_id: SegmentId(segment),
            name: name.into(),
        })
    }

    fn main_choice(rng: &mut CraftRng, segment: u64, program: ProgramId) -> SegmentEntity {
        SegmentEntity::Choice(SegmentChoice {
            id: SegmentChildId::new(rng),
            segment_id: SegmentId(segment),
            program_id: program,
            program_type: ProgramType::Main,
            program_sequence_id: None,
            program_sequence_binding_id: None,
            delta_in: DeltaBound::Unlimited,
            delta_out: DeltaBound::Unlimited,
        })
    }

    #[test]
    fn put_into_unknown_segment_fails() {
        let mut rng = CraftRng::new(1);
        let mut ledger = SegmentLedger::new();
        let err = ledger.put(meme(&mut rng, 9, "JAZZ"), true).unwrap_err();
        assert_eq!(err, StoreError::UnknownSegment(SegmentId(9)));
    }

    #[test]
    fn duplicate_meme_refused_unless_forced() {
        let mut rng = CraftRng::new(2);
        let (mut ledger, _) = ledger_with_chain(&mut rng, 1);
        ledger.put(meme(&mut rng, 0, "JAZZ"), false).unwrap();
        assert!(matches!(
            ledger.put(meme(&mut rng, 0, "JAZZ"), false),
            Err(StoreError::DuplicateMeme { .. })
        ));
        ledger.put(meme(&mut rng, 0, "JAZZ"), true).unwrap();
        assert_eq!(ledger.memes_of_segment(SegmentId(0)).len(), 2);
    }

    #[test]
    fn previous_segment_follows_chain_offset() {
        let mut rng = CraftRng::new(3);
        let (ledger, _) = ledger_with_chain(&mut rng, 3);
        let third = ledger.segment(SegmentId(2)).unwrap();
        assert_eq!(ledger.previous_segment(&third).map(|s| s.id), Some(SegmentId(1)));
        let first = ledger.segment(SegmentId(0)).unwrap();
        assert!(ledger.previous_segment(&first).is_none());
    }

    #[test]
    fn previous_choice_and_same_main_history() {
        let mut rng = CraftRng::new(4);
        let (mut ledger, _) = ledger_with_chain(&mut rng, 4);
        let a = ProgramId::new(&mut rng);
        let b = ProgramId::new(&mut rng);
        ledger.put(main_choice(&mut rng, 0, a), true).unwrap();
        ledger.put(main_choice(&mut rng, 1, b), true).unwrap();
        ledger.put(main_choice(&mut rng, 2, a), true).unwrap();

        let current = ledger.segment(SegmentId(3)).unwrap();
        let previous = ledger.previous_choice_of_type(&current, ProgramType::Main).unwrap();
        assert_eq!(previous.program_id, a);
        assert!(ledger.previous_choice_of_type(&current, ProgramType::Macro).is_none());

        let same: Vec<SegmentId> = ledger
            .segments_with_same_main_program(&current, a)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(same, vec![SegmentId(0), SegmentId(2)]);
    }

    #[test]
    fn reset_and_remove_drop_children() {
        let mut rng = CraftRng::new(5);
        let (mut ledger, _) = ledger_with_chain(&mut rng, 2);
        ledger.put(meme(&mut rng, 1, "JAZZ"), false).unwrap();
        ledger.reset_segment(SegmentId(1)).unwrap();
        assert!(ledger.memes_of_segment(SegmentId(1)).is_empty());

        ledger.put(meme(&mut rng, 1, "JAZZ"), false).unwrap();
        ledger.remove_segment(SegmentId(1));
        assert!(ledger.memes_of_segment(SegmentId(1)).is_empty());
        assert_eq!(ledger.len(), 1);
    }
}
