// What came before the segment being crafted.
//
// Loaded once at the start of craft from the segment store: the previous
// segment of the chain and its macro and main choices. Craft reads these to
// decide whether programs continue, which offsets come next, and what meme
// context biases the next macro draw.
//
// The offset helpers resolve a choice's position inside its program through
// the content repository, since a choice records its binding rather than
// the offset itself.

use crate::content::ContentRepository;
use crate::segment::{Segment, SegmentChoice};
use crate::store::SegmentStore;
use crate::types::{ProgramId, ProgramType};
use segue_meme::{MemeIsometry, MemeTaxonomy, constellation_of};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Retrospective {
    segment: Segment,
    previous_segment: Option<Segment>,
    previous_macro_choice: Option<SegmentChoice>,
    previous_main_choice: Option<SegmentChoice>,
}

impl Retrospective {
    pub fn load<S: SegmentStore + ?Sized>(store: &S, segment: &Segment) -> Self {
        Self {
            segment: segment.clone(),
            previous_segment: store.previous_segment(segment),
            previous_macro_choice: store.previous_choice_of_type(segment, ProgramType::Macro),
            previous_main_choice: store.previous_choice_of_type(segment, ProgramType::Main),
        }
    }

    pub fn previous_segment(&self) -> Option<&Segment> {
        self.previous_segment.as_ref()
    }

    pub fn previous_macro_choice(&self) -> Option<&SegmentChoice> {
        self.previous_macro_choice.as_ref()
    }

    pub fn previous_main_choice(&self) -> Option<&SegmentChoice> {
        self.previous_main_choice.as_ref()
    }

    /// Meme context for choosing the next macro program: the previous macro
    /// program's memes plus those of the chapter after the one it played.
    /// Empty when there is no previous macro choice.
    pub fn next_macro_isometry<C: ContentRepository + ?Sized>(
        &self,
        content: &C,
        taxonomy: &MemeTaxonomy,
    ) -> MemeIsometry {
        let Some(choice) = &self.previous_macro_choice else {
            return MemeIsometry::none();
        };
        let Some(offset) = offset_of_choice(content, choice) else {
            return MemeIsometry::none();
        };
        let mut memes = content.memes_of_program(choice.program_id);
        for binding in content.bindings_at_nearest_offset(choice.program_id, offset.saturating_add(1)) {
            memes.extend(content.memes_of_binding(binding.id));
        }
        MemeIsometry::of(taxonomy, memes)
    }

    /// Constellations of earlier segments that played `main_program`, each
    /// mapped to the choices made in those segments.
    pub fn meme_constellation_choices<S: SegmentStore + ?Sized>(
        &self,
        store: &S,
        main_program: ProgramId,
    ) -> BTreeMap<String, Vec<SegmentChoice>> {
        let mut found: BTreeMap<String, Vec<SegmentChoice>> = BTreeMap::new();
        for segment in store.segments_with_same_main_program(&self.segment, main_program) {
            let memes = store.memes_of_segment(segment.id);
            let constellation = constellation_of(memes.iter().map(|m| m.name.as_str()));
            found
                .entry(constellation)
                .or_default()
                .extend(store.choices_of_segment(segment.id));
        }
        found
    }
}

// ---------------------------------------------------------------------------
// Offsets of choices
// ---------------------------------------------------------------------------

/// Offset of the binding a choice played, if it recorded one that exists.
pub fn offset_of_choice<C: ContentRepository + ?Sized>(content: &C, choice: &SegmentChoice) -> Option<i32> {
    let binding = content.binding(choice.program_sequence_binding_id?)?;
    Some(binding.offset)
}

/// Smallest available offset after the one the choice played, wrapping to 0
/// past the end of the program.
pub fn next_offset<C: ContentRepository + ?Sized>(content: &C, choice: &SegmentChoice) -> i32 {
    let Some(current) = offset_of_choice(content, choice) else {
        return 0;
    };
    content
        .available_sequence_binding_offsets(choice.program_id)
        .into_iter()
        .find(|offset| *offset > current)
        .unwrap_or(0)
}

/// How many available offsets lie after the one the choice played.
pub fn remaining_offsets<C: ContentRepository + ?Sized>(content: &C, choice: &SegmentChoice) -> usize {
    let Some(current) = offset_of_choice(content, choice) else {
        return 0;
    };
    content
        .available_sequence_binding_offsets(choice.program_id)
        .into_iter()
        .filter(|offset| *offset > current)
        .count()
}

/// The program's second available offset, or its first if it has only one.
pub fn second_offset<C: ContentRepository + ?Sized>(content: &C, program: ProgramId) -> i32 {
    let offsets = content.available_sequence_binding_offsets(program);
    offsets
        .get(1)
        .or_else(|| offsets.first())
        .copied()
        .unwrap_or(0)
}
