// Macro/main craft: choose the programs that define one segment.
//
// One call to `MacroMainCraft::craft` takes a Planned segment, chooses its
// macro and main programs, resolves the sequence each plays, copies the main
// sequence's chords and voicings onto the segment, and derives the segment's
// key, tempo, total, duration, delta and intensity.
//
// Order of work:
//   1. Override memes, when given, are committed first and the main program
//      is chosen before the macro program; otherwise macro comes first.
//   2. Macro: an override program is used as-is. Continue and NextMain reuse
//      the previous macro program. Otherwise a phased bag draws one,
//      weighted by meme affinity with the previous macro's next chapter and
//      softly avoiding the previous macro program.
//   3. Main: Continue reuses the previous main program. Otherwise a phased
//      bag draws one, weighted by affinity with the memes committed so far,
//      and every candidate must be admissible against those memes.
//   4. Each chosen program plays the binding at its computed offset (or the
//      nearest available one); several bindings at that offset are drawn
//      uniformly. The forced choice put commits the program's and binding's
//      memes one by one, refusing any that conflict.
//   5. Chords positioned before the main sequence's end are copied with
//      canonical names, along with their voicings.
//
// See also: `retrospective.rs` for the previous-segment view and offset
// rules, `bag.rs` for the lottery, `time.rs` for duration, `chain.rs` for
// how the segment type is decided before craft runs.
//
// **Critical constraint: determinism.** Every draw and every minted id comes
// from the single `CraftRng` passed in. Candidate lists are iterated in
// repository order and bags are BTreeMap-backed, so a seed reproduces a
// chain exactly.

use crate::bag::SelectionBag;
use crate::chord::{canonical_chord_name, canonical_key};
use crate::config::CraftConfig;
use crate::content::{ContentRepository, Program, ProgramSequence, ProgramSequenceBinding};
use crate::error::CraftError;
use crate::retrospective::{Retrospective, next_offset, offset_of_choice, second_offset};
use crate::segment::{
    DeltaBound, Segment, SegmentChoice, SegmentChord, SegmentChordVoicing, SegmentEntity,
    SegmentMeme, SegmentMessage,
};
use crate::store::SegmentStore;
use crate::time::TimeComputer;
use crate::types::{
    MessageKind, ProgramId, ProgramState, ProgramType, SegmentChildId, SegmentState, SegmentType,
};
use segue_meme::{MemeIsometry, MemeStack, constellation_of, normalize};
use segue_prng::CraftRng;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// What one chosen program resolved to.
struct Resolved<'c> {
    program: &'c Program,
    sequence: &'c ProgramSequence,
}

pub struct MacroMainCraft<'a, C: ContentRepository + ?Sized, S: SegmentStore + ?Sized> {
    content: &'a C,
    store: &'a mut S,
    config: &'a CraftConfig,
    rng: &'a mut CraftRng,
    override_macro_program: Option<ProgramId>,
    override_memes: Option<Vec<String>>,
}

impl<'a, C: ContentRepository + ?Sized, S: SegmentStore + ?Sized> MacroMainCraft<'a, C, S> {
    pub fn new(content: &'a C, store: &'a mut S, config: &'a CraftConfig, rng: &'a mut CraftRng) -> Self {
        Self {
            content,
            store,
            config,
            rng,
            override_macro_program: None,
            override_memes: None,
        }
    }

    /// Play this macro program instead of drawing one, starting from its
    /// second chapter.
    pub fn with_override_macro_program(mut self, program: ProgramId) -> Self {
        self.override_macro_program = Some(program);
        self
    }

    /// Commit these memes before anything is chosen and choose main first.
    pub fn with_override_memes<I, T>(mut self, memes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let memes: BTreeSet<String> = memes
            .into_iter()
            .map(|m| normalize(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        self.override_memes = Some(memes.into_iter().collect());
        self
    }

    /// Craft `segment` in place and persist it. On error the segment is
    /// marked Failed; children already stored are left for the caller to
    /// clear.
    pub fn craft(mut self, segment: &mut Segment) -> Result<(), CraftError> {
        segment.state = SegmentState::Crafting;
        match self.craft_segment(segment) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(segment = %segment.id, "craft failed: {err}");
                segment.state = SegmentState::Failed;
                self.report(segment, MessageKind::Error, err.to_string());
                Err(err)
            }
        }
    }

    fn craft_segment(&mut self, segment: &mut Segment) -> Result<(), CraftError> {
        let retro = Retrospective::load(&*self.store, segment);
        info!(segment = %segment.id, kind = ?segment.kind, "crafting macro and main choices");

        let (macro_choice, main_choice) = match self.override_memes.clone() {
            Some(memes) => {
                for meme in memes {
                    self.commit_meme(segment, &meme, true)?;
                }
                let main = self.do_main_choice_work(segment, &retro)?;
                let macro_ = self.do_macro_choice_work(segment, &retro)?;
                (macro_, main)
            }
            None => {
                let macro_ = self.do_macro_choice_work(segment, &retro)?;
                let main = self.do_main_choice_work(segment, &retro)?;
                (macro_, main)
            }
        };

        let main_sequence = main_choice.sequence;
        if main_sequence.total > self.config.sequence_length_max_beats {
            return Err(CraftError::invalid(format!(
                "main sequence {} is {} beats, longer than the {} beat maximum",
                main_sequence.name, main_sequence.total, self.config.sequence_length_max_beats
            )));
        }

        self.copy_chords(segment, main_sequence)?;

        segment.key = self.compute_key(main_choice.program, main_sequence);
        segment.total = main_sequence.total;
        segment.tempo = main_choice.program.tempo;
        let start_tempo = retro
            .previous_segment()
            .map(|p| p.tempo)
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(segment.tempo);
        segment.duration_micros = TimeComputer::new(segment.total as f64, start_tempo, segment.tempo)?.duration_micros();
        segment.delta = match (segment.kind, retro.previous_segment()) {
            (SegmentType::Continue, Some(previous)) => previous.delta.saturating_add(previous.total),
            _ => 0,
        };
        segment.intensity = self.compute_intensity(segment.delta, &macro_choice, &main_choice);

        self.report_constellation(segment, &retro, main_choice.program.id);

        segment.state = SegmentState::Crafted;
        self.store
            .update_segment(segment)
            .map_err(|source| CraftError::Persistence {
                entity: "Segment".into(),
                source,
            })?;
        info!(
            segment = %segment.id,
            key = %segment.key,
            tempo = segment.tempo,
            total = segment.total,
            delta = segment.delta,
            intensity = segment.intensity,
            "crafted"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Choice work
    // -----------------------------------------------------------------------

    fn do_macro_choice_work(&mut self, segment: &Segment, retro: &Retrospective) -> Result<Resolved<'a>, CraftError> {
        let program = self.choose_macro_program(segment, retro)?;
        let offset = self.macro_offset(segment.kind, retro, program.id);
        let resolved = self.resolve_at_offset(program, offset)?;
        self.put_choice(segment, ProgramType::Macro, &resolved)?;
        Ok(Resolved {
            program,
            sequence: resolved.1,
        })
    }

    fn do_main_choice_work(&mut self, segment: &Segment, retro: &Retrospective) -> Result<Resolved<'a>, CraftError> {
        let program = self.choose_main_program(segment, retro)?;
        let offset = match (segment.kind, retro.previous_main_choice()) {
            (SegmentType::Continue, Some(previous)) => next_offset(self.content, previous),
            (SegmentType::Continue, None) => {
                return Err(CraftError::lookup_miss("previous main choice of a continuing segment"));
            }
            _ => 0,
        };
        let resolved = self.resolve_at_offset(program, offset)?;
        self.put_choice(segment, ProgramType::Main, &resolved)?;
        Ok(Resolved {
            program,
            sequence: resolved.1,
        })
    }

    fn choose_macro_program(&mut self, segment: &Segment, retro: &Retrospective) -> Result<&'a Program, CraftError> {
        let content = self.content;
        if let Some(id) = self.override_macro_program {
            return content
                .program(id)
                .ok_or_else(|| CraftError::lookup_miss(format!("override macro program {id}")));
        }

        if matches!(segment.kind, SegmentType::Continue | SegmentType::NextMain)
            && let Some(previous) = retro.previous_macro_choice()
        {
            return content
                .program(previous.program_id)
                .ok_or_else(|| CraftError::lookup_miss(format!("previous macro program {}", previous.program_id)));
        }

        let iso = match &self.override_memes {
            Some(memes) => MemeIsometry::of(&self.config.meme_taxonomy, memes),
            None => retro.next_macro_isometry(content, &self.config.meme_taxonomy),
        };
        let avoid = retro.previous_macro_choice().map(|c| c.program_id);

        let candidates = content.programs_of_type(ProgramType::Macro);
        let mut bag = SelectionBag::new();
        for program in candidates.iter().filter(|p| content.is_directly_bound(p.id)) {
            let score = iso.score(content.memes_at_beginning(program.id)) as f64;
            if avoid != Some(program.id) {
                bag.add(1, program.id, score);
            }
            bag.add(2, program.id, 1.0 + score);
        }
        for program in candidates.iter().filter(|p| p.state == ProgramState::Published) {
            let score = iso.score(content.memes_at_beginning(program.id)) as f64;
            if avoid != Some(program.id) {
                bag.add(3, program.id, score);
            }
            bag.add(4, program.id, 1.0 + score);
        }
        for program in &candidates {
            bag.add_unweighted(5, program.id);
        }

        self.draw_program(segment, "macro", &bag)
    }

    fn choose_main_program(&mut self, segment: &Segment, retro: &Retrospective) -> Result<&'a Program, CraftError> {
        let content = self.content;
        if segment.kind == SegmentType::Continue {
            let previous = retro
                .previous_main_choice()
                .ok_or_else(|| CraftError::lookup_miss("previous main choice of a continuing segment"))?;
            return content
                .program(previous.program_id)
                .ok_or_else(|| CraftError::lookup_miss(format!("previous main program {}", previous.program_id)));
        }

        let iso = MemeIsometry::of(&self.config.meme_taxonomy, self.committed_memes(segment));
        let candidates = content.programs_of_type(ProgramType::Main);
        let mut bag = SelectionBag::new();
        for program in &candidates {
            let memes = content.memes_at_beginning(program.id);
            if !iso.is_allowed(&memes) {
                debug!(program = %program.id, "main candidate refused by committed memes");
                continue;
            }
            let weight = 1.0 + iso.score(&memes) as f64;
            if content.is_directly_bound(program.id) {
                bag.add(1, program.id, weight);
            }
            if program.state == ProgramState::Published {
                bag.add(2, program.id, weight);
            }
            bag.add(3, program.id, weight);
        }

        self.draw_program(segment, "main", &bag)
    }

    fn draw_program(
        &mut self,
        segment: &Segment,
        layer: &str,
        bag: &SelectionBag<ProgramId>,
    ) -> Result<&'a Program, CraftError> {
        if bag.is_empty() {
            return Err(CraftError::exhausted(format!(
                "no {layer} program candidates for {}",
                segment.id
            )));
        }
        debug!(segment = %segment.id, %bag, "{layer} choice bag");
        self.report(segment, MessageKind::Debug, format!("{layer} choice bag: {bag}"));
        let content = self.content;
        let id = bag.pick(self.rng)?;
        let program = content
            .program(id)
            .ok_or_else(|| CraftError::lookup_miss(format!("{layer} program {id}")))?;
        info!(segment = %segment.id, program = %program.name, "chose {layer} program");
        Ok(program)
    }

    fn macro_offset(&self, kind: SegmentType, retro: &Retrospective, program: ProgramId) -> i32 {
        match kind {
            SegmentType::Initial | SegmentType::NextMacro => match self.override_macro_program {
                Some(_) => second_offset(self.content, program),
                None => 0,
            },
            SegmentType::Continue => retro
                .previous_macro_choice()
                .and_then(|c| offset_of_choice(self.content, c))
                .unwrap_or(0),
            SegmentType::NextMain => retro
                .previous_macro_choice()
                .map(|c| next_offset(self.content, c))
                .unwrap_or(0),
        }
    }

    /// Draw one of the program's bindings at `offset` (or the nearest
    /// available offset) and look up its sequence.
    fn resolve_at_offset(
        &mut self,
        program: &'a Program,
        offset: i32,
    ) -> Result<(&'a ProgramSequenceBinding, &'a ProgramSequence), CraftError> {
        let content = self.content;
        let bindings = content.bindings_at_nearest_offset(program.id, offset);
        if bindings.is_empty() {
            return Err(CraftError::invalid(format!(
                "program {} has no sequence bindings",
                program.name
            )));
        }
        let mut bag = SelectionBag::new();
        for binding in &bindings {
            bag.add_unweighted(1, binding.id);
        }
        let id = bag.pick(self.rng)?;
        let binding = content
            .binding(id)
            .ok_or_else(|| CraftError::lookup_miss(format!("sequence binding {id}")))?;
        let sequence = content
            .sequence_of_binding(binding)
            .ok_or_else(|| CraftError::lookup_miss(format!("sequence {}", binding.sequence_id)))?;
        Ok((binding, sequence))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Put a choice forced, then commit the memes of its program and binding.
    fn put_choice(
        &mut self,
        segment: &Segment,
        program_type: ProgramType,
        (binding, sequence): &(&'a ProgramSequenceBinding, &'a ProgramSequence),
    ) -> Result<(), CraftError> {
        let choice = SegmentChoice {
            id: SegmentChildId::new(self.rng),
            segment_id: segment.id,
            program_id: binding.program_id,
            program_type,
            program_sequence_id: Some(sequence.id),
            program_sequence_binding_id: Some(binding.id),
            delta_in: DeltaBound::Unlimited,
            delta_out: DeltaBound::Unlimited,
        };
        self.put(SegmentEntity::Choice(choice), true)?;

        let mut memes = self.content.memes_of_program(binding.program_id);
        memes.extend(self.content.memes_of_binding(binding.id));
        for meme in memes {
            self.commit_meme(segment, &meme, false)?;
        }
        Ok(())
    }

    /// Commit one meme. Unless forced, a meme already present or conflicting
    /// with the committed stack is refused with a warning.
    fn commit_meme(&mut self, segment: &Segment, meme: &str, forced: bool) -> Result<(), CraftError> {
        if !forced {
            let committed = self.committed_memes(segment);
            let stack = MemeStack::new(&self.config.meme_taxonomy, &committed);
            let refusal = if committed.contains(meme) {
                Some("already present")
            } else if stack.conflicts_with(meme) {
                Some("conflicts with committed memes")
            } else {
                None
            };
            if let Some(reason) = refusal {
                warn!(segment = %segment.id, meme, "refused meme: {reason}");
                self.report(segment, MessageKind::Warning, format!("refused meme {meme}: {reason}"));
                return Ok(());
            }
        }
        let entity = SegmentEntity::Meme(SegmentMeme {
            id: SegmentChildId::new(self.rng),
            segment_id: segment.id,
            name: meme.to_string(),
        });
        self.put(entity, forced)?;
        Ok(())
    }

    fn copy_chords(&mut self, segment: &Segment, sequence: &'a ProgramSequence) -> Result<(), CraftError> {
        let content = self.content;
        for chord in content.chords_of_sequence(sequence.id) {
            if chord.position >= sequence.total as f64 {
                continue;
            }
            let segment_chord = SegmentChord {
                id: SegmentChildId::new(self.rng),
                segment_id: segment.id,
                position: chord.position,
                name: canonical_chord_name(&chord.name),
            };
            let chord_id = segment_chord.id;
            if !self.put(SegmentEntity::Chord(segment_chord), false)? {
                continue;
            }
            for voicing in content.voicings_of_chord(chord.id) {
                let entity = SegmentEntity::ChordVoicing(SegmentChordVoicing {
                    id: SegmentChildId::new(self.rng),
                    segment_id: segment.id,
                    segment_chord_id: chord_id,
                    voice_type: voicing.voice_type,
                    notes: voicing.notes.clone(),
                });
                self.put(entity, false)?;
            }
        }
        Ok(())
    }

    /// Store an entity. A failed forced put is fatal; a failed unforced put
    /// is logged and reported as `Ok(false)`.
    fn put(&mut self, entity: SegmentEntity, forced: bool) -> Result<bool, CraftError> {
        let segment_id = entity.segment_id();
        let kind = entity.kind_name();
        match self.store.put(entity, forced) {
            Ok(()) => Ok(true),
            Err(source) if forced => Err(CraftError::Persistence {
                entity: kind.to_string(),
                source,
            }),
            Err(source) => {
                warn!(segment = %segment_id, "did not store {kind}: {source}");
                Ok(false)
            }
        }
    }

    /// Attach a report to the segment. Reporting never fails craft.
    fn report(&mut self, segment: &Segment, kind: MessageKind, body: String) {
        let message = SegmentEntity::Message(SegmentMessage {
            id: SegmentChildId::new(self.rng),
            segment_id: segment.id,
            kind,
            body,
        });
        if let Err(err) = self.store.put(message, false) {
            warn!(segment = %segment.id, "dropped segment message: {err}");
        }
    }

    fn committed_memes(&self, segment: &Segment) -> BTreeSet<String> {
        self.store
            .memes_of_segment(segment.id)
            .into_iter()
            .map(|m| m.name)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Derived attributes
    // -----------------------------------------------------------------------

    fn compute_key(&self, program: &Program, sequence: &ProgramSequence) -> String {
        match sequence.key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => canonical_key(key),
            None => canonical_key(&program.key),
        }
    }

    fn compute_intensity(&self, delta: u32, macro_choice: &Resolved<'_>, main_choice: &Resolved<'_>) -> f64 {
        let of = |r: &Resolved<'_>| r.sequence.intensity.unwrap_or(r.program.intensity);
        let base = (of(macro_choice) + of(main_choice)) / 2.0;
        if self.config.intensity_auto_crescendo_enabled {
            self.config.crescendo_intensity(delta, base)
        } else {
            base
        }
    }

    fn report_constellation(&mut self, segment: &Segment, retro: &Retrospective, main_program: ProgramId) {
        let constellation = constellation_of(self.committed_memes(segment));
        let history = retro.meme_constellation_choices(&*self.store, main_program);
        let body = if history.contains_key(&constellation) {
            format!("meme constellation {constellation} recurs under this main program")
        } else {
            format!("meme constellation {constellation} is new under this main program")
        };
        info!(segment = %segment.id, "{body}");
        self.report(segment, MessageKind::Info, body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentLibrary, MemeOwner};
    use crate::store::{SegmentLedger, StoreError};
    use crate::types::{ChainId, SegmentId, VoiceType};

    struct World {
        rng: CraftRng,
        lib: ContentLibrary,
        macro_program: ProgramId,
        main_program: ProgramId,
    }

    fn world() -> World {
        let mut rng = CraftRng::new(31);
        let mut lib = ContentLibrary::new();
        let macro_program = lib.add_program(&mut rng, ProgramType::Macro, ProgramState::Published, "Arc", "C", 120.0, 0.4);
        for offset in 0..3 {
            let seq = lib.add_sequence(&mut rng, macro_program, "chapter", 64);
            lib.bind(&mut rng, seq, offset);
        }
        let main_program = lib.add_program(&mut rng, ProgramType::Main, ProgramState::Published, "Tune", "A minor", 100.0, 0.6);
        let verse = lib.add_sequence(&mut rng, main_program, "verse", 16);
        lib.bind(&mut rng, verse, 0);
        let chorus = lib.add_sequence(&mut rng, main_program, "chorus", 16);
        lib.bind(&mut rng, chorus, 1);
        let am = lib.add_chord(&mut rng, verse, 0.0, "A min");
        lib.add_voicing(&mut rng, am, VoiceType::Pad, "A3, C4, E4");
        lib.add_chord(&mut rng, verse, 8.0, "Bb");
        lib.add_chord(&mut rng, verse, 16.0, "E");
        World {
            rng,
            lib,
            macro_program,
            main_program,
        }
    }

    fn initial(ledger: &mut SegmentLedger, rng: &mut CraftRng) -> Segment {
        let segment = Segment::planned(SegmentId(0), ChainId::new(rng), 0, SegmentType::Initial, 0);
        ledger.add_segment(segment.clone()).unwrap();
        segment
    }

    #[test]
    fn initial_segment_gets_both_choices_and_derived_fields() {
        let mut w = world();
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig::default();

        MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap();

        let choices = ledger.choices_of_segment(segment.id);
        assert_eq!(choices.len(), 2);
        assert!(choices.iter().any(|c| c.program_id == w.macro_program));
        assert!(choices.iter().any(|c| c.program_id == w.main_program));
        assert!(choices.iter().all(|c| c.delta_in == DeltaBound::Unlimited && c.delta_out == DeltaBound::Unlimited));

        assert_eq!(segment.state, SegmentState::Crafted);
        assert_eq!(segment.key, "Am");
        assert_eq!(segment.tempo, 100.0);
        assert_eq!(segment.total, 16);
        assert_eq!(segment.delta, 0);
        assert_eq!(segment.duration_micros, 9_600_000);
        assert_eq!(ledger.segment(segment.id), Some(segment));
    }

    #[test]
    fn chords_before_sequence_end_are_copied() {
        let mut w = world();
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig::default();
        MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap();

        let names: Vec<String> = ledger.chords_of_segment(segment.id).into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Am", "A#"]);
        let voicings = ledger.voicings_of_segment(segment.id);
        assert_eq!(voicings.len(), 1);
        assert_eq!(voicings[0].notes, "A3, C4, E4");
    }

    #[test]
    fn intensity_is_averaged_without_crescendo() {
        let mut w = world();
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig {
            intensity_auto_crescendo_enabled: false,
            ..CraftConfig::default()
        };
        MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap();
        assert!((segment.intensity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn choice_memes_are_committed() {
        let mut w = world();
        w.lib.add_meme(&mut w.rng, MemeOwner::Program(w.macro_program), "epic");
        w.lib.add_meme(&mut w.rng, MemeOwner::Program(w.main_program), "jazz");
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig::default();
        MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap();

        let memes: BTreeSet<String> = ledger.memes_of_segment(segment.id).into_iter().map(|m| m.name).collect();
        assert_eq!(memes, BTreeSet::from(["EPIC".to_string(), "JAZZ".to_string()]));
    }

    #[test]
    fn conflicting_binding_meme_is_refused_with_a_warning() {
        let mut w = world();
        // GREEN shares the COLOR category with the override meme RED.
        w.lib.add_meme(&mut w.rng, MemeOwner::Program(w.macro_program), "green");
        let verse_binding = w.lib.bindings_at_nearest_offset(w.main_program, 0)[0].id;
        w.lib.add_meme(&mut w.rng, MemeOwner::Binding(verse_binding), "night");
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig::default();
        MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .with_override_memes(["RED"])
            .craft(&mut segment)
            .unwrap();

        let memes: Vec<String> = ledger.memes_of_segment(segment.id).into_iter().map(|m| m.name).collect();
        assert_eq!(memes, ["RED", "NIGHT"]);
        let warnings = ledger
            .messages_of_segment(segment.id)
            .into_iter()
            .filter(|m| m.kind == MessageKind::Warning)
            .count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn forced_put_failure_is_fatal() {
        let mut w = world();
        let mut ledger = SegmentLedger::new();
        // Never added to the ledger, so the forced choice put fails.
        let mut segment = Segment::planned(SegmentId(5), ChainId::new(&mut w.rng), 0, SegmentType::Initial, 0);
        let config = CraftConfig::default();
        let err = MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap_err();
        match err {
            CraftError::Persistence { entity, source } => {
                assert_eq!(entity, "SegmentChoice");
                assert_eq!(source, StoreError::UnknownSegment(SegmentId(5)));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(segment.state, SegmentState::Failed);
    }

    #[test]
    fn overlong_main_sequence_is_invalid() {
        let mut w = world();
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut w.rng);
        let config = CraftConfig {
            sequence_length_max_beats: 8,
            ..CraftConfig::default()
        };
        let err = MacroMainCraft::new(&w.lib, &mut ledger, &config, &mut w.rng)
            .craft(&mut segment)
            .unwrap_err();
        assert!(matches!(err, CraftError::InvalidContent { .. }));
        let errors = ledger
            .messages_of_segment(segment.id)
            .into_iter()
            .filter(|m| m.kind == MessageKind::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn no_macro_programs_exhausts_the_bag() {
        let mut rng = CraftRng::new(32);
        let mut lib = ContentLibrary::new();
        let main = lib.add_program(&mut rng, ProgramType::Main, ProgramState::Published, "Tune", "C", 120.0, 0.5);
        let seq = lib.add_sequence(&mut rng, main, "verse", 16);
        lib.bind(&mut rng, seq, 0);
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut rng);
        let config = CraftConfig::default();
        let err = MacroMainCraft::new(&lib, &mut ledger, &config, &mut rng)
            .craft(&mut segment)
            .unwrap_err();
        assert!(matches!(err, CraftError::SelectionExhausted { .. }));
    }

    #[test]
    fn program_without_bindings_is_invalid() {
        let mut rng = CraftRng::new(33);
        let mut lib = ContentLibrary::new();
        lib.add_program(&mut rng, ProgramType::Macro, ProgramState::Published, "Empty", "C", 120.0, 0.5);
        let mut ledger = SegmentLedger::new();
        let mut segment = initial(&mut ledger, &mut rng);
        let config = CraftConfig::default();
        let err = MacroMainCraft::new(&lib, &mut ledger, &config, &mut rng)
            .craft(&mut segment)
            .unwrap_err();
        assert!(matches!(err, CraftError::InvalidContent { .. }));
    }
}
