// Authored content and the read-only repository craft draws from.
//
// Programs own sequences; sequences are bound into a program's ordered
// chapters by `ProgramSequenceBinding { offset }` (several bindings may share
// an offset, in which case one is drawn at random). Memes hang off programs
// and off individual bindings. Chords and their voicings hang off sequences.
//
// `ContentRepository` is the seam craft reads through. Its required methods
// are primitive lookups; the composite queries craft needs
// (`memes_at_beginning`, `available_sequence_binding_offsets`,
// `bindings_at_nearest_offset`) are provided on top of them.
//
// `ContentLibrary` is the in-memory repository used by tests and by the
// `craft_chain` binary. It serializes to JSON.

use crate::types::{
    BindingId, ChordId, ContentMemeId, ProgramId, ProgramState, ProgramType, SequenceId,
    VoiceType, VoicingId,
};
use segue_meme::normalize;
use segue_prng::CraftRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub kind: ProgramType,
    #[serde(default)]
    pub state: ProgramState,
    pub name: String,
    /// Musical key, e.g. "C minor". Sequences without a key defer to this.
    pub key: String,
    /// Beats per minute.
    pub tempo: f64,
    /// 0.0 to 1.0. Sequences without an intensity defer to this.
    pub intensity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequence {
    pub id: SequenceId,
    pub program_id: ProgramId,
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub intensity: Option<f64>,
    /// Length in beats.
    pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceBinding {
    pub id: BindingId,
    pub program_id: ProgramId,
    pub sequence_id: SequenceId,
    pub offset: i32,
}

/// A meme attached to a program or to one sequence binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentMeme {
    pub id: ContentMemeId,
    pub owner: MemeOwner,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemeOwner {
    Program(ProgramId),
    Binding(BindingId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceChord {
    pub id: ChordId,
    pub sequence_id: SequenceId,
    /// Beat position within the sequence.
    pub position: f64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceChordVoicing {
    pub id: VoicingId,
    pub chord_id: ChordId,
    pub voice_type: VoiceType,
    /// Comma-separated note names, e.g. "C3, E3, G3".
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Read-only lookup of authored content. Misses return `None` or empty.
pub trait ContentRepository {
    fn programs_of_type(&self, kind: ProgramType) -> Vec<&Program>;
    fn program(&self, id: ProgramId) -> Option<&Program>;
    fn sequence(&self, id: SequenceId) -> Option<&ProgramSequence>;
    fn binding(&self, id: BindingId) -> Option<&ProgramSequenceBinding>;
    fn bindings_of_program(&self, program: ProgramId) -> Vec<&ProgramSequenceBinding>;
    fn chords_of_sequence(&self, sequence: SequenceId) -> Vec<&ProgramSequenceChord>;
    fn voicings_of_chord(&self, chord: ChordId) -> Vec<&ProgramSequenceChordVoicing>;
    fn memes_of_program(&self, program: ProgramId) -> BTreeSet<String>;
    fn memes_of_binding(&self, binding: BindingId) -> BTreeSet<String>;
    /// Whether the program is bound directly to the running template.
    fn is_directly_bound(&self, program: ProgramId) -> bool;

    fn sequence_of_binding(&self, binding: &ProgramSequenceBinding) -> Option<&ProgramSequence> {
        self.sequence(binding.sequence_id)
    }

    /// Program memes plus the memes of its bindings at offset 0.
    fn memes_at_beginning(&self, program: ProgramId) -> BTreeSet<String> {
        let mut memes = self.memes_of_program(program);
        for binding in self.bindings_of_program(program) {
            if binding.offset == 0 {
                memes.extend(self.memes_of_binding(binding.id));
            }
        }
        memes
    }

    /// Distinct binding offsets of the program, ascending.
    fn available_sequence_binding_offsets(&self, program: ProgramId) -> Vec<i32> {
        let offsets: BTreeSet<i32> = self
            .bindings_of_program(program)
            .iter()
            .map(|b| b.offset)
            .collect();
        offsets.into_iter().collect()
    }

    /// Bindings at `offset`, or at the nearest available offset when none
    /// sit exactly there (the lower one on a tie). Empty only if the program
    /// has no bindings.
    fn bindings_at_nearest_offset(&self, program: ProgramId, offset: i32) -> Vec<&ProgramSequenceBinding> {
        let Some(nearest) = self
            .available_sequence_binding_offsets(program)
            .into_iter()
            .min_by_key(|candidate| ((*candidate as i64 - offset as i64).abs(), *candidate))
        else {
            return Vec::new();
        };
        self.bindings_of_program(program)
            .into_iter()
            .filter(|b| b.offset == nearest)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// In-memory library
// ---------------------------------------------------------------------------

/// In-memory content repository.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    pub programs: BTreeMap<ProgramId, Program>,
    pub sequences: BTreeMap<SequenceId, ProgramSequence>,
    pub bindings: BTreeMap<BindingId, ProgramSequenceBinding>,
    pub memes: Vec<ContentMeme>,
    pub chords: BTreeMap<ChordId, ProgramSequenceChord>,
    pub voicings: Vec<ProgramSequenceChordVoicing>,
    /// Programs bound directly to the template being crafted.
    #[serde(default)]
    pub bound_programs: BTreeSet<ProgramId>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&data)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_program(
        &mut self,
        rng: &mut CraftRng,
        kind: ProgramType,
        state: ProgramState,
        name: &str,
        key: &str,
        tempo: f64,
        intensity: f64,
    ) -> ProgramId {
        let id = ProgramId::new(rng);
        self.programs.insert(
            id,
            Program {
                id,
                kind,
                state,
                name: name.to_string(),
                key: key.to_string(),
                tempo,
                intensity,
            },
        );
        id
    }

    pub fn add_sequence(
        &mut self,
        rng: &mut CraftRng,
        program_id: ProgramId,
        name: &str,
        total: u32,
    ) -> SequenceId {
        let id = SequenceId::new(rng);
        self.sequences.insert(
            id,
            ProgramSequence {
                id,
                program_id,
                name: name.to_string(),
                key: None,
                intensity: None,
                total,
            },
        );
        id
    }

    /// Bind a sequence into its program at `offset`.
    pub fn bind(&mut self, rng: &mut CraftRng, sequence_id: SequenceId, offset: i32) -> Option<BindingId> {
        let program_id = self.sequences.get(&sequence_id)?.program_id;
        let id = BindingId::new(rng);
        self.bindings.insert(
            id,
            ProgramSequenceBinding {
                id,
                program_id,
                sequence_id,
                offset,
            },
        );
        Some(id)
    }

    pub fn add_meme(&mut self, rng: &mut CraftRng, owner: MemeOwner, name: &str) -> ContentMemeId {
        let id = ContentMemeId::new(rng);
        self.memes.push(ContentMeme {
            id,
            owner,
            name: name.to_string(),
        });
        id
    }

    pub fn add_chord(&mut self, rng: &mut CraftRng, sequence_id: SequenceId, position: f64, name: &str) -> ChordId {
        let id = ChordId::new(rng);
        self.chords.insert(
            id,
            ProgramSequenceChord {
                id,
                sequence_id,
                position,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_voicing(
        &mut self,
        rng: &mut CraftRng,
        chord_id: ChordId,
        voice_type: VoiceType,
        notes: &str,
    ) -> VoicingId {
        let id = VoicingId::new(rng);
        self.voicings.push(ProgramSequenceChordVoicing {
            id,
            chord_id,
            voice_type,
            notes: notes.to_string(),
        });
        id
    }

    pub fn bind_to_template(&mut self, program: ProgramId) {
        self.bound_programs.insert(program);
    }

    fn memes_owned_by(&self, owner: MemeOwner) -> BTreeSet<String> {
        self.memes
            .iter()
            .filter(|m| m.owner == owner)
            .map(|m| normalize(&m.name))
            .filter(|m| !m.is_empty())
            .collect()
    }
}

impl ContentRepository for ContentLibrary {
    fn programs_of_type(&self, kind: ProgramType) -> Vec<&Program> {
        self.programs.values().filter(|p| p.kind == kind).collect()
    }

    fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(&id)
    }

    fn sequence(&self, id: SequenceId) -> Option<&ProgramSequence> {
        self.sequences.get(&id)
    }

    fn binding(&self, id: BindingId) -> Option<&ProgramSequenceBinding> {
        self.bindings.get(&id)
    }

    fn bindings_of_program(&self, program: ProgramId) -> Vec<&ProgramSequenceBinding> {
        self.bindings
            .values()
            .filter(|b| b.program_id == program)
            .collect()
    }

    fn chords_of_sequence(&self, sequence: SequenceId) -> Vec<&ProgramSequenceChord> {
        let mut chords: Vec<&ProgramSequenceChord> = self
            .chords
            .values()
            .filter(|c| c.sequence_id == sequence)
            .collect();
        chords.sort_by(|a, b| a.position.total_cmp(&b.position));
        chords
    }

    fn voicings_of_chord(&self, chord: ChordId) -> Vec<&ProgramSequenceChordVoicing> {
        self.voicings.iter().filter(|v| v.chord_id == chord).collect()
    }

    fn memes_of_program(&self, program: ProgramId) -> BTreeSet<String> {
        self.memes_owned_by(MemeOwner::Program(program))
    }

    fn memes_of_binding(&self, binding: BindingId) -> BTreeSet<String> {
        self.memes_owned_by(MemeOwner::Binding(binding))
    }

    fn is_directly_bound(&self, program: ProgramId) -> bool {
        self.bound_programs.contains(&program)
    }
}
