// Craft configuration.
//
// Everything the engine treats as tunable lives in `CraftConfig`: the meme
// taxonomy, the auto-crescendo intensity curve, and the length bounds used
// by segment planning and content validation. Loaded from JSON; every field
// has a default, so a partial (or empty) JSON object is a valid config.
//
// The taxonomy accepts either the compact string form
// `COLOR[BLUE,GREEN,RED];SEASON[FALL,SPRING]` or a list of
// `{ "name": ..., "memes": [...] }` objects. A malformed string yields an
// empty taxonomy rather than a load error.
//
// See also: `craft.rs` for where intensity is remapped, `chain.rs` for the
// main-program length bound.

use segue_meme::MemeTaxonomy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MEME_TAXONOMY: &str = "COLOR[BLUE,GREEN,RED];SEASON[FALL,SPRING,SUMMER,WINTER]";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftConfig {
    pub meme_taxonomy: MemeTaxonomy,
    /// Remap segment intensity along main-program progress.
    pub intensity_auto_crescendo_enabled: bool,
    pub intensity_auto_crescendo_minimum: f64,
    pub intensity_auto_crescendo_maximum: f64,
    /// Beats of one main program after which the chain moves on, and the
    /// normalizer for auto-crescendo progress.
    pub main_program_length_max_delta: u32,
    /// Longest main sequence, in beats, that craft accepts.
    pub sequence_length_max_beats: u32,
}

impl Default for CraftConfig {
    fn default() -> Self {
        Self {
            meme_taxonomy: MemeTaxonomy::parse(DEFAULT_MEME_TAXONOMY),
            intensity_auto_crescendo_enabled: true,
            intensity_auto_crescendo_minimum: 0.2,
            intensity_auto_crescendo_maximum: 0.8,
            main_program_length_max_delta: 280,
            sequence_length_max_beats: 1024,
        }
    }
}

impl CraftConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&data)?)
    }

    /// Auto-crescendo intensity for a segment at `delta` beats into its main
    /// program, floored to two decimals. `base` scales the ramp. The ramp is
    /// not capped: a main program held past the max delta keeps rising.
    pub fn crescendo_intensity(&self, delta: u32, base: f64) -> f64 {
        let min = self.intensity_auto_crescendo_minimum;
        let max = self.intensity_auto_crescendo_maximum;
        let position = if self.main_program_length_max_delta == 0 {
            1.0
        } else {
            delta as f64 / self.main_program_length_max_delta as f64
        };
        let value = min + (max - min) * position * base;
        (value * 100.0).floor() / 100.0
    }
}
