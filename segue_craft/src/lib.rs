// Segue macro/main craft engine.
//
// Generatively composes a continuous timeline one segment at a time: for
// each segment it picks which authored macro program (the long-range arc of
// chapters) and main program (the concrete chords) play next, honoring meme
// compatibility rules, continuity with the previous segment, and a phased
// weighted lottery that prefers well-fitting content without becoming fully
// deterministic.
//
// Architecture:
// - types.rs: record ids (deterministic UUIDs) and shared enums
// - content.rs: authored programs/sequences/bindings/chords, the read-only
//   `ContentRepository` seam, and the in-memory `ContentLibrary`
// - segment.rs: segment records and the `SegmentEntity` union of children
// - store.rs: the `SegmentStore` seam and the in-memory `SegmentLedger`
// - bag.rs: the phased weighted lottery (`SelectionBag`)
// - time.rs: beat-to-time integral under a linear tempo ramp
// - chord.rs: canonical chord and key spellings
// - config.rs: `CraftConfig` (taxonomy, auto-crescendo, length bounds)
// - error.rs: `CraftError`, the one fatal error type
// - retrospective.rs: previous-segment view and choice offset rules
// - craft.rs: `MacroMainCraft`, the decision engine
// - chain.rs: deciding the next segment's type and planning it
//
// Meme rules live in the `segue_meme` crate and randomness in `segue_prng`.
//
// The engine is synchronous and single-threaded. It reads content, mutates
// the one segment it was handed plus that segment's children in the store,
// and never touches global state.

pub mod bag;
pub mod chain;
pub mod chord;
pub mod config;
pub mod content;
pub mod craft;
pub mod error;
pub mod retrospective;
pub mod segment;
pub mod store;
pub mod time;
pub mod types;

pub use craft::MacroMainCraft;
pub use error::CraftError;
