// Segue craft chain: CLI entry point.
//
// Crafts consecutive segments of one chain against a content library and
// prints a one-line summary per segment. Without a library path a small
// built-in library is used.
//
// Usage:
//   cargo run -p segue_craft --bin craft_chain -- [library.json] [--segments N]
//     [--seed N] [--config craft_config.json]
//
// Logging follows RUST_LOG (default: info).

use segue_craft::MacroMainCraft;
use segue_craft::chain::plan_next_segment;
use segue_craft::config::CraftConfig;
use segue_craft::content::{ContentLibrary, ContentRepository, MemeOwner};
use segue_craft::store::{SegmentLedger, SegmentStore};
use segue_craft::types::{ChainId, ProgramState, ProgramType, SegmentId, VoiceType};
use segue_prng::CraftRng;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let library_path = args.get(1).filter(|s| !s.starts_with("--"));
    let segments: u64 = parse_flag(&args, "--segments").unwrap_or(8);
    let seed: u64 = parse_flag(&args, "--seed").unwrap_or(42);
    let config_path: Option<String> = parse_flag(&args, "--config");

    let mut rng = CraftRng::new(seed);
    let config = match config_path {
        Some(path) => CraftConfig::load(Path::new(&path))?,
        None => CraftConfig::default(),
    };
    let library = match library_path {
        Some(path) => ContentLibrary::load(Path::new(path))?,
        None => demo_library(&mut rng),
    };
    info!(
        programs = library.programs.len(),
        sequences = library.sequences.len(),
        taxonomy = %config.meme_taxonomy,
        seed,
        "content loaded"
    );

    let chain = ChainId::new(&mut rng);
    let mut ledger = SegmentLedger::new();
    for n in 0..segments {
        let mut segment = plan_next_segment(&library, &mut ledger, chain, SegmentId(n), &config)?;
        MacroMainCraft::new(&library, &mut ledger, &config, &mut rng).craft(&mut segment)?;

        let programs: Vec<String> = ledger
            .choices_of_segment(segment.id)
            .iter()
            .map(|c| {
                let name = library.program(c.program_id).map_or("?", |p| p.name.as_str());
                format!("{:?}={name}", c.program_type)
            })
            .collect();
        let chords: Vec<String> = ledger
            .chords_of_segment(segment.id)
            .into_iter()
            .map(|c| c.name)
            .collect();
        let memes: Vec<String> = ledger
            .memes_of_segment(segment.id)
            .into_iter()
            .map(|m| m.name)
            .collect();
        println!(
            "#{:<3} {:<9} key={:<4} tempo={:<5} total={:<3} delta={:<4} intensity={:.2} at={:.1}s {} [{}] memes={}",
            segment.offset,
            format!("{:?}", segment.kind),
            segment.key,
            segment.tempo,
            segment.total,
            segment.delta,
            segment.intensity,
            segment.begin_at_chain_micros as f64 / 1_000_000.0,
            programs.join(" "),
            chords.join(" "),
            memes.join(","),
        );
    }
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// A small library exercising every selection path: one directly-bound and
/// one published macro, a handful of main programs with memes, and a draft
/// program that only wins when nothing else is admissible.
fn demo_library(rng: &mut CraftRng) -> ContentLibrary {
    let mut lib = ContentLibrary::new();

    let dusk = lib.add_program(rng, ProgramType::Macro, ProgramState::Published, "Dusk Arc", "C minor", 96.0, 0.4);
    lib.bind_to_template(dusk);
    lib.add_meme(rng, MemeOwner::Program(dusk), "night");
    for (offset, meme) in [(0, "calm"), (1, "storm"), (2, "calm"), (3, "dawn")] {
        let seq = lib.add_sequence(rng, dusk, &format!("dusk {offset}"), 64);
        if let Some(binding) = lib.bind(rng, seq, offset) {
            lib.add_meme(rng, MemeOwner::Binding(binding), meme);
        }
    }

    let tide = lib.add_program(rng, ProgramType::Macro, ProgramState::Published, "Tide Arc", "G", 110.0, 0.6);
    lib.add_meme(rng, MemeOwner::Program(tide), "water");
    for offset in 0..3 {
        let seq = lib.add_sequence(rng, tide, &format!("tide {offset}"), 64);
        lib.bind(rng, seq, offset);
    }

    let mains: [(&str, &str, f64, &[&str], &[(f64, &str)]); 4] = [
        ("Lanterns", "A minor", 92.0, &["night", "calm"], &[(0.0, "A min"), (8.0, "F maj7"), (16.0, "E7")]),
        ("Squall", "D minor", 104.0, &["storm", "!calm"], &[(0.0, "Dm"), (4.0, "Bb"), (8.0, "C"), (12.0, "A7")]),
        ("Harbor", "G", 108.0, &["water"], &[(0.0, "G"), (8.0, "C/E"), (16.0, "D")]),
        ("Sketch", "C", 100.0, &[], &[(0.0, "C")]),
    ];
    for (name, key, tempo, memes, chords) in mains {
        let state = if name == "Sketch" { ProgramState::Draft } else { ProgramState::Published };
        let program = lib.add_program(rng, ProgramType::Main, state, name, key, tempo, 0.5);
        for meme in memes {
            lib.add_meme(rng, MemeOwner::Program(program), meme);
        }
        for (offset, part) in ["verse", "chorus"].into_iter().enumerate() {
            let seq = lib.add_sequence(rng, program, part, 24);
            lib.bind(rng, seq, offset as i32);
            for &(position, chord) in chords {
                let id = lib.add_chord(rng, seq, position, chord);
                lib.add_voicing(rng, id, VoiceType::Pad, "C3, E3, G3");
            }
        }
    }
    lib
}
