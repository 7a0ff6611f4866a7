// Segment planning: decide what kind of segment comes next in a chain.
//
// Craft is told a segment's type; this module decides it from history:
//
//   - no previous segment                               -> Initial
//   - previous main program has another chapter and the
//     chain has not dwelt on it for the max delta       -> Continue
//   - previous macro program has at least two more
//     chapters                                          -> NextMain
//   - otherwise                                         -> NextMacro
//
// `plan_next_segment` appends the next Planned segment to a chain, starting
// where the last one ends.

use crate::config::CraftConfig;
use crate::content::ContentRepository;
use crate::retrospective::{Retrospective, remaining_offsets};
use crate::segment::Segment;
use crate::store::{SegmentStore, StoreError};
use crate::types::{ChainId, SegmentId, SegmentType};
use tracing::debug;

pub fn compute_segment_type<C: ContentRepository + ?Sized>(
    content: &C,
    retro: &Retrospective,
    config: &CraftConfig,
) -> SegmentType {
    let Some(previous) = retro.previous_segment() else {
        return SegmentType::Initial;
    };

    if let Some(main) = retro.previous_main_choice()
        && remaining_offsets(content, main) >= 1
        && previous.delta < config.main_program_length_max_delta
    {
        return SegmentType::Continue;
    }

    if let Some(macro_choice) = retro.previous_macro_choice()
        && remaining_offsets(content, macro_choice) >= 2
    {
        return SegmentType::NextMain;
    }

    SegmentType::NextMacro
}

/// Add the next Planned segment of `chain` to the store and return it.
pub fn plan_next_segment<C: ContentRepository + ?Sized, S: SegmentStore + ?Sized>(
    content: &C,
    store: &mut S,
    chain: ChainId,
    id: SegmentId,
    config: &CraftConfig,
) -> Result<Segment, StoreError> {
    let last = store.segments_of_chain(chain).pop();
    let (offset, begin_at) = match &last {
        Some(last) => (last.offset + 1, last.end_at_chain_micros()),
        None => (0, 0),
    };
    let mut segment = Segment::planned(id, chain, offset, SegmentType::Initial, begin_at);
    let retro = Retrospective::load(&*store, &segment);
    segment.kind = compute_segment_type(content, &retro, config);
    debug!(segment = %segment.id, offset, kind = ?segment.kind, "planned segment");
    store.add_segment(segment.clone())?;
    Ok(segment)
}
