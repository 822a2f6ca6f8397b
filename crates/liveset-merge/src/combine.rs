//! Two-document driver: merge the tracks of two Live sets into a third.

use liveset_extract::split;
use liveset_tree::{Document, NodeId};
use tracing::info;

use crate::config::MergeConfig;
use crate::error::MergeResult;
use crate::merger::{merge_tracks, MergeReport};

/// Merge the tracks of `base` and `incoming` into `destination`.
///
/// Both sources are split (which stamps each track with its predecessor),
/// their tracks are copied into the destination arena, and the incoming
/// copies are flagged with the merge marker. Everything outside the track
/// container comes from `destination`, which is usually a copy of `base`.
pub fn combine_documents(
    mut base: Document,
    mut incoming: Document,
    mut destination: Document,
    config: &MergeConfig,
) -> MergeResult<(Document, MergeReport)> {
    let base_tracks = split(&mut base, &config.paths)?.tracks();
    let incoming_tracks = split(&mut incoming, &config.paths)?.tracks();
    info!(
        base = base_tracks.len(),
        incoming = incoming_tracks.len(),
        "extracted tracks"
    );

    let mut tracks: Vec<NodeId> = Vec::with_capacity(base_tracks.len() + incoming_tracks.len());
    for node in base_tracks {
        tracks.push(destination.import(&base, node)?);
    }
    for node in incoming_tracks {
        let copy = destination.import(&incoming, node)?;
        destination.set_attribute(copy, &config.merge_marker, "true")?;
        tracks.push(copy);
    }

    let report = merge_tracks(&mut destination, &tracks, config)?;
    Ok((destination, report))
}
