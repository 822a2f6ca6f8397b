//! Merge orchestration.
//!
//! [`merge_tracks`] runs the whole pipeline over a destination document
//! whose arena already holds the base and incoming track nodes:
//!
//! 1. classify every track and split by source
//! 2. bucket each source by effective group key
//! 3. resolve incoming conflicts against the base buckets
//! 4. combine, order, flatten, and reattach under the track container
//! 5. renumber pointees and store the new high-water mark
//!
//! The destination is mutated in place. A failure leaves it partially
//! merged; callers that need the original must keep their own copy.

use liveset_tree::{Document, NodeId};
use serde::Serialize;
use tracing::info;

use crate::bucket::aggregate;
use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::forest::{combine_buckets, flatten, order_forest, reassemble};
use crate::pointee::{renumber_pointees, sync_next_pointee};
use crate::record::classify_tracks;
use crate::resolve::{resolve_conflicts, Conflict, RemapTable};

/// Summary of one merge run.
#[derive(Clone, Debug, Serialize)]
pub struct MergeReport {
    pub base_tracks: usize,
    pub incoming_tracks: usize,
    pub total_tracks: usize,
    /// Tracks moved to fresh ids and renamed.
    pub conflicts: Vec<Conflict>,
    /// Group ids that were reassigned.
    pub remap: RemapTable,
    /// Value written into the next-pointee node.
    pub next_pointee_id: i64,
}

impl MergeReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge `tracks` into the track container located by the configured path.
pub fn merge_tracks(
    doc: &mut Document,
    tracks: &[NodeId],
    config: &MergeConfig,
) -> MergeResult<MergeReport> {
    let pattern = &config.paths.tracks_container;
    let container = doc
        .select_first(doc.root(), pattern)?
        .ok_or_else(|| MergeError::TracksContainerNotFound(pattern.clone()))?;
    merge_into(doc, container, tracks, config)
}

/// Merge `tracks` into an explicit track container.
pub fn merge_into(
    doc: &mut Document,
    container: NodeId,
    tracks: &[NodeId],
    config: &MergeConfig,
) -> MergeResult<MergeReport> {
    if !doc.accepts_children(container) {
        return Err(MergeError::MissingAppendCapability(container));
    }

    let classified = classify_tracks(doc, tracks, &config.merge_marker)?;
    let base_tracks = classified.base.len();
    let incoming_tracks = classified.incoming.len();
    info!(base = base_tracks, incoming = incoming_tracks, "merging tracks");

    let base = aggregate(classified.base);
    let incoming = aggregate(classified.incoming);
    let resolution = resolve_conflicts(
        doc,
        &base,
        incoming,
        classified.max_id,
        &config.conflict_prefix,
    )?;
    info!(
        conflicts = resolution.conflicts.len(),
        remapped_groups = resolution.remap.len(),
        max_id = resolution.max_id,
        "resolved conflicts"
    );

    let combined = combine_buckets(base, resolution.buckets)?;
    let ordered = order_forest(combined);
    let nodes = flatten(doc, &ordered, &config.merge_marker)?;
    reassemble(doc, container, &nodes)?;

    let next_pointee_id = renumber_pointees(doc, config.pointee_threshold)?;
    sync_next_pointee(doc, &config.paths.next_pointee, next_pointee_id)?;
    info!(tracks = nodes.len(), next_pointee_id, "merge complete");

    Ok(MergeReport {
        base_tracks,
        incoming_tracks,
        total_tracks: nodes.len(),
        conflicts: resolution.conflicts,
        remap: resolution.remap,
        next_pointee_id,
    })
}
