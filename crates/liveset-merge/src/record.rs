//! Track records and the position classifier.
//!
//! A [`TrackRecord`] is the merge engine's view of one track node: its id,
//! declared predecessor, enclosing group, and whether it is a group
//! container or comes from the incoming set. Records hold the node's
//! [`NodeId`]; they never copy node content.

use std::collections::HashMap;

use liveset_extract::schema::{self, NONE_ID, VALUE};
use liveset_tree::{Document, NodeId};
use tracing::debug;

use crate::error::{MergeError, MergeResult};

/// Which side of the merge a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Base,
    Incoming,
}

/// Classified view of one track node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: i64,
    /// Predecessor id in document order, or `-1`.
    pub previous_id: i64,
    /// Enclosing group container id, or `-1` for top level.
    pub group_id: i64,
    pub is_group: bool,
    pub is_incoming: bool,
    pub node: NodeId,
    /// Place in source order. Base records come before incoming ones.
    pub position: usize,
}

impl TrackRecord {
    /// The key a record is bucketed under: its own id for a group
    /// container, else its enclosing group, else its own id.
    pub fn group_key(&self) -> i64 {
        if self.is_group {
            self.id
        } else if self.group_id > 0 {
            self.group_id
        } else {
            self.id
        }
    }

    pub fn source(&self) -> Source {
        if self.is_incoming {
            Source::Incoming
        } else {
            Source::Base
        }
    }
}

/// Classify one track node.
///
/// A document-kind fragment wrapper is unwrapped to its first element
/// child. The `Id` attribute and the `TrackGroupId` node are mandatory; a
/// missing `PreviousTrack` stamp defaults to `-1`.
pub fn classify(doc: &Document, node: NodeId, merge_marker: &str) -> MergeResult<TrackRecord> {
    let node = if doc.is_document(node) {
        doc.first_element_child(node)
            .ok_or_else(|| MergeError::malformed(node, "fragment holds no element"))?
    } else {
        node
    };
    if !doc.is_element(node) {
        return Err(MergeError::malformed(node, "not an element"));
    }

    let id = schema::track_id(doc, node)
        .map_err(|e| MergeError::malformed(node, e.to_string()))?
        .ok_or_else(|| MergeError::malformed(node, "missing Id attribute"))?;

    let previous_id = schema::previous_track(doc, node)
        .map_err(|e| MergeError::malformed(node, e.to_string()))?;

    let group_node = schema::group_id_node(doc, node)?
        .ok_or_else(|| MergeError::malformed(node, "missing TrackGroupId"))?;
    let group_id = doc
        .attribute_i64(group_node, VALUE)
        .map_err(|e| MergeError::malformed(node, e.to_string()))?
        .unwrap_or(NONE_ID);

    let record = TrackRecord {
        id,
        previous_id,
        group_id,
        is_group: schema::is_group_track(doc, node),
        is_incoming: doc.has_attribute(node, merge_marker),
        node,
        position: 0,
    };
    debug!(
        id,
        previous = previous_id,
        group = group_id,
        is_group = record.is_group,
        incoming = record.is_incoming,
        "classified track"
    );
    Ok(record)
}

/// Classified tracks split by source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedTracks {
    pub base: Vec<TrackRecord>,
    pub incoming: Vec<TrackRecord>,
    /// Highest track id across both sources; fresh ids start above it.
    pub max_id: i64,
}

/// Classify every track, preserving input order within each source.
pub fn classify_tracks(
    doc: &Document,
    tracks: &[NodeId],
    merge_marker: &str,
) -> MergeResult<ClassifiedTracks> {
    let mut out = ClassifiedTracks::default();
    for node in tracks {
        let record = classify(doc, *node, merge_marker)?;
        out.max_id = out.max_id.max(record.id);
        match record.source() {
            Source::Base => out.base.push(record),
            Source::Incoming => out.incoming.push(record),
        }
    }
    assign_positions(&mut out.base, 0);
    assign_positions(&mut out.incoming, out.base.len());
    debug!(
        base = out.base.len(),
        incoming = out.incoming.len(),
        max_id = out.max_id,
        "classified tracks"
    );
    Ok(out)
}

/// Number the records of one source in document order, starting at
/// `offset`.
///
/// When every record carries a `PreviousTrack` stamp and the stamps form a
/// single chain, the chain gives the order. Otherwise the input order is
/// used.
fn assign_positions(records: &mut [TrackRecord], offset: usize) {
    let order = predecessor_chain(records).unwrap_or_else(|| (0..records.len()).collect());
    for (position, index) in order.into_iter().enumerate() {
        records[index].position = offset + position;
    }
}

fn predecessor_chain(records: &[TrackRecord]) -> Option<Vec<usize>> {
    let mut successor: HashMap<i64, usize> = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if successor.insert(record.previous_id, index).is_some() {
            debug!(previous = record.previous_id, "predecessor stamps do not form a chain");
            return None;
        }
    }

    let mut order = Vec::with_capacity(records.len());
    let mut previous = NONE_ID;
    while let Some(index) = successor.remove(&previous) {
        order.push(index);
        previous = records[index].id;
    }
    (order.len() == records.len()).then_some(order)
}
