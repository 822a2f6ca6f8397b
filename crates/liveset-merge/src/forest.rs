//! Forest reconstruction and track container reassembly.
//!
//! Base and resolved incoming buckets are combined under their final keys,
//! ordered depth-first from the top-level buckets (the members of a group
//! follow it in source order, nested groups included), flattened into one
//! node sequence with the temporary attributes stripped, and written back
//! as the children of the track container.

use std::collections::{HashMap, HashSet};

use liveset_extract::schema::PREVIOUS_TRACK;
use liveset_tree::{Document, NodeId};
use tracing::{debug, warn};

use crate::bucket::{Bucket, BucketMap};
use crate::error::{MergeError, MergeResult};
use crate::record::TrackRecord;

/// Combine base and incoming buckets.
///
/// Buckets present on one side only are kept as they are, base first. When
/// a key exists on both sides the incoming records join the base bucket:
/// the container comes first, then base members, then incoming members.
/// Two containers under one key cannot be combined.
pub fn combine_buckets(base: BucketMap, incoming: BucketMap) -> MergeResult<BucketMap> {
    let mut combined = base;
    for bucket in incoming.into_buckets() {
        match combined.get_mut(bucket.key()) {
            Some(existing) => {
                if existing.has_container() && bucket.has_container() {
                    return Err(MergeError::GroupCollision { key: bucket.key() });
                }
                debug!(key = bucket.key(), added = bucket.len(), "joining base group");
                for record in bucket.records {
                    existing.add(record);
                }
            }
            None => {
                combined.insert(bucket);
            }
        }
    }
    Ok(combined)
}

/// One slot in a group's member list: a track, or a nested group whose
/// whole subtree is emitted in its place.
enum Member {
    Track(TrackRecord),
    Group { bucket: usize, position: usize },
}

impl Member {
    fn position(&self) -> usize {
        match self {
            Member::Track(record) => record.position,
            Member::Group { position, .. } => *position,
        }
    }
}

struct ForestBuilder {
    slots: Vec<Option<Bucket>>,
    children: Vec<Vec<usize>>,
    out: Vec<TrackRecord>,
}

impl ForestBuilder {
    /// Emit a bucket's container, then its tracks and nested groups in
    /// source order.
    fn emit(&mut self, index: usize) {
        let Some(bucket) = self.slots[index].take() else {
            return;
        };
        let mut records = bucket.records.into_iter().peekable();
        if let Some(container) = records.next_if(|r| r.is_group) {
            self.out.push(container);
        }

        let mut members: Vec<Member> = records.map(Member::Track).collect();
        for child in std::mem::take(&mut self.children[index]) {
            if let Some(nested) = &self.slots[child] {
                members.push(Member::Group {
                    bucket: child,
                    position: nested.head().position,
                });
            }
        }
        members.sort_by_key(Member::position);

        for member in members {
            match member {
                Member::Track(record) => self.out.push(record),
                Member::Group { bucket, .. } => self.emit(bucket),
            }
        }
    }
}

/// Order tracks so every group is followed by its members.
///
/// A bucket is top level when its head is not a group container, when the
/// container has no positive parent, or when no bucket in the map holds
/// that parent. Top-level buckets keep map order. Inside a group, tracks and
/// nested groups keep their source order, so an unchanged set comes back
/// in its original order. Buckets unreachable from the top level (a group
/// cycle) are appended at the end.
pub fn order_forest(buckets: BucketMap) -> Vec<TrackRecord> {
    let buckets = buckets.into_buckets();

    let containers: HashMap<i64, usize> = buckets
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.container().map(|c| (c.id, i)))
        .collect();

    let parent_of = |bucket: &Bucket| -> Option<usize> {
        let head = bucket.container()?;
        if head.group_id <= 0 {
            return None;
        }
        containers.get(&head.group_id).copied()
    };

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); buckets.len()];
    let mut roots = Vec::new();
    for (i, bucket) in buckets.iter().enumerate() {
        match parent_of(bucket) {
            Some(parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let total = buckets.iter().map(Bucket::len).sum();
    let mut builder = ForestBuilder {
        slots: buckets.into_iter().map(Some).collect(),
        children,
        out: Vec::with_capacity(total),
    };
    for root in roots {
        builder.emit(root);
    }
    for i in 0..builder.slots.len() {
        if let Some(bucket) = &builder.slots[i] {
            warn!(key = bucket.key(), "group is not reachable from the top level");
            builder.emit(i);
        }
    }
    builder.out
}

/// Flatten ordered records into track nodes, removing the predecessor
/// stamp and the merge marker from each.
pub fn flatten(doc: &mut Document, ordered: &[TrackRecord], merge_marker: &str) -> MergeResult<Vec<NodeId>> {
    let mut nodes = Vec::with_capacity(ordered.len());
    for record in ordered {
        doc.remove_attribute(record.node, PREVIOUS_TRACK)?;
        doc.remove_attribute(record.node, merge_marker)?;
        nodes.push(record.node);
    }
    Ok(nodes)
}

/// Replace every child of `container` with `tracks`, in order.
pub fn reassemble(doc: &mut Document, container: NodeId, tracks: &[NodeId]) -> MergeResult<()> {
    if !doc.accepts_children(container) {
        return Err(MergeError::MissingAppendCapability(container));
    }
    let removed = doc.remove_all_children(container)?;
    debug!(removed = removed.len(), appended = tracks.len(), "reassembling track container");

    let mut seen = HashSet::new();
    for track in tracks {
        if seen.insert(*track) {
            doc.append_child(container, *track)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::aggregate;
    use crate::record::classify_tracks;
    use crate::testing::{audio, group, merge_fixture, track_listing, TrackFixture};

    fn buckets(base: &[TrackFixture], incoming: &[TrackFixture]) -> (Document, BucketMap, BucketMap) {
        let (doc, tracks) = merge_fixture(base, incoming);
        let classified = classify_tracks(&doc, &tracks, "Merged").unwrap();
        (doc, aggregate(classified.base), aggregate(classified.incoming))
    }

    fn ids(ordered: &[TrackRecord]) -> Vec<i64> {
        ordered.iter().map(|r| r.id).collect()
    }

    #[test]
    fn combine_appends_new_keys_after_base() {
        let (_, base, incoming) = buckets(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[audio(9, -1, "Vox")],
        );
        let combined = combine_buckets(base, incoming).unwrap();
        assert_eq!(combined.keys().collect::<Vec<_>>(), vec![81, 9]);
    }

    #[test]
    fn combine_joins_members_into_base_group() {
        let (_, base, incoming) = buckets(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[audio(5, 81, "Clap")],
        );
        let combined = combine_buckets(base, incoming).unwrap();
        let bucket = combined.get(81).unwrap();
        assert_eq!(
            bucket.records().iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![81, 1, 5]
        );
    }

    #[test]
    fn combine_puts_incoming_container_first() {
        let (_, base, incoming) = buckets(&[audio(1, 81, "Kick")], &[group(81, -1, "Drums")]);
        let combined = combine_buckets(base, incoming).unwrap();
        let bucket = combined.get(81).unwrap();
        assert!(bucket.has_container());
        assert_eq!(bucket.head().id, 81);
    }

    #[test]
    fn two_containers_under_one_key_collide() {
        let (_, base, incoming) = buckets(&[group(81, -1, "Drums")], &[group(81, -1, "Drums")]);
        assert!(matches!(
            combine_buckets(base, incoming),
            Err(MergeError::GroupCollision { key: 81 })
        ));
    }

    #[test]
    fn nested_groups_follow_their_parent() {
        // The nested group's bucket is encountered before its parent's.
        let (_, base, incoming) = buckets(
            &[
                group(82, 81, "Toms"),
                audio(3, 82, "Floor"),
                audio(8, -1, "Bass"),
                group(81, -1, "Drums"),
                audio(1, 81, "Kick"),
            ],
            &[],
        );
        let ordered = order_forest(combine_buckets(base, incoming).unwrap());
        assert_eq!(ids(&ordered), vec![8, 81, 82, 3, 1]);
    }

    #[test]
    fn nested_group_before_sibling_track_keeps_its_place() {
        let (_, base, _) = buckets(
            &[
                group(81, -1, "Drums"),
                group(82, 81, "Toms"),
                audio(4, 82, "Floor"),
                audio(1, 81, "Kick"),
                group(83, 81, "Cymbals"),
                audio(5, 83, "Ride"),
                audio(2, 81, "Hat"),
            ],
            &[],
        );
        let ordered = order_forest(base);
        assert_eq!(ids(&ordered), vec![81, 82, 4, 1, 83, 5, 2]);
    }

    #[test]
    fn incoming_members_follow_base_members() {
        let (_, base, incoming) = buckets(
            &[group(81, -1, "Drums"), group(82, 81, "Toms"), audio(1, 81, "Kick")],
            &[audio(7, 81, "Clap")],
        );
        let ordered = order_forest(combine_buckets(base, incoming).unwrap());
        assert_eq!(ids(&ordered), vec![81, 82, 1, 7]);
    }

    #[test]
    fn sibling_groups_keep_encounter_order() {
        let (_, base, _) = buckets(
            &[
                group(81, -1, "Drums"),
                group(82, 81, "Toms"),
                group(83, 81, "Cymbals"),
                group(84, 82, "Low"),
            ],
            &[],
        );
        let ordered = order_forest(base);
        assert_eq!(ids(&ordered), vec![81, 82, 84, 83]);
    }

    #[test]
    fn group_cycle_is_still_emitted() {
        let (_, base, _) = buckets(&[group(81, 82, "A"), group(82, 81, "B")], &[]);
        let ordered = order_forest(base);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn flatten_and_reassemble_strip_temporary_attributes() {
        let (mut doc, base, incoming) = buckets(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[audio(9, -1, "Vox")],
        );
        let ordered = order_forest(combine_buckets(base, incoming).unwrap());
        for record in &ordered {
            doc.set_attribute(record.node, PREVIOUS_TRACK, "-1").unwrap();
        }
        let nodes = flatten(&mut doc, &ordered, "Merged").unwrap();
        let container = doc.select_first(doc.root(), "/Ableton/LiveSet/Tracks").unwrap().unwrap();
        reassemble(&mut doc, container, &nodes).unwrap();

        assert_eq!(
            track_listing(&doc),
            vec![
                ("GroupTrack".to_string(), 81),
                ("AudioTrack".to_string(), 1),
                ("AudioTrack".to_string(), 9),
            ]
        );
        for node in nodes {
            assert!(!doc.has_attribute(node, PREVIOUS_TRACK));
            assert!(!doc.has_attribute(node, "Merged"));
        }
    }

    #[test]
    fn reassemble_rejects_leaf_container() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        assert!(matches!(
            reassemble(&mut doc, text, &[]),
            Err(MergeError::MissingAppendCapability(_))
        ));
    }
}
