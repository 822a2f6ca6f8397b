//! Conflict resolution between base and incoming buckets.
//!
//! An incoming bucket conflicts when its group key already exists among
//! the base buckets, or when its group container's id is already used by a
//! base track. Every record of a conflicting bucket gets a fresh id above
//! the highest id seen in either source, members are re-pointed at the
//! container's new id, and each moved track's user name is prefixed (the
//! rename is lossy and is not undone). Buckets that do not conflict pass
//! through untouched, even when one of their leaf ids also appears in base.
//!
//! All state changes go through [`Resolver`]: the running id allocator, the
//! remap table, and the conflict log. Nested group chains are handled by
//! rewriting a container's parent reference whenever that parent's id was
//! remapped, in whatever order the buckets are visited.

use std::collections::{BTreeMap, HashSet};

use liveset_extract::schema::{self, EFFECTIVE_NAME, ID, USER_NAME, VALUE};
use liveset_tree::Document;
use serde::Serialize;
use tracing::debug;

use crate::bucket::{Bucket, BucketMap};
use crate::error::{MergeError, MergeResult};
use crate::record::TrackRecord;

/// Hands out fresh track ids above the highest id seen so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdAllocator {
    max_id: i64,
}

impl IdAllocator {
    pub fn new(max_id: i64) -> Self {
        Self { max_id }
    }

    /// The highest id allocated or observed.
    pub fn current(&self) -> i64 {
        self.max_id
    }

    /// The next free id, or `None` once the id space is exhausted.
    pub fn next_id(&mut self) -> Option<i64> {
        self.max_id = self.max_id.checked_add(1)?;
        Some(self.max_id)
    }
}

/// Old group id to newly assigned group id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemapTable(BTreeMap<i64, i64>);

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, old: i64) -> Option<i64> {
        self.0.get(&old).copied()
    }

    pub fn insert(&mut self, old: i64, new: i64) {
        self.0.insert(old, new);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// One track moved during resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub old_id: i64,
    pub new_id: i64,
    /// Group the track belongs to after resolution.
    pub group_id: i64,
    pub is_group: bool,
    pub previous_name: String,
    pub name: String,
}

/// Output of [`resolve_conflicts`].
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Incoming buckets, re-keyed under their final group key.
    pub buckets: BucketMap,
    pub remap: RemapTable,
    /// Highest id after allocation.
    pub max_id: i64,
    pub conflicts: Vec<Conflict>,
}

struct Resolver<'a> {
    doc: &'a mut Document,
    prefix: &'a str,
    ids: IdAllocator,
    remap: RemapTable,
    conflicts: Vec<Conflict>,
}

impl Resolver<'_> {
    fn assign_id(&mut self, record: &mut TrackRecord) -> MergeResult<i64> {
        let old = record.id;
        let new = self
            .ids
            .next_id()
            .ok_or_else(|| MergeError::malformed(record.node, format!("no track id left above {old}")))?;
        self.doc.set_attribute(record.node, ID, new.to_string())?;
        record.id = new;
        Ok(old)
    }

    fn set_group(&mut self, record: &mut TrackRecord, group_id: i64) -> MergeResult<()> {
        let node = schema::group_id_node(self.doc, record.node)?
            .ok_or_else(|| MergeError::malformed(record.node, "missing TrackGroupId"))?;
        self.doc.set_attribute(node, VALUE, group_id.to_string())?;
        record.group_id = group_id;
        Ok(())
    }

    /// Prefix the user name: the existing user name when it is longer than
    /// one character, otherwise the generated effective name.
    fn rename(&mut self, record: &TrackRecord, old_id: i64) -> MergeResult<()> {
        let node = record.node;
        let effective = self
            .doc
            .select_first(node, EFFECTIVE_NAME)?
            .ok_or_else(|| MergeError::malformed(node, "missing Name/EffectiveName"))?;
        let user = self
            .doc
            .select_first(node, USER_NAME)?
            .ok_or_else(|| MergeError::malformed(node, "missing Name/UserName"))?;

        let user_value = self.doc.attribute(user, VALUE).unwrap_or_default();
        let current = if user_value.chars().count() > 1 {
            user_value.to_string()
        } else {
            self.doc
                .attribute(effective, VALUE)
                .unwrap_or_default()
                .to_string()
        };
        let renamed = format!("{}{}", self.prefix, current);
        debug!(old_id, new_id = record.id, from = %current, to = %renamed, "renaming track");
        self.doc.set_attribute(user, VALUE, renamed.clone())?;

        self.conflicts.push(Conflict {
            old_id,
            new_id: record.id,
            group_id: record.group_id,
            is_group: record.is_group,
            previous_name: current,
            name: renamed,
        });
        Ok(())
    }

    /// Move every record of a conflicting bucket to fresh ids.
    fn reassign_bucket(&mut self, mut bucket: Bucket) -> MergeResult<Bucket> {
        let old_key = bucket.key;
        let mut container: Option<i64> = None;
        let mut new_key = old_key;

        for (position, record) in bucket.records.iter_mut().enumerate() {
            let old_id = self.assign_id(record)?;
            if record.is_group {
                debug!(old_id, new_id = record.id, "updating group id");
                self.remap.insert(old_id, record.id);
                container = Some(record.id);
                new_key = record.id;
                if record.group_id > 0 {
                    if let Some(parent) = self.remap.get(record.group_id) {
                        debug!(old_parent = record.group_id, new_parent = parent, "updating parent group");
                        self.set_group(record, parent)?;
                    }
                }
            } else {
                match container {
                    Some(group_id) => self.set_group(record, group_id)?,
                    None if record.group_id > 0 => self.set_group(record, old_key)?,
                    None if position == 0 => new_key = record.id,
                    None => {}
                }
                debug!(old_id, new_id = record.id, group = record.group_id, "updating track id");
            }
            self.rename(record, old_id)?;
        }

        bucket.key = new_key;
        Ok(bucket)
    }

    fn reparent_nested_groups(&mut self, buckets: &mut BucketMap) -> MergeResult<()> {
        for bucket in buckets.iter_mut() {
            for record in bucket.records.iter_mut() {
                if !record.is_group || record.group_id <= 0 {
                    continue;
                }
                if let Some(parent) = self.remap.get(record.group_id) {
                    debug!(group = record.id, old_parent = record.group_id, new_parent = parent, "re-pointing nested group");
                    self.set_group(record, parent)?;
                }
            }
        }
        Ok(())
    }
}

/// Resolve every incoming bucket against the base buckets.
///
/// `max_id` is the highest track id across both sources; fresh ids are
/// allocated above it. Non-conflicting buckets pass through under their
/// original key.
pub fn resolve_conflicts(
    doc: &mut Document,
    base: &BucketMap,
    incoming: BucketMap,
    max_id: i64,
    prefix: &str,
) -> MergeResult<Resolution> {
    let taken: HashSet<i64> = base
        .iter()
        .flat_map(|b| b.records().iter().map(|r| r.id))
        .collect();

    let mut resolver = Resolver {
        doc,
        prefix,
        ids: IdAllocator::new(max_id),
        remap: RemapTable::new(),
        conflicts: Vec::new(),
    };
    let mut out = BucketMap::new();

    for mut bucket in incoming.into_buckets() {
        let conflicts = base.contains_key(bucket.key)
            || bucket.container().is_some_and(|c| taken.contains(&c.id));
        debug!(key = bucket.key, conflicts, "processing incoming group");

        if conflicts {
            bucket = resolver.reassign_bucket(bucket)?;
        }

        if out.contains_key(bucket.key) {
            return Err(MergeError::GroupCollision { key: bucket.key });
        }
        out.insert(bucket);
    }

    resolver.reparent_nested_groups(&mut out)?;

    Ok(Resolution {
        buckets: out,
        remap: resolver.remap,
        max_id: resolver.ids.current(),
        conflicts: resolver.conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::aggregate;
    use crate::record::classify_tracks;
    use crate::testing::{audio, group, group_value, merge_fixture, user_name, TrackFixture};

    fn resolve(base: &[TrackFixture], incoming: &[TrackFixture]) -> (Document, BucketMap, Resolution) {
        let (mut doc, tracks) = merge_fixture(base, incoming);
        let classified = classify_tracks(&doc, &tracks, "Merged").unwrap();
        let base_map = aggregate(classified.base);
        let incoming_map = aggregate(classified.incoming);
        let resolution =
            resolve_conflicts(&mut doc, &base_map, incoming_map, classified.max_id, "conflict-")
                .unwrap();
        (doc, base_map, resolution)
    }

    #[test]
    fn colliding_group_gets_fresh_ids() {
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick"), audio(2, 81, "Hat")],
            &[group(81, -1, "Drums"), audio(200, 81, "Snare")],
        );

        assert_eq!(resolution.buckets.keys().collect::<Vec<_>>(), vec![201]);
        let bucket = resolution.buckets.get(201).unwrap();
        let container = bucket.container().unwrap();
        assert_eq!(container.id, 201);
        assert_eq!(doc.attribute(container.node, "Id"), Some("201"));

        let member = &bucket.records()[1];
        assert_eq!(member.id, 202);
        assert_eq!(member.group_id, 201);
        assert_eq!(group_value(&doc, member.node), 201);
        assert_eq!(user_name(&doc, member.node), "conflict-Snare");
        assert_eq!(user_name(&doc, container.node), "conflict-Drums");

        assert_eq!(resolution.remap.get(81), Some(201));
        assert_eq!(resolution.max_id, 202);
        assert_eq!(resolution.conflicts.len(), 2);
    }

    #[test]
    fn short_user_name_falls_back_to_effective_name() {
        let mut snare = audio(200, 81, "S");
        snare.effective_name = "2-Snare".into();
        let (doc, _, resolution) =
            resolve(&[group(81, -1, "Drums")], &[group(81, -1, ""), snare]);
        let bucket = resolution.buckets.get(201).unwrap();
        assert_eq!(user_name(&doc, bucket.records()[0].node), "conflict-81-Group");
        assert_eq!(user_name(&doc, bucket.records()[1].node), "conflict-2-Snare");
    }

    #[test]
    fn non_colliding_bucket_passes_through() {
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[group(90, -1, "Keys"), audio(91, 90, "Piano")],
        );
        assert_eq!(resolution.buckets.keys().collect::<Vec<_>>(), vec![90]);
        assert!(resolution.conflicts.is_empty());
        assert!(resolution.remap.is_empty());
        let bucket = resolution.buckets.get(90).unwrap();
        assert_eq!(user_name(&doc, bucket.records()[1].node), "Piano");
    }

    #[test]
    fn nested_groups_follow_remapped_parent() {
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), group(82, 81, "Toms")],
            &[
                group(81, -1, "Drums"),
                group(82, 81, "Toms"),
                audio(3, 82, "Floor"),
            ],
        );
        // 81 -> 83, 82 -> 84, member 3 -> 85
        assert_eq!(resolution.remap.get(81), Some(83));
        assert_eq!(resolution.remap.get(82), Some(84));
        let toms = resolution.buckets.get(84).unwrap();
        assert_eq!(toms.head().group_id, 83);
        assert_eq!(group_value(&doc, toms.head().node), 83);
        assert_eq!(toms.records()[1].group_id, 84);
    }

    #[test]
    fn nested_group_without_own_collision_is_reparented() {
        // Incoming 82 is new, but its parent 81 collides.
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[group(81, -1, "Drums"), group(82, 81, "Toms"), audio(3, 82, "Floor")],
        );
        let toms = resolution.buckets.get(82).unwrap();
        assert_eq!(toms.head().group_id, 83);
        assert_eq!(group_value(&doc, toms.head().node), 83);
        // 82 itself kept its id and name.
        assert_eq!(user_name(&doc, toms.head().node), "Toms");
    }

    #[test]
    fn colliding_ungrouped_leaf_is_rekeyed() {
        let (doc, _, resolution) = resolve(&[audio(8, -1, "Bass")], &[audio(8, -1, "Bass")]);
        assert_eq!(resolution.buckets.keys().collect::<Vec<_>>(), vec![9]);
        let record = resolution.buckets.get(9).unwrap().head();
        assert_eq!(record.group_id, -1);
        assert_eq!(group_value(&doc, record.node), -1);
        assert_eq!(user_name(&doc, record.node), "conflict-Bass");
    }

    #[test]
    fn orphan_members_join_base_group() {
        // Incoming members of group 81 without the container itself.
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[audio(5, 81, "Clap")],
        );
        let bucket = resolution.buckets.get(81).unwrap();
        assert!(!bucket.has_container());
        let clap = bucket.head();
        assert_eq!(clap.id, 82);
        assert_eq!(clap.group_id, 81);
        assert_eq!(user_name(&doc, clap.node), "conflict-Clap");
    }

    #[test]
    fn leaf_sharing_base_id_in_new_group_is_untouched() {
        let (doc, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(1, 81, "Kick")],
            &[group(90, -1, "Keys"), audio(1, 90, "Piano")],
        );
        assert!(resolution.conflicts.is_empty());
        assert!(resolution.remap.is_empty());
        assert_eq!(resolution.max_id, 90);
        let keys = resolution.buckets.get(90).unwrap();
        let piano = &keys.records()[1];
        assert_eq!(piano.id, 1);
        assert_eq!(piano.group_id, 90);
        assert_eq!(doc.attribute(piano.node, "Id"), Some("1"));
        assert_eq!(user_name(&doc, piano.node), "Piano");
    }

    #[test]
    fn group_colliding_with_base_leaf_id_is_moved() {
        let (_, _, resolution) = resolve(
            &[group(81, -1, "Drums"), audio(90, 81, "Kick")],
            &[group(90, -1, "Keys"), audio(91, 90, "Piano")],
        );
        assert_eq!(resolution.remap.get(90), Some(92));
        let keys = resolution.buckets.get(92).unwrap();
        assert_eq!(keys.records()[1].group_id, 92);
    }

    #[test]
    fn allocator_counts_up() {
        let mut ids = IdAllocator::new(200);
        assert_eq!(ids.next_id(), Some(201));
        assert_eq!(ids.next_id(), Some(202));
        assert_eq!(ids.current(), 202);
    }

    #[test]
    fn allocator_stops_at_largest_id() {
        let mut ids = IdAllocator::new(i64::MAX - 1);
        assert_eq!(ids.next_id(), Some(i64::MAX));
        assert_eq!(ids.next_id(), None);
        assert_eq!(ids.current(), i64::MAX);
    }

    #[test]
    fn exhausted_id_space_is_reported() {
        let (mut doc, tracks) =
            merge_fixture(&[audio(i64::MAX, -1, "Bass")], &[audio(i64::MAX, -1, "Bass")]);
        let classified = classify_tracks(&doc, &tracks, "Merged").unwrap();
        let base = aggregate(classified.base);
        let incoming = aggregate(classified.incoming);
        let result = resolve_conflicts(&mut doc, &base, incoming, classified.max_id, "conflict-");
        assert!(matches!(result, Err(MergeError::MalformedTrack { .. })));
    }
}
