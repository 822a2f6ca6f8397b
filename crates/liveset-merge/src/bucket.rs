//! Group aggregation: bucketing records under their effective group key.
//!
//! Buckets keep first-encounter order. A group container is always the
//! first record of its bucket, even when its members were seen first.

use std::collections::HashMap;

use tracing::debug;

use crate::record::TrackRecord;

/// Records sharing one effective group key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    pub(crate) key: i64,
    // Never empty: buckets are created from a record and only grow.
    pub(crate) records: Vec<TrackRecord>,
}

impl Bucket {
    pub fn new(key: i64, first: TrackRecord) -> Self {
        Self {
            key,
            records: vec![first],
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self) -> &TrackRecord {
        &self.records[0]
    }

    /// The group container heading this bucket, if any.
    pub fn container(&self) -> Option<&TrackRecord> {
        Some(self.head()).filter(|r| r.is_group)
    }

    pub fn has_container(&self) -> bool {
        self.container().is_some()
    }

    /// Add a record, hoisting group containers to the front.
    pub fn add(&mut self, record: TrackRecord) {
        if record.is_group {
            self.records.insert(0, record);
        } else {
            self.records.push(record);
        }
    }
}

/// Buckets keyed by group key, iterated in first-encounter order.
#[derive(Clone, Debug, Default)]
pub struct BucketMap {
    buckets: Vec<Bucket>,
    index: HashMap<i64, usize>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.index.contains_key(&key)
    }

    pub fn get(&self, key: i64) -> Option<&Bucket> {
        self.index.get(&key).map(|i| &self.buckets[*i])
    }

    pub fn get_mut(&mut self, key: i64) -> Option<&mut Bucket> {
        let i = *self.index.get(&key)?;
        Some(&mut self.buckets[i])
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.iter().map(|b| b.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bucket> {
        self.buckets.iter_mut()
    }

    pub fn into_buckets(self) -> Vec<Bucket> {
        self.buckets
    }

    /// Insert a bucket under its key. An existing bucket with the same key
    /// is replaced in place and returned.
    pub fn insert(&mut self, bucket: Bucket) -> Option<Bucket> {
        match self.index.get(&bucket.key) {
            Some(i) => Some(std::mem::replace(&mut self.buckets[*i], bucket)),
            None => {
                self.index.insert(bucket.key, self.buckets.len());
                self.buckets.push(bucket);
                None
            }
        }
    }

    /// Route one record into the bucket for its group key.
    pub fn add(&mut self, record: TrackRecord) {
        let key = record.group_key();
        match self.get_mut(key) {
            Some(bucket) => bucket.add(record),
            None => {
                self.insert(Bucket::new(key, record));
            }
        }
    }
}

impl FromIterator<TrackRecord> for BucketMap {
    fn from_iter<I: IntoIterator<Item = TrackRecord>>(iter: I) -> Self {
        let mut map = BucketMap::new();
        for record in iter {
            map.add(record);
        }
        map
    }
}

/// Bucket one source's records by effective group key.
pub fn aggregate(records: impl IntoIterator<Item = TrackRecord>) -> BucketMap {
    let map: BucketMap = records.into_iter().collect();
    debug!(buckets = map.len(), "aggregated tracks");
    map
}
