//! Merge engine for Live sets.
//!
//! Reconciles the tracks of two sets into one document:
//!
//! - **Classification**: each track node becomes a [`TrackRecord`] carrying
//!   its id, predecessor, enclosing group, and source.
//! - **Aggregation**: records are bucketed by effective group key, group
//!   containers always first.
//! - **Conflict resolution**: incoming groups and tracks that clash with the
//!   base get fresh ids and a `conflict-` name prefix.
//! - **Reconstruction**: buckets are reordered depth-first so every group
//!   precedes its members, then written back under the track container.
//! - **Pointee renumbering**: ids above the reserved threshold are made
//!   dense again and the next free id is stored in the document.
//!
//! Track records hold [`liveset_tree::NodeId`] handles into the document
//! arena, so nodes can be moved between parents without copying.

pub mod bucket;
pub mod combine;
pub mod config;
pub mod error;
pub mod forest;
pub mod merger;
pub mod pointee;
pub mod record;
pub mod resolve;

#[cfg(test)]
mod testing;

pub use bucket::{aggregate, Bucket, BucketMap};
pub use combine::combine_documents;
pub use config::MergeConfig;
pub use error::{MergeError, MergeResult};
pub use forest::{combine_buckets, flatten, order_forest, reassemble};
pub use merger::{merge_into, merge_tracks, MergeReport};
pub use pointee::{renumber_pointees, sync_next_pointee};
pub use record::{classify, classify_tracks, ClassifiedTracks, Source, TrackRecord};
pub use resolve::{resolve_conflicts, Conflict, IdAllocator, RemapTable, Resolution};
