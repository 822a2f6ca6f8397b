//! Known attribute names and typed accessors for track nodes.
//!
//! Tracks are plain elements; everything this crate and the merge engine
//! need from them goes through these accessors. Attributes not named here
//! are carried along untouched.

use liveset_tree::{Document, NodeId, TreeResult};

/// Identifier attribute on tracks and every pointee.
pub const ID: &str = "Id";
/// Scalar payload attribute used by most Live value nodes.
pub const VALUE: &str = "Value";
/// Temporary predecessor stamp added by [`crate::split`].
pub const PREVIOUS_TRACK: &str = "PreviousTrack";
/// Default marker attribute flagging tracks from the incoming set.
pub const MERGE_MARKER: &str = "Merged";
/// Element name of a group container track.
pub const GROUP_TRACK: &str = "GroupTrack";
/// Name of the extract pattern holding the track list.
pub const TRACKS: &str = "Tracks";

/// Relative pattern for a track's enclosing-group node.
pub const TRACK_GROUP_ID: &str = "TrackGroupId[@Value]";
/// Relative pattern for the user-assigned track name.
pub const USER_NAME: &str = "Name/UserName[@Value]";
/// Relative pattern for the name Live generates when no user name is set.
pub const EFFECTIVE_NAME: &str = "Name/EffectiveName[@Value]";

/// Sentinel for "no predecessor" and "no group".
pub const NONE_ID: i64 = -1;

/// The track's `Id` attribute as an integer.
pub fn track_id(doc: &Document, track: NodeId) -> TreeResult<Option<i64>> {
    doc.attribute_i64(track, ID)
}

/// The track's `PreviousTrack` stamp, or `-1` when it was never stamped.
pub fn previous_track(doc: &Document, track: NodeId) -> TreeResult<i64> {
    Ok(doc.attribute_i64(track, PREVIOUS_TRACK)?.unwrap_or(NONE_ID))
}

/// The node holding the track's group membership.
pub fn group_id_node(doc: &Document, track: NodeId) -> TreeResult<Option<NodeId>> {
    doc.select_first(track, TRACK_GROUP_ID)
}

/// Whether the element is a group container.
pub fn is_group_track(doc: &Document, track: NodeId) -> bool {
    doc.name(track) == Some(GROUP_TRACK)
}

/// The name shown in Live: the user name when set, else the generated one.
pub fn display_name(doc: &Document, track: NodeId) -> TreeResult<Option<String>> {
    let user = doc
        .select_first(track, USER_NAME)?
        .and_then(|n| doc.attribute(n, VALUE))
        .filter(|v| !v.is_empty());
    if let Some(user) = user {
        return Ok(Some(user.to_string()));
    }
    Ok(doc
        .select_first(track, EFFECTIVE_NAME)?
        .and_then(|n| doc.attribute(n, VALUE))
        .map(str::to_string))
}
