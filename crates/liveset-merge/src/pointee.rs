//! Pointee renumbering and next-pointee synchronization.
//!
//! Every element whose `Id` exceeds the reserved threshold is a pointee.
//! After a merge, pointees are renumbered densely from `threshold + 1` in
//! document order; ids at or below the threshold are structural and left
//! alone. The pass rewrites identity only: references between pointers and
//! pointees are assumed to be consistent already.

use liveset_extract::schema::{ID, VALUE};
use liveset_tree::{Document, NodePath};
use tracing::debug;

use crate::error::{MergeError, MergeResult};

/// Renumber every pointee above `threshold`, returning the new high-water
/// mark (the last assigned id plus one).
pub fn renumber_pointees(doc: &mut Document, threshold: i64) -> MergeResult<i64> {
    let path = NodePath::parse(&format!("//*[@{ID}>{threshold}]"))?;
    let pointees = path.select(doc, doc.root());
    if pointees.is_empty() {
        return Err(MergeError::NoPointeesFound { threshold });
    }

    let mut next = threshold + 1;
    for node in &pointees {
        doc.set_attribute(*node, ID, next.to_string())?;
        next += 1;
    }
    debug!(count = pointees.len(), first = threshold + 1, next, "renumbered pointees");
    Ok(next)
}

/// Write `next` into the `Value` of the node at `pattern`.
pub fn sync_next_pointee(doc: &mut Document, pattern: &str, next: i64) -> MergeResult<()> {
    let node = doc
        .select_first(doc.root(), pattern)?
        .ok_or_else(|| MergeError::NextPointeeNotFound(pattern.to_string()))?;
    let previous = doc.attribute(node, VALUE).map(str::to_string);
    doc.set_attribute(node, VALUE, next.to_string())?;
    debug!(previous = ?previous, next, "updated next pointee id");
    Ok(())
}
