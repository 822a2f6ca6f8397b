//! Splitting a document into per-entity fragments.
//!
//! Each extract pattern yields fragments keyed `"{pattern}/{Node}-{Id}.xml"`
//! when it matches several elements, or `"{pattern}/{Node}.xml"` when it
//! matches one. Track matches always use the keyed form and are stamped
//! with a `PreviousTrack` attribute naming the preceding track's id (`-1`
//! for the first), which the merge engine reads back and strips.

use std::collections::BTreeMap;

use liveset_tree::{Document, NodeId};
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::paths::DocumentPaths;
use crate::schema::{ID, NONE_ID, PREVIOUS_TRACK, TRACKS};

/// One extracted entity: a live node inside the source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub key: String,
    /// Name of the extract pattern that produced it.
    pub pattern: String,
    pub node: NodeId,
}

/// Result of [`split`].
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    /// Fragments in pattern order, then document order.
    pub fragments: Vec<Fragment>,
    /// Scalars keyed `"{info}/{Attribute}/{Node}"`.
    pub infos: BTreeMap<String, String>,
}

impl Extraction {
    /// Track nodes in document order.
    pub fn tracks(&self) -> Vec<NodeId> {
        self.fragments_for(TRACKS).map(|f| f.node).collect()
    }

    pub fn fragments_for<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a Fragment> + 'a {
        self.fragments.iter().filter(move |f| f.pattern == pattern)
    }

    pub fn info(&self, key: &str) -> Option<&str> {
        self.infos.get(key).map(String::as_str)
    }

    /// The `NextPointeeId` value captured by the default info table.
    pub fn next_pointee(&self) -> Option<i64> {
        self.info("nextPointer/Value/NextPointeeId")
            .and_then(|v| v.parse().ok())
    }
}

/// Split `doc` into fragments and infos according to `paths`.
///
/// Track nodes are mutated in place (stamped with `PreviousTrack`).
pub fn split(doc: &mut Document, paths: &DocumentPaths) -> ExtractResult<Extraction> {
    let mut extraction = Extraction::default();

    for entry in &paths.extract {
        let nodes: Vec<NodeId> = doc
            .select(doc.root(), &entry.pattern)?
            .into_iter()
            .filter(|n| doc.is_element(*n))
            .collect();
        let is_tracks = entry.name == TRACKS;

        if nodes.len() > 1 || (is_tracks && !nodes.is_empty()) {
            let mut previous: Option<String> = None;
            for (index, node) in nodes.into_iter().enumerate() {
                let name = doc.name(node).unwrap_or_default().to_string();
                let id = doc.attribute(node, ID).map(str::to_string);
                debug!(pattern = %entry.name, node = %name, id = ?id, "extracting");

                if is_tracks {
                    let stamp = previous.clone().unwrap_or_else(|| NONE_ID.to_string());
                    doc.set_attribute(node, PREVIOUS_TRACK, stamp)?;
                    previous = id.clone();
                }

                let suffix = id.unwrap_or_else(|| format!("#{index}"));
                let key = format!("{}/{}-{}.xml", entry.name, name, suffix);
                if extraction.fragments.iter().any(|f| f.key == key) {
                    warn!(%key, "duplicate fragment key");
                }
                extraction.fragments.push(Fragment {
                    key,
                    pattern: entry.name.clone(),
                    node,
                });
            }
        } else if let Some(node) = nodes.first().copied() {
            let name = doc.name(node).unwrap_or_default();
            extraction.fragments.push(Fragment {
                key: format!("{}/{}.xml", entry.name, name),
                pattern: entry.name.clone(),
                node,
            });
        } else {
            debug!(pattern = %entry.name, "no match");
        }
    }

    for info in &paths.infos {
        let nodes: Vec<NodeId> = doc
            .select(doc.root(), &info.pattern)?
            .into_iter()
            .filter(|n| doc.is_element(*n))
            .collect();
        if nodes.is_empty() {
            return Err(ExtractError::InvalidInfoNode {
                name: info.name.clone(),
                pattern: info.pattern.clone(),
            });
        }
        for node in nodes {
            let node_name = doc.name(node).unwrap_or_default();
            for attr in doc.attributes(node) {
                let key = format!("{}/{}/{}", info.name, attr.name, node_name);
                debug!(%key, value = %attr.value, "info");
                extraction.infos.insert(key, attr.value.clone());
            }
        }
    }

    Ok(extraction)
}
