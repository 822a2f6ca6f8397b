//! Read-only project summaries for inspection.

use std::collections::BTreeMap;

use liveset_tree::Document;
use serde::Serialize;

use crate::error::ExtractResult;
use crate::paths::DocumentPaths;
use crate::schema::{self, VALUE};

/// One line of the track listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    pub kind: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub group_id: Option<i64>,
}

/// What `inspect` reports about a set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    /// Attributes of the root element (creator, schema versions).
    pub version: BTreeMap<String, String>,
    pub tempo: Option<String>,
    pub key: Option<String>,
    pub next_pointee_id: Option<i64>,
    pub tracks: Vec<TrackSummary>,
}

impl ProjectSummary {
    pub fn creator(&self) -> Option<&str> {
        self.version.get("Creator").map(String::as_str)
    }
}

/// Summarize a set. Values are reported as found; nothing is range-checked.
pub fn analyse(doc: &Document, paths: &DocumentPaths) -> ExtractResult<ProjectSummary> {
    let root = doc.root();
    let mut summary = ProjectSummary::default();

    if let Some(node) = doc.select_first(root, &paths.version)? {
        for attr in doc.attributes(node) {
            summary.version.insert(attr.name.clone(), attr.value.clone());
        }
    }

    for pattern in &paths.tempo {
        if let Some(node) = doc.select_first(root, pattern)? {
            summary.tempo = doc.attribute(node, VALUE).map(str::to_string);
            break;
        }
    }

    summary.key = doc
        .select_first(root, &paths.key)?
        .and_then(|n| doc.attribute(n, VALUE))
        .map(str::to_string);

    summary.next_pointee_id = match doc.select_first(root, &paths.next_pointee)? {
        Some(node) => doc.attribute_i64(node, VALUE)?,
        None => None,
    };

    if let Some(pattern) = paths.tracks_pattern() {
        for track in doc.select(root, pattern)? {
            if !doc.is_element(track) {
                continue;
            }
            let group_id = match schema::group_id_node(doc, track)? {
                Some(node) => doc.attribute_i64(node, VALUE)?,
                None => None,
            };
            summary.tracks.push(TrackSummary {
                kind: doc.name(track).unwrap_or_default().to_string(),
                id: schema::track_id(doc, track)?,
                name: schema::display_name(doc, track)?,
                group_id,
            });
        }
    }

    Ok(summary)
}
