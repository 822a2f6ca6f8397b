use serde::{Deserialize, Serialize};

use crate::schema::TRACKS;

/// A named structural pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPath {
    pub name: String,
    pub pattern: String,
}

impl NamedPath {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Where things live inside a Live set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPaths {
    /// Entity patterns split into fragments, in extraction order.
    pub extract: Vec<NamedPath>,
    /// Document-level scalars captured alongside the fragments.
    pub infos: Vec<NamedPath>,
    /// The container whose children are the tracks.
    pub tracks_container: String,
    /// The node holding the next free pointee id.
    pub next_pointee: String,
    /// Tempo locations, tried in order (the layout moved in Live 10).
    pub tempo: Vec<String>,
    pub key: String,
    /// The root element carrying creator and version attributes.
    pub version: String,
}

impl Default for DocumentPaths {
    fn default() -> Self {
        Self {
            extract: vec![
                NamedPath::new(TRACKS, "/Ableton/LiveSet/Tracks/*"),
                NamedPath::new("MasterTrack", "/Ableton/LiveSet/MasterTrack"),
                NamedPath::new("PreHearTrack", "/Ableton/LiveSet/PreHearTrack"),
                NamedPath::new("Scenes", "/Ableton/LiveSet/Scenes/*"),
                NamedPath::new("Locators", "/Ableton/LiveSet/Locators"),
            ],
            infos: vec![NamedPath::new(
                "nextPointer",
                "/Ableton/LiveSet/NextPointeeId[@Value]",
            )],
            tracks_container: "/Ableton/LiveSet/Tracks".into(),
            next_pointee: "/Ableton/LiveSet/NextPointeeId".into(),
            tempo: vec![
                "/Ableton/LiveSet/Tempo[@Value]".into(),
                "/Ableton/LiveSet/MasterTrack/DeviceChain/Mixer/Tempo/Manual[@Value]".into(),
            ],
            key: "/Ableton/LiveSet/Key[@Value]".into(),
            version: "/Ableton[@*]".into(),
        }
    }
}

impl DocumentPaths {
    /// The pattern registered for the track list, if any.
    pub fn tracks_pattern(&self) -> Option<&str> {
        self.extract
            .iter()
            .find(|p| p.name == TRACKS)
            .map(|p| p.pattern.as_str())
    }
}
