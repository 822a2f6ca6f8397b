//! Fixture builders shared by the unit tests.

use liveset_tree::{Document, NodeId};

#[derive(Clone, Debug)]
pub(crate) struct TrackFixture {
    pub kind: &'static str,
    pub id: i64,
    pub group: i64,
    pub user_name: String,
    pub effective_name: String,
}

pub(crate) fn group(id: i64, parent: i64, name: &str) -> TrackFixture {
    TrackFixture {
        kind: "GroupTrack",
        id,
        group: parent,
        user_name: name.into(),
        effective_name: format!("{id}-Group"),
    }
}

pub(crate) fn audio(id: i64, group: i64, name: &str) -> TrackFixture {
    TrackFixture {
        kind: "AudioTrack",
        id,
        group,
        user_name: name.into(),
        effective_name: format!("{id}-Audio"),
    }
}

pub(crate) fn track_xml(track: &TrackFixture) -> String {
    format!(
        r#"<{kind} Id="{id}"><LomId Value="0"/><Name><EffectiveName Value="{effective}"/><UserName Value="{user}"/></Name><TrackGroupId Value="{group}"/></{kind}>"#,
        kind = track.kind,
        id = track.id,
        effective = track.effective_name,
        user = track.user_name,
        group = track.group,
    )
}

pub(crate) fn live_set_xml(tracks: &[TrackFixture]) -> String {
    let body: String = tracks.iter().map(track_xml).collect();
    format!(
        r#"<Ableton MajorVersion="5" Creator="Ableton Live 11.3"><LiveSet><NextPointeeId Value="1"/><Tracks>{body}</Tracks><MasterTrack><AutomationTarget Id="5000"/><ModulationTarget Id="5001"/></MasterTrack></LiveSet></Ableton>"#
    )
}

/// A destination set holding `base` tracks, plus detached copies of
/// `incoming` tracks flagged with the merge marker. Returns the destination
/// and every track node (base first, document order).
pub(crate) fn merge_fixture(base: &[TrackFixture], incoming: &[TrackFixture]) -> (Document, Vec<NodeId>) {
    let mut doc = Document::parse(&live_set_xml(base)).unwrap();
    let mut tracks = doc.select(doc.root(), "/Ableton/LiveSet/Tracks/*").unwrap();

    let source = Document::parse(&live_set_xml(incoming)).unwrap();
    for node in source.select(source.root(), "/Ableton/LiveSet/Tracks/*").unwrap() {
        let copy = doc.import(&source, node).unwrap();
        doc.set_attribute(copy, "Merged", "true").unwrap();
        tracks.push(copy);
    }
    (doc, tracks)
}

pub(crate) fn user_name(doc: &Document, track: NodeId) -> String {
    let node = doc.select_first(track, "Name/UserName").unwrap().unwrap();
    doc.attribute(node, "Value").unwrap().to_string()
}

pub(crate) fn group_value(doc: &Document, track: NodeId) -> i64 {
    let node = doc.select_first(track, "TrackGroupId").unwrap().unwrap();
    doc.attribute_i64(node, "Value").unwrap().unwrap()
}

/// `(element name, Id)` of every track under the container, in order.
pub(crate) fn track_listing(doc: &Document) -> Vec<(String, i64)> {
    doc.select(doc.root(), "/Ableton/LiveSet/Tracks/*")
        .unwrap()
        .into_iter()
        .map(|n| {
            (
                doc.name(n).unwrap().to_string(),
                doc.attribute_i64(n, "Id").unwrap().unwrap(),
            )
        })
        .collect()
}
