//! Structural path patterns for locating nodes.
//!
//! A small XPath subset, enough to address the parts of a Live set:
//!
//! ```text
//! /Ableton/LiveSet/Tracks/*                 children of <Tracks>
//! /Ableton/LiveSet/NextPointeeId[@Value]    element carrying an attribute
//! /Ableton[@*]                              element with any attribute
//! //*[@Id>1000]                             every element with Id above 1000
//! Name/UserName                             relative to a context node
//! .//TrackGroupId[@Value]                   any depth below the context node
//! ```
//!
//! Results are always in document order, without duplicates.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::document::{Document, NodeId};
use crate::error::{TreeError, TreeResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NameTest {
    Any,
    Named(String),
}

/// A filter applied to the nodes a step selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// `[@Name]`
    HasAttribute(String),
    /// `[@*]`
    AnyAttribute,
    /// `[@Name=value]` or `[@Name='value']`
    AttributeEquals(String, String),
    /// `[@Name>N]`, comparing the attribute as an integer.
    AttributeGreaterThan(String, i64),
}

impl Predicate {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Predicate::HasAttribute(name) => doc.has_attribute(node, name),
            Predicate::AnyAttribute => !doc.attributes(node).is_empty(),
            Predicate::AttributeEquals(name, value) => {
                doc.attribute(node, name) == Some(value.as_str())
            }
            Predicate::AttributeGreaterThan(name, bound) => doc
                .attribute(node, name)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .is_some_and(|v| v > *bound),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(name) = doc.name(node) else {
            return false;
        };
        let name_ok = match &self.test {
            NameTest::Any => true,
            NameTest::Named(expected) => expected == name,
        };
        name_ok && self.predicates.iter().all(|p| p.matches(doc, node))
    }
}

/// A parsed path pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl NodePath {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> TreeResult<Self> {
        let invalid = |reason: &str| TreeError::InvalidPath {
            path: pattern.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty pattern"));
        }

        let absolute = trimmed.starts_with('/');
        let mut rest = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if !absolute && rest.is_empty() {
            return Err(invalid("pattern selects nothing"));
        }

        let mut steps = Vec::new();
        let mut first = true;
        while !rest.is_empty() {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                Axis::Child
            } else if first {
                Axis::Child
            } else {
                return Err(invalid("expected '/' between steps"));
            };
            first = false;

            let end = step_end(rest).ok_or_else(|| invalid("unbalanced '['"))?;
            let (raw, tail) = rest.split_at(end);
            rest = tail;
            steps.push(parse_step(raw, axis).map_err(|reason| invalid(&reason))?);
        }

        if steps.is_empty() {
            return Err(invalid("pattern selects nothing"));
        }

        Ok(Self {
            source: trimmed.to_string(),
            absolute,
            steps,
        })
    }

    /// Whether the pattern starts at the document root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Select every match, in document order.
    ///
    /// Absolute patterns ignore `context` and start at the document root.
    pub fn select(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let mut current = vec![if self.absolute { doc.root() } else { context }];
        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                let candidates = match step.axis {
                    Axis::Child => doc.children(*node).to_vec(),
                    Axis::Descendant => doc.descendants(*node),
                };
                for candidate in candidates {
                    if step.matches(doc, candidate) && seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// The first match in document order.
    pub fn select_first(&self, doc: &Document, context: NodeId) -> Option<NodeId> {
        self.select(doc, context).into_iter().next()
    }
}

impl FromStr for NodePath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Byte offset where the current step ends: the next `/` outside brackets.
fn step_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            '/' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    (depth == 0).then_some(s.len())
}

fn parse_step(raw: &str, axis: Axis) -> Result<Step, String> {
    let (name, mut preds) = match raw.find('[') {
        Some(i) => raw.split_at(i),
        None => (raw, ""),
    };
    let test = match name {
        "" => return Err("empty step".into()),
        "*" => NameTest::Any,
        other if other.chars().any(|c| "[]@=<>'\" ".contains(c)) => {
            return Err(format!("invalid name test '{other}'"))
        }
        other => NameTest::Named(other.to_string()),
    };

    let mut predicates = Vec::new();
    while !preds.is_empty() {
        let body_end = preds
            .find(']')
            .ok_or_else(|| "unterminated predicate".to_string())?;
        let body = preds[1..body_end].trim();
        predicates.push(parse_predicate(body)?);
        preds = &preds[body_end + 1..];
        if !preds.is_empty() && !preds.starts_with('[') {
            return Err(format!("unexpected text after predicate: '{preds}'"));
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(body: &str) -> Result<Predicate, String> {
    let attr = body
        .strip_prefix('@')
        .ok_or_else(|| format!("only attribute predicates are supported: '{body}'"))?;
    if attr == "*" {
        return Ok(Predicate::AnyAttribute);
    }
    if let Some((name, bound)) = attr.split_once('>') {
        let bound = bound
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{bound}' is not an integer"))?;
        return Ok(Predicate::AttributeGreaterThan(name.trim().to_string(), bound));
    }
    if let Some((name, value)) = attr.split_once('=') {
        let value = value.trim();
        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
            .unwrap_or(value);
        return Ok(Predicate::AttributeEquals(name.trim().to_string(), value.to_string()));
    }
    if attr.is_empty() {
        return Err("empty attribute name".into());
    }
    Ok(Predicate::HasAttribute(attr.to_string()))
}

impl Document {
    /// Parse `pattern` and select all matches from `context`.
    pub fn select(&self, context: NodeId, pattern: &str) -> TreeResult<Vec<NodeId>> {
        Ok(NodePath::parse(pattern)?.select(self, context))
    }

    /// Parse `pattern` and return its first match from `context`.
    pub fn select_first(&self, context: NodeId, pattern: &str) -> TreeResult<Option<NodeId>> {
        Ok(NodePath::parse(pattern)?.select_first(self, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> Document {
        Document::parse(
            r#"<Ableton MajorVersion="5">
                <LiveSet>
                    <NextPointeeId Value="3000"/>
                    <Tracks>
                        <GroupTrack Id="81">
                            <Name><UserName Value="Drums"/></Name>
                            <TrackGroupId Value="-1"/>
                        </GroupTrack>
                        <AudioTrack Id="8">
                            <TrackGroupId Value="81"/>
                            <DeviceChain><Sample Id="1500"/></DeviceChain>
                        </AudioTrack>
                    </Tracks>
                    <Locators Id="5"/>
                </LiveSet>
            </Ableton>"#,
        )
        .unwrap()
    }

    fn names(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| doc.name(*n).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn absolute_wildcard_selects_children_in_order() {
        let doc = set();
        let tracks = doc.select(doc.root(), "/Ableton/LiveSet/Tracks/*").unwrap();
        assert_eq!(names(&doc, &tracks), vec!["GroupTrack", "AudioTrack"]);
    }

    #[test]
    fn attribute_presence_predicate() {
        let doc = set();
        let hits = doc
            .select(doc.root(), "/Ableton/LiveSet/NextPointeeId[@Value]")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(doc
            .select(doc.root(), "/Ableton/LiveSet/NextPointeeId[@Missing]")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn any_attribute_predicate() {
        let doc = set();
        assert_eq!(doc.select(doc.root(), "/Ableton[@*]").unwrap().len(), 1);
        assert!(doc.select(doc.root(), "/Ableton/LiveSet[@*]").unwrap().is_empty());
    }

    #[test]
    fn greater_than_selects_in_document_order() {
        let doc = set();
        let hits = doc.select(doc.root(), "//*[@Id>50]").unwrap();
        let ids: Vec<_> = hits.iter().map(|n| doc.attribute(*n, "Id").unwrap()).collect();
        assert_eq!(ids, vec!["81", "1500"]);
    }

    #[test]
    fn relative_path_from_context() {
        let doc = set();
        let group = doc.select_first(doc.root(), "//GroupTrack").unwrap().unwrap();
        let user = doc.select_first(group, "Name/UserName").unwrap().unwrap();
        assert_eq!(doc.attribute(user, "Value"), Some("Drums"));
    }

    #[test]
    fn relative_descendant_from_context() {
        let doc = set();
        let audio = doc.select_first(doc.root(), "//AudioTrack").unwrap().unwrap();
        let sample = doc.select(audio, ".//Sample[@Id]").unwrap();
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn equals_predicate_strips_quotes() {
        let doc = set();
        let hits = doc.select(doc.root(), "//*[@Id='8']").unwrap();
        assert_eq!(names(&doc, &hits), vec!["AudioTrack"]);
    }

    #[test]
    fn nested_descendant_contexts_do_not_duplicate() {
        let doc = Document::parse("<A><B><B><C/></B></B></A>").unwrap();
        let hits = doc.select(doc.root(), "//B//C").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        for bad in ["", "   ", "/A[@Id", "/A[Id]", "/A[@Id>x]", "/A//", "."] {
            assert!(
                matches!(NodePath::parse(bad), Err(TreeError::InvalidPath { .. })),
                "pattern {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips_source() {
        let path: NodePath = "/Ableton/LiveSet/Tracks/*".parse().unwrap();
        assert_eq!(path.to_string(), "/Ableton/LiveSet/Tracks/*");
        assert!(path.is_absolute());
    }
}
