//! Parsed skins
//!
//! A [`Skin`] is the immutable result of parsing one template source. It is
//! created once, can be cached and shared between threads, and rendered any
//! number of times against different [`RenderContext`](crate::RenderContext)s.

use std::ops::Range;

use crate::error::ParseError;
use crate::parser::{parse_document, Node, SubskinMap, MAIN_SUBSKIN};

/// Name used in diagnostics for skins created from a bare string
pub const INLINE_SKIN_NAME: &str = "<inline>";

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    name: Option<String>,
    source: String,
    nodes: Vec<Node>,
    subskins: SubskinMap,
}

impl Skin {
    /// Parse an anonymous skin
    pub fn parse(source: &str) -> Result<Self, Vec<ParseError>> {
        let parsed = parse_document(source)?;
        Ok(Self {
            name: None,
            source: source.to_string(),
            nodes: parsed.nodes,
            subskins: parsed.subskins,
        })
    }

    /// Parse a skin that is identified by `name` in error messages
    pub fn parse_named(name: impl Into<String>, source: &str) -> Result<Self, Vec<ParseError>> {
        let mut skin = Self::parse(source)?;
        skin.name = Some(name.into());
        Ok(skin)
    }

    /// Name given at parse time, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for diagnostics; anonymous skins report as `<inline>`
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(INLINE_SKIN_NAME)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Check if a subskin with this name exists
    pub fn has_subskin(&self, name: &str) -> bool {
        self.subskins.contains_key(name)
    }

    /// Names of all subskins, `main` included
    pub fn subskin_names(&self) -> impl Iterator<Item = &str> {
        self.subskins.keys().map(|s| s.as_str())
    }

    /// Nodes belonging to a subskin, in source order
    pub fn subskin_nodes(&self, name: &str) -> Option<impl Iterator<Item = &Node> + '_> {
        let ranges: &Vec<Range<usize>> = self.subskins.get(name)?;
        Some(
            ranges
                .iter()
                .flat_map(move |range| self.nodes[range.clone()].iter()),
        )
    }

    /// Nodes of the `main` section
    pub fn main_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.subskins
            .get(MAIN_SUBSKIN)
            .into_iter()
            .flatten()
            .flat_map(move |range| self.nodes[range.clone()].iter())
    }
}

impl std::str::FromStr for Skin {
    type Err = Vec<ParseError>;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}
