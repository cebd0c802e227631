//! Abstract Syntax Tree types for skins

use std::collections::BTreeMap;
use std::ops::Range;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Name of the section that holds everything outside explicit subskin markers
pub const MAIN_SUBSKIN: &str = "main";

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Dot-separated macro reference such as `deep.foo.bar`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroPath(pub Vec<String>);

impl MacroPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parse `a.b.c` into segments, rejecting empty or malformed segments
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        for segment in text.split('.') {
            if segment.is_empty() {
                return Err(format!("empty segment in macro path '{}'", text));
            }
            if !is_path_segment(segment) {
                return Err(format!(
                    "invalid segment '{}' in macro path '{}'",
                    segment, text
                ));
            }
            segments.push(segment.to_string());
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The macro's short name, i.e. the last segment
    pub fn name(&self) -> &str {
        self.0.last().map(|s| s.as_str()).unwrap_or("")
    }

    /// All segments before the short name
    pub fn handler_path(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for MacroPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Identifier rule for path segments and subskin names
pub fn is_path_segment(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-')
}

/// A single element of a skin
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Text copied to the output verbatim
    Literal(Spanned<String>),
    /// `<% path attr=value | filter %>`
    Macro(MacroTag),
}

/// A parsed macro tag
#[derive(Debug, Clone, PartialEq)]
pub struct MacroTag {
    pub path: Spanned<MacroPath>,
    pub attributes: Vec<Spanned<Attribute>>,
    pub filters: Vec<Spanned<FilterCall>>,
    /// Tag source including the delimiters
    pub raw: String,
    pub span: Span,
}

/// One attribute of a tag; `name` is `None` for positional values and flags
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Option<String>,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Literal(String),
    /// Macro tags that must be rendered before the value is known
    Fragment(Fragment),
}

/// Nested node list used as an attribute value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

/// `| name attr=value` applied to a macro's output
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub path: Spanned<MacroPath>,
    pub attributes: Vec<Spanned<Attribute>>,
}

/// Node ranges owned by each subskin, keyed by subskin name
pub type SubskinMap = BTreeMap<String, Vec<Range<usize>>>;
