//! Stylesheet tree nodes.

use super::Source;

/// Selector of the sentinel rule standing in for a start marker in CSS text.
pub const START_MARKER_SELECTOR: &str = ".postcss-reexport[data-type=\"start\"]";

/// Selector of the sentinel rule standing in for an end marker in CSS text.
pub const END_MARKER_SELECTOR: &str = ".postcss-reexport[data-type=\"end\"]";

/// Identifies one marked import block across a build pass.
///
/// `SpanId::UNTRACKED` is used for markers read back from CSS text, which
/// carry no recorded imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(pub u32);

impl SpanId {
    /// Span id of markers that were not created by this build pass.
    pub const UNTRACKED: SpanId = SpanId(0);
}

/// Which end of an import block a marker delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// First node of an imported block.
    Start,
    /// Last node of an imported block.
    End,
}

impl MarkerKind {
    /// The sentinel selector used when the marker is printed as CSS.
    pub fn selector(self) -> &'static str {
        match self {
            MarkerKind::Start => START_MARKER_SELECTOR,
            MarkerKind::End => END_MARKER_SELECTOR,
        }
    }

    /// Recognize a sentinel selector.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector.trim() {
            START_MARKER_SELECTOR => Some(MarkerKind::Start),
            END_MARKER_SELECTOR => Some(MarkerKind::End),
            _ => None,
        }
    }
}

/// A boundary marker around inlined import content.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub span: SpanId,
    pub source: Source,
}

/// A qualified rule: `selector { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: String,
    /// Declarations, nested rules and comments.
    pub nodes: Vec<Node>,
    pub source: Source,
}

impl Rule {
    /// Whether this is a `:root` rule.
    pub fn is_root_selector(&self) -> bool {
        self.selector.trim() == ":root"
    }
}

/// An at-rule: `@name params;` or `@name params { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `Some` for container at-rules such as `@media`.
    pub nodes: Option<Vec<Node>>,
    pub source: Source,
}

impl AtRule {
    /// Child nodes, empty for statement at-rules.
    pub fn children(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or(&[])
    }

    /// Whether the first child is a start marker.
    pub fn opens_span(&self) -> bool {
        self.children().first().is_some_and(Node::is_start_marker)
    }

    /// Whether the last child is an end marker.
    pub fn closes_span(&self) -> bool {
        self.children().last().is_some_and(Node::is_end_marker)
    }

    /// Whether any descendant is a marker.
    pub fn contains_markers(&self) -> bool {
        self.children().iter().any(Node::contains_markers)
    }
}

/// A declaration: `prop: value [!important]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub important: bool,
    pub source: Source,
}

/// A comment; its text excludes the `/*` and `*/` delimiters.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub source: Source,
}

/// One parsed CSS construct.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Declaration(Declaration),
    Comment(Comment),
    Marker(Marker),
}

impl Node {
    /// Create a rule.
    pub fn rule(selector: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node::Rule(Rule {
            selector: selector.into(),
            nodes,
            source: Source::default(),
        })
    }

    /// Create a statement at-rule (no block).
    pub fn at_rule(name: impl Into<String>, params: impl Into<String>) -> Self {
        Node::AtRule(AtRule {
            name: name.into(),
            params: params.into(),
            nodes: None,
            source: Source::default(),
        })
    }

    /// Create a container at-rule.
    pub fn container(name: impl Into<String>, params: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node::AtRule(AtRule {
            name: name.into(),
            params: params.into(),
            nodes: Some(nodes),
            source: Source::default(),
        })
    }

    /// Create a declaration.
    pub fn decl(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Node::Declaration(Declaration {
            prop: prop.into(),
            value: value.into(),
            important: false,
            source: Source::default(),
        })
    }

    /// Create a comment.
    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment(Comment {
            text: text.into(),
            source: Source::default(),
        })
    }

    /// Create a boundary marker.
    pub fn marker(kind: MarkerKind, span: SpanId, source: Source) -> Self {
        Node::Marker(Marker { kind, span, source })
    }

    /// Replace the source reference, builder style.
    pub fn with_source(mut self, source: Source) -> Self {
        *self.source_mut() = source;
        self
    }

    /// The node's source reference.
    pub fn source(&self) -> &Source {
        match self {
            Node::Rule(r) => &r.source,
            Node::AtRule(a) => &a.source,
            Node::Declaration(d) => &d.source,
            Node::Comment(c) => &c.source,
            Node::Marker(m) => &m.source,
        }
    }

    /// Mutable access to the node's source reference.
    pub fn source_mut(&mut self) -> &mut Source {
        match self {
            Node::Rule(r) => &mut r.source,
            Node::AtRule(a) => &mut a.source,
            Node::Declaration(d) => &mut d.source,
            Node::Comment(c) => &mut c.source,
            Node::Marker(m) => &mut m.source,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Node::Marker(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_at_rule(&self) -> Option<&AtRule> {
        match self {
            Node::AtRule(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_start_marker(&self) -> bool {
        matches!(self, Node::Marker(m) if m.kind == MarkerKind::Start)
    }

    pub fn is_end_marker(&self) -> bool {
        matches!(self, Node::Marker(m) if m.kind == MarkerKind::End)
    }

    /// Whether this is an at-rule named `name` (case-insensitive).
    pub fn is_at_rule_named(&self, name: &str) -> bool {
        matches!(self, Node::AtRule(a) if a.name.eq_ignore_ascii_case(name))
    }

    /// Whether this node is or contains a marker.
    pub fn contains_markers(&self) -> bool {
        match self {
            Node::Marker(_) => true,
            Node::AtRule(a) => a.contains_markers(),
            Node::Rule(r) => r.nodes.iter().any(Node::contains_markers),
            Node::Declaration(_) | Node::Comment(_) => false,
        }
    }
}
