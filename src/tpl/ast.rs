use crate::expr::Expression;
use crate::tpl::position::SourcePosition;

/// One parsed unit of a template.
#[derive(Debug, Clone)]
pub enum Node {
    Content(ContentNode),
    Filter(FilterNode),
    Tag(TagNode),
}

impl Node {
    pub fn position(&self) -> SourcePosition {
        match self {
            Node::Content(n) => n.at,
            Node::Filter(n) => n.at,
            Node::Tag(n) => n.at,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }

    pub fn column(&self) -> usize {
        self.position().column
    }

    /// The node's source text: literal text, or the trimmed inside of `{{ }}` / `{% %}`.
    pub fn raw(&self) -> &str {
        match self {
            Node::Content(n) => &n.text,
            Node::Filter(n) => &n.raw,
            Node::Tag(n) => &n.raw,
        }
    }

    pub fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Node::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Literal text, emitted verbatim.
#[derive(Debug, Clone)]
pub struct ContentNode {
    pub(crate) at: SourcePosition,
    pub(crate) text: String,
}

impl ContentNode {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `{{ expression|filters }}`
#[derive(Debug, Clone)]
pub struct FilterNode {
    pub(crate) at: SourcePosition,
    pub(crate) raw: String,
    pub(crate) expression: Expression,
}

impl FilterNode {
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// `{% name args %}`
///
/// The handler is not stored; `name` is the key it is looked up by at render time.
#[derive(Debug, Clone)]
pub struct TagNode {
    pub(crate) at: SourcePosition,
    pub(crate) raw: String,
    pub(crate) name: String,
    pub(crate) args: String,
    pub(crate) marker: bool,
}

impl TagNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument text after the name, trimmed but otherwise unparsed.
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Whether the name resolved to a marker when the template was parsed.
    pub fn is_marker(&self) -> bool {
        self.marker
    }

    pub fn position(&self) -> SourcePosition {
        self.at
    }
}
