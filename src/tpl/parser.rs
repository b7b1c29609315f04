use crate::Result;
use crate::error::TemplateError;
use crate::expr::Expression;
use crate::expr::filters::ESCAPE_FILTER;
use crate::registry::{Registry, TagKind};
use crate::tpl::ast::{FilterNode, TagNode};
use crate::tpl::position::SourcePosition;

/// Builds the node for the inside of a `{{ ... }}` region.
pub(crate) fn filter_node(
    captured: &str,
    at: SourcePosition,
    registry: &Registry,
    autoescape: bool,
) -> Result<FilterNode> {
    let raw = captured.trim();
    if raw.is_empty() {
        return Err(TemplateError::Syntax("Empty filter".to_string()));
    }

    let mut expression = Expression::compile(raw, registry)?;
    if autoescape {
        if !registry.has_filter(ESCAPE_FILTER) {
            return Err(TemplateError::Syntax(format!(
                "Filter '{}' does not exist",
                ESCAPE_FILTER
            )));
        }
        expression.add_filter(ESCAPE_FILTER);
    }

    Ok(FilterNode {
        at,
        raw: raw.to_string(),
        expression,
    })
}

/// Builds the node for the inside of a `{% ... %}` region.
pub(crate) fn tag_node(captured: &str, at: SourcePosition, registry: &Registry) -> Result<TagNode> {
    let raw = captured.trim();
    if raw.is_empty() {
        return Err(TemplateError::Syntax("Empty tag".to_string()));
    }

    // Example: `if name|lower == "florian"` -> `if` + `name|lower == "florian"`
    let (name, args) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));

    let marker = match registry.tag(name) {
        Some(TagKind::Marker) => true,
        Some(TagKind::Handler(_)) => false,
        None => {
            return Err(TemplateError::Syntax(format!(
                "Tag '{}' does not exist",
                name
            )));
        }
    };

    Ok(TagNode {
        at,
        raw: raw.to_string(),
        name: name.to_string(),
        args: args.trim().to_string(),
        marker,
    })
}
