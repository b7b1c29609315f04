//! Tag handlers and the built-in tags.
//!
//! A tag is looked up by name when a template is parsed and its handler is called
//! when the cursor reaches it. Block tags such as `if` and `for` consume their own
//! bodies through [`Execution::run_until_any_of`] and
//! [`Execution::skip_until_any_of`], leaving the cursor on their closing marker.

mod comment;
mod for_tag;
mod if_tag;
mod include;
mod set;

pub use comment::CommentTag;
pub use for_tag::ForTag;
pub use if_tag::IfTag;
pub use include::{IncludeTag, MAX_INCLUDE_DEPTH};
pub use set::SetTag;

use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::expr::Expression;
use crate::registry::Registry;
use crate::tpl::engine::Execution;
use crate::value::Value;

/// Behaviour behind a `{% name args %}` tag.
pub trait TagHandler: Send + Sync {
    /// Renders the tag. `args` is the text after the tag name, unparsed.
    fn execute(&self, args: &str, exec: &mut Execution<'_>, ctx: &mut Context) -> Result<String>;

    /// Called instead of [`execute`](TagHandler::execute) when the tag lies inside a
    /// body that an enclosing tag skips.
    fn on_skip(&self, _args: &str, _exec: &Execution<'_>) {}

    /// Markers that close a block opened by this tag (e.g. `endif`). Declaring them
    /// lets skipping step over nested blocks of the same kind.
    fn closing_tags(&self) -> &[&'static str] {
        &[]
    }
}

pub(crate) fn register_builtins(registry: &Registry) {
    registry.register_tag("if", IfTag);
    registry.register_tag("for", ForTag);
    registry.register_tag("include", IncludeTag);
    registry.register_tag("set", SetTag);
    registry.register_tag("comment", CommentTag);

    for marker in ["elif", "else", "endif", "empty", "endfor", "endcomment"] {
        registry.register_marker(marker);
    }
}

/// Compiles and evaluates a tag argument expression.
pub(crate) fn eval_args(tag: &str, src: &str, exec: &Execution<'_>, ctx: &Context) -> Result<Value> {
    if src.is_empty() {
        return Err(TemplateError::Render(format!(
            "'{}' requires an expression",
            tag
        )));
    }
    Expression::compile(src, exec.registry())?.evaluate(ctx, exec.registry())
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
