use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::tags::{TagHandler, eval_args};
use crate::tpl::Template;
use crate::tpl::engine::Execution;
use crate::value::Value;
use log::debug;

/// Deepest chain of nested includes before rendering is aborted.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// `{% include "header.html" %}` or `{% include page.sidebar %}`
///
/// Resolves the name through the template's locator, compiles the result with
/// the same options and renders it against the current context.
pub struct IncludeTag;

impl TagHandler for IncludeTag {
    fn execute(&self, args: &str, exec: &mut Execution<'_>, ctx: &mut Context) -> Result<String> {
        let name = match eval_args("include", args, exec, ctx)? {
            Value::Str(name) if !name.is_empty() => name,
            other => {
                return Err(TemplateError::Render(format!(
                    "include expects a template name, got '{}'",
                    other
                )));
            }
        };

        if exec.include_depth() >= MAX_INCLUDE_DEPTH {
            return Err(TemplateError::IncludeDepth(MAX_INCLUDE_DEPTH));
        }

        let options = exec.template().options();
        let locator = options.get_locator().ok_or_else(|| {
            TemplateError::Render(format!(
                "Cannot include '{}': no template locator configured",
                name
            ))
        })?;

        let source = locator.resolve(&name)?;
        debug!(
            "Include: '{}' from '{}' (depth {})",
            name,
            exec.template().name(),
            exec.include_depth() + 1
        );

        let included = Template::from_string(&name, &source, options.clone())?;
        included.execute_nested(ctx, exec.include_depth() + 1)
    }
}
