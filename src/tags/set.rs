use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::tags::{TagHandler, eval_args, is_identifier};
use crate::tpl::engine::Execution;

/// `{% set name = expression %}`
///
/// Inside a loop body the binding is scoped to the current iteration; otherwise
/// it lands in the root context and stays visible for the rest of the render.
pub struct SetTag;

impl TagHandler for SetTag {
    fn execute(&self, args: &str, exec: &mut Execution<'_>, ctx: &mut Context) -> Result<String> {
        let (name, expr) = args
            .split_once('=')
            .map(|(n, e)| (n.trim(), e.trim()))
            .filter(|(n, _)| is_identifier(n))
            .ok_or_else(|| {
                TemplateError::Render(format!(
                    "Invalid set '{}', expected 'name = expression'",
                    args
                ))
            })?;

        let value = eval_args("set", expr, exec, ctx)?;
        ctx.set(name, value);
        Ok(String::new())
    }
}
