use crate::Result;
use crate::context::Context;
use crate::tags::TagHandler;
use crate::tpl::engine::Execution;

/// `{% comment %} ... {% endcomment %}`: the body is skipped, never rendered.
pub struct CommentTag;

impl TagHandler for CommentTag {
    fn execute(&self, _args: &str, exec: &mut Execution<'_>, _ctx: &mut Context) -> Result<String> {
        exec.skip_until_any_of(&["endcomment"])?;
        Ok(String::new())
    }

    fn closing_tags(&self) -> &[&'static str] {
        &["endcomment"]
    }
}
