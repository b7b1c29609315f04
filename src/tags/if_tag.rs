use crate::Result;
use crate::context::Context;
use crate::tags::{TagHandler, eval_args};
use crate::tpl::engine::Execution;

const BRANCHES: &[&str] = &["elif", "else", "endif"];

/// `{% if cond %} ... {% elif cond %} ... {% else %} ... {% endif %}`
///
/// Only the taken branch is rendered; the others are skipped without evaluation.
pub struct IfTag;

impl TagHandler for IfTag {
    fn execute(&self, args: &str, exec: &mut Execution<'_>, ctx: &mut Context) -> Result<String> {
        let mut condition = args.to_string();

        loop {
            if eval_args("if", &condition, exec, ctx)?.is_truthy() {
                let (body, stop) = exec.run_until_any_of(ctx, BRANCHES)?;
                if stop.name() != "endif" {
                    exec.skip_until_any_of(&["endif"])?;
                }
                return Ok(body);
            }

            let stop = exec.skip_until_any_of(BRANCHES)?;
            match stop.name() {
                "elif" => condition = stop.args().to_string(),
                "else" => {
                    let (body, _) = exec.run_until_any_of(ctx, &["endif"])?;
                    return Ok(body);
                }
                _ => return Ok(String::new()),
            }
        }
    }

    fn closing_tags(&self) -> &[&'static str] {
        &["endif"]
    }
}

#[cfg(test)]
mod tests {
    use crate::{Context, Template, TemplateOptions};

    fn render(src: &str, ctx: &mut Context) -> String {
        Template::from_string("if", src, TemplateOptions::new().autoescape(false))
            .unwrap()
            .execute(Some(ctx))
            .unwrap()
    }

    #[test]
    fn test_branches() {
        let src = "{% if n > 10 %}big{% elif n > 5 %}medium{% else %}small{% endif %}";
        let mut ctx = Context::new();
        ctx.insert("n", 20);
        assert_eq!(render(src, &mut ctx), "big");
        ctx.insert("n", 7);
        assert_eq!(render(src, &mut ctx), "medium");
        ctx.insert("n", 1);
        assert_eq!(render(src, &mut ctx), "small");
    }

    #[test]
    fn test_no_branch_taken() {
        let mut ctx = Context::new();
        assert_eq!(render("a{% if x %}b{% endif %}c", &mut ctx), "ac");
    }

    #[test]
    fn test_nested_if_in_skipped_branch() {
        let src = "{% if outer %}{% if inner %}I{% endif %}O{% else %}E{% endif %}!";
        let mut ctx = Context::new();
        ctx.insert("outer", false).insert("inner", true);
        assert_eq!(render(src, &mut ctx), "E!");
        ctx.insert("outer", true);
        assert_eq!(render(src, &mut ctx), "IO!");
        ctx.insert("inner", false);
        assert_eq!(render(src, &mut ctx), "O!");
    }

    #[test]
    fn test_untaken_branch_is_not_evaluated() {
        let mut ctx = Context::new();
        ctx.insert("ok", true);
        let src = "{% if ok %}yes{% elif ((( %}never{% else %}{{ a|date }}{% endif %}";
        assert_eq!(render(src, &mut ctx), "yes");
    }

    #[test]
    fn test_missing_endif() {
        let tpl = Template::from_string("if", "{% if true %}body", TemplateOptions::new()).unwrap();
        let err = tpl.execute(None).unwrap_err().to_string();
        assert!(err.contains("No end-node"), "{err}");
        assert!(err.contains("Line 1 Col 1"), "{err}");
    }
}
