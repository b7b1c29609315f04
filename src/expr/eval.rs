use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::expr::{Expr, Op};
use crate::registry::Registry;
use crate::value::Value;
use std::cmp::Ordering;

pub(crate) fn eval(expr: &Expr, ctx: &Context, registry: &Registry) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => Ok(ctx.lookup(name).clone()),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, ctx, registry)?.is_truthy())),
        Expr::Binary(Op::And, left, right) => Ok(Value::Bool(
            eval(left, ctx, registry)?.is_truthy() && eval(right, ctx, registry)?.is_truthy(),
        )),
        Expr::Binary(Op::Or, left, right) => Ok(Value::Bool(
            eval(left, ctx, registry)?.is_truthy() || eval(right, ctx, registry)?.is_truthy(),
        )),
        Expr::Binary(op, left, right) => {
            let l_val = eval(left, ctx, registry)?;
            let r_val = eval(right, ctx, registry)?;
            Ok(Value::Bool(compare(*op, &l_val, &r_val)))
        }
        Expr::Filtered(base, filters) => {
            let mut value = eval(base, ctx, registry)?;
            for call in filters {
                let filter = registry.filter(&call.name).ok_or_else(|| {
                    TemplateError::Expression(format!("Filter '{}' does not exist", call.name))
                })?;
                let arg = match &call.arg {
                    Some(arg) => Some(eval(arg, ctx, registry)?),
                    None => None,
                };
                value = filter.apply(value, arg).map_err(|e| {
                    TemplateError::Expression(format!("Filter '{}' failed: {}", call.name, e))
                })?;
            }
            Ok(value)
        }
    }
}

fn ordering(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        (Value::DateTime(l), Value::DateTime(r)) => Some(l.cmp(r)),
        _ => l.as_f64().zip(r.as_f64()).and_then(|(l, r)| l.partial_cmp(&r)),
    }
}

/// Equality with ints compared exactly; a float on either side compares as `f64`.
fn equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            l.as_f64() == r.as_f64()
        }
        _ => l == r,
    }
}

/// Numbers compare numerically across int/float; incomparable operands are never
/// ordered, so `<`-style operators yield `false` for them.
fn compare(op: Op, l: &Value, r: &Value) -> bool {
    match op {
        Op::Eq => equals(l, r),
        Op::Ne => !equals(l, r),
        Op::Gt => ordering(l, r).is_some_and(Ordering::is_gt),
        Op::Ge => ordering(l, r).is_some_and(Ordering::is_ge),
        Op::Lt => ordering(l, r).is_some_and(Ordering::is_lt),
        Op::Le => ordering(l, r).is_some_and(Ordering::is_le),
        Op::And | Op::Or => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;

    fn eval_str(src: &str, ctx: &Context) -> Value {
        let registry = Registry::new();
        Expression::compile(src, &registry)
            .unwrap()
            .evaluate(ctx, &registry)
            .unwrap()
    }

    #[test]
    fn test_eval_expr_logic() {
        let mut ctx = Context::new();
        ctx.insert("a", 10).insert("b", true).insert("name", "Florian");

        assert_eq!(eval_str("a == 10", &ctx), Value::Bool(true));
        assert_eq!(eval_str("a == 10.0", &ctx), Value::Bool(true));
        assert_eq!(eval_str("a > 5", &ctx), Value::Bool(true));
        assert_eq!(eval_str("a <= 5", &ctx), Value::Bool(false));
        assert_eq!(eval_str("b and a != 3", &ctx), Value::Bool(true));
        assert_eq!(eval_str("not b or missing", &ctx), Value::Bool(false));
        assert_eq!(
            eval_str(r#"name|lower == "florian""#, &ctx),
            Value::Bool(true)
        );
        assert_eq!(eval_str(r#""abc" < "abd""#, &ctx), Value::Bool(true));
    }

    #[test]
    fn test_incomparable_values_are_not_ordered() {
        let ctx = Context::new();
        assert_eq!(eval_str(r#"1 < "2""#, &ctx), Value::Bool(false));
        assert_eq!(eval_str("missing > 0", &ctx), Value::Bool(false));
        assert_eq!(eval_str("missing == null", &ctx), Value::Bool(true));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let mut ctx = Context::new();
        ctx.insert("a", i64::MAX).insert("b", i64::MAX - 1);
        assert_eq!(eval_str("a == b", &ctx), Value::Bool(false));
        assert_eq!(eval_str("a != b", &ctx), Value::Bool(true));
        assert_eq!(eval_str("a > b", &ctx), Value::Bool(true));
        assert_eq!(eval_str("a == a", &ctx), Value::Bool(true));
        assert_eq!(
            eval_str("9007199254740993 == 9007199254740992", &ctx),
            Value::Bool(false)
        );
        assert_eq!(eval_str("0.1 == 0.1", &ctx), Value::Bool(true));
        assert_eq!(eval_str("2 == 2.5", &ctx), Value::Bool(false));
    }

    #[test]
    fn test_filter_error_names_the_filter() {
        let registry = Registry::new();
        let expr = Expression::compile(r#"x|truncate:"many""#, &registry).unwrap();
        let mut ctx = Context::new();
        ctx.insert("x", "abc");
        let err = expr.evaluate(&ctx, &registry).unwrap_err();
        assert!(err.to_string().contains("truncate"));
    }
}
