use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::tags::{TagHandler, eval_args, is_identifier};
use crate::tpl::engine::Execution;
use crate::value::Value;
use std::collections::BTreeMap;

const BODY_END: &[&str] = &["empty", "endfor"];

/// `{% for item in items %} ... {% empty %} ... {% endfor %}`
///
/// Lists yield their items, maps their keys (or `key, value` pairs with two loop
/// variables) and strings their characters. A `forloop` map with `counter`,
/// `counter0`, `revcounter`, `first`, `last` and `length` is bound in the body.
pub struct ForTag;

struct LoopHeader<'a> {
    key_var: Option<&'a str>,
    value_var: &'a str,
    iterable: &'a str,
}

fn parse_header(args: &str) -> Result<LoopHeader<'_>> {
    let invalid = || {
        TemplateError::Render(format!(
            "Invalid for-loop '{}', expected 'item in items' or 'key, value in map'",
            args
        ))
    };

    let (vars, iterable) = split_on_in(args).ok_or_else(invalid)?;
    let iterable = iterable.trim();
    if iterable.is_empty() {
        return Err(invalid());
    }

    let vars: Vec<&str> = vars.split(',').map(str::trim).collect();
    if !vars.iter().all(|v| is_identifier(v)) {
        return Err(invalid());
    }
    match vars[..] {
        [value_var] => Ok(LoopHeader {
            key_var: None,
            value_var,
            iterable,
        }),
        [key_var, value_var] => Ok(LoopHeader {
            key_var: Some(key_var),
            value_var,
            iterable,
        }),
        _ => Err(invalid()),
    }
}

/// Splits at the first `in` keyword with whitespace on both sides.
fn split_on_in(args: &str) -> Option<(&str, &str)> {
    let bytes = args.as_bytes();
    (1..bytes.len().saturating_sub(2))
        .find(|&i| {
            &bytes[i..i + 2] == b"in"
                && bytes[i - 1].is_ascii_whitespace()
                && bytes[i + 2].is_ascii_whitespace()
        })
        .map(|i| (&args[..i], &args[i + 2..]))
}

fn loop_items(value: Value, pairs: bool) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::List(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::Int(i as i64), v))
            .collect()),
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(k, v)| {
                if pairs {
                    (Value::Str(k), v)
                } else {
                    (Value::Null, Value::Str(k))
                }
            })
            .collect()),
        Value::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (Value::Int(i as i64), Value::Str(c.to_string())))
            .collect()),
        other => Err(TemplateError::Render(format!(
            "Cannot iterate over a value of type {}",
            other.type_name()
        ))),
    }
}

fn forloop(index: usize, length: usize) -> Value {
    let mut map = BTreeMap::new();
    map.insert("counter".to_string(), Value::Int(index as i64 + 1));
    map.insert("counter0".to_string(), Value::Int(index as i64));
    map.insert("revcounter".to_string(), Value::Int((length - index) as i64));
    map.insert("first".to_string(), Value::Bool(index == 0));
    map.insert("last".to_string(), Value::Bool(index + 1 == length));
    map.insert("length".to_string(), Value::Int(length as i64));
    Value::Map(map)
}

impl TagHandler for ForTag {
    fn execute(&self, args: &str, exec: &mut Execution<'_>, ctx: &mut Context) -> Result<String> {
        let header = parse_header(args)?;
        let iterable = eval_args("for", header.iterable, exec, ctx)?;
        let items = loop_items(iterable, header.key_var.is_some())?;

        if items.is_empty() {
            let stop = exec.skip_until_any_of(BODY_END)?;
            if stop.name() == "empty" {
                let (body, _) = exec.run_until_any_of(ctx, &["endfor"])?;
                return Ok(body);
            }
            return Ok(String::new());
        }

        let start = exec.cursor();
        let length = items.len();
        let depth = ctx.depth();
        let mut out = String::new();
        let mut ended_on_empty = false;

        for (index, (key, value)) in items.into_iter().enumerate() {
            exec.set_cursor(start);
            ctx.push("forloop", forloop(index, length));
            if let Some(key_var) = header.key_var {
                ctx.push(key_var, key);
            }
            ctx.push(header.value_var, value);

            let result = exec.run_until_any_of(ctx, BODY_END);
            ctx.truncate(depth);
            let (body, stop) = result?;

            out.push_str(&body);
            ended_on_empty = stop.name() == "empty";
        }

        if ended_on_empty {
            exec.skip_until_any_of(&["endfor"])?;
        }
        Ok(out)
    }

    fn closing_tags(&self) -> &[&'static str] {
        &["endfor"]
    }
}
