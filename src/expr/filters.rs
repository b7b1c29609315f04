use crate::Result;
use crate::error::TemplateError;
use crate::registry::Registry;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// A named value transformation applied through `value|name:arg`.
pub trait Filter: Send + Sync {
    fn apply(&self, value: Value, arg: Option<Value>) -> Result<Value>;
}

impl<F> Filter for F
where
    F: Fn(Value, Option<Value>) -> Result<Value> + Send + Sync,
{
    fn apply(&self, value: Value, arg: Option<Value>) -> Result<Value> {
        self(value, arg)
    }
}

/// Name of the filter appended to every `{{ }}` pipeline when auto-escaping.
pub const ESCAPE_FILTER: &str = "escape";

pub(crate) fn register_builtins(registry: &Registry) {
    registry.register_filter(ESCAPE_FILTER, escape);
    registry.register_filter("e", escape);
    registry.register_filter("lower", lower);
    registry.register_filter("upper", upper);
    registry.register_filter("capitalize", capitalize);
    registry.register_filter("title", title);
    registry.register_filter("trim", trim);
    registry.register_filter("length", length);
    registry.register_filter("default", default);
    registry.register_filter("join", join);
    registry.register_filter("first", first);
    registry.register_filter("last", last);
    registry.register_filter("date", date);
    registry.register_filter("add", add);
    registry.register_filter("truncate", truncate);
}

fn fail(msg: impl Into<String>) -> TemplateError {
    TemplateError::Expression(msg.into())
}

/// Escapes `& < > " '` for HTML text and attribute contexts.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn escape(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(Value::Str(escape_html(&value.to_string())))
}

fn map_str(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Str(s) => Value::Str(f(&s)),
        Value::Null => Value::Null,
        other => Value::Str(f(&other.to_string())),
    }
}

fn lower(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(map_str(value, str::to_lowercase))
}

fn upper(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(map_str(value, str::to_uppercase))
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(map_str(value, capitalize_word))
}

fn title(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(map_str(value, |s| {
        s.split(' ')
            .map(|w| capitalize_word(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }))
}

fn trim(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(map_str(value, |s| s.trim().to_string()))
}

fn length(value: Value, _: Option<Value>) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Int(0)),
        v => v
            .len()
            .map(|n| Value::Int(n as i64))
            .ok_or_else(|| fail(format!("length of {} is undefined", v.type_name()))),
    }
}

fn default(value: Value, arg: Option<Value>) -> Result<Value> {
    if value.is_truthy() {
        Ok(value)
    } else {
        Ok(arg.unwrap_or(Value::Null))
    }
}

fn join(value: Value, arg: Option<Value>) -> Result<Value> {
    let sep = arg.map(|a| a.to_string()).unwrap_or_else(|| ", ".to_string());
    match value {
        Value::List(items) => Ok(Value::Str(
            items
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&sep),
        )),
        other => Ok(other),
    }
}

fn first(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(match value {
        Value::List(items) => items.into_iter().next().unwrap_or(Value::Null),
        Value::Str(s) => s
            .chars()
            .next()
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

fn last(value: Value, _: Option<Value>) -> Result<Value> {
    Ok(match value {
        Value::List(mut items) => items.pop().unwrap_or(Value::Null),
        Value::Str(s) => s
            .chars()
            .next_back()
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `date:"%d.%m.%Y"` formats a datetime (or ISO-8601 string) with strftime syntax.
fn date(value: Value, arg: Option<Value>) -> Result<Value> {
    let dt = match &value {
        Value::DateTime(dt) => *dt,
        Value::Str(s) => {
            parse_datetime(s).ok_or_else(|| fail(format!("'{}' is not a date", s)))?
        }
        Value::Null => return Ok(Value::Null),
        other => return Err(fail(format!("cannot format {} as a date", other.type_name()))),
    };
    let fmt = arg
        .map(|a| a.to_string())
        .unwrap_or_else(|| "%Y-%m-%d".to_string());

    let mut out = String::new();
    write!(out, "{}", dt.format(&fmt))
        .map_err(|_| fail(format!("invalid date format '{}'", fmt)))?;
    Ok(Value::Str(out))
}

fn add(value: Value, arg: Option<Value>) -> Result<Value> {
    let arg = arg.ok_or_else(|| fail("add requires an argument"))?;
    Ok(match (value, arg) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Value::List(a)
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Float(x + y),
            _ => Value::Str(format!("{}{}", a, b)),
        },
    })
}

/// `truncate:n` keeps the first `n` chars and appends `...` when anything was cut.
fn truncate(value: Value, arg: Option<Value>) -> Result<Value> {
    let n = match arg {
        Some(Value::Int(n)) if n >= 0 => n as usize,
        Some(other) => return Err(fail(format!("expected a length, got '{}'", other))),
        None => return Err(fail("truncate requires a length")),
    };
    Ok(map_str(value, |s| {
        if s.chars().count() <= n {
            s.to_string()
        } else {
            let mut out: String = s.chars().take(n).collect();
            out.push_str("...");
            out
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(s(r#"<a href="x">&'"#), None).unwrap(),
            s("&lt;a href=&quot;x&quot;&gt;&amp;&#39;")
        );
        assert_eq!(escape(Value::Int(3), None).unwrap(), s("3"));
        assert_eq!(escape(Value::Null, None).unwrap(), s(""));
    }

    #[test]
    fn test_string_filters() {
        assert_eq!(capitalize(s("hello world"), None).unwrap(), s("Hello world"));
        assert_eq!(title(s("hello WORLD"), None).unwrap(), s("Hello World"));
        assert_eq!(upper(s("abc"), None).unwrap(), s("ABC"));
        assert_eq!(trim(s("  x "), None).unwrap(), s("x"));
        assert_eq!(lower(Value::Null, None).unwrap(), Value::Null);
    }

    #[test]
    fn test_collection_filters() {
        let list = Value::List(vec![s("a"), s("b"), s("c")]);
        assert_eq!(length(list.clone(), None).unwrap(), Value::Int(3));
        assert_eq!(join(list.clone(), Some(s("-"))).unwrap(), s("a-b-c"));
        assert_eq!(join(list.clone(), None).unwrap(), s("a, b, c"));
        assert_eq!(first(list.clone(), None).unwrap(), s("a"));
        assert_eq!(last(list, None).unwrap(), s("c"));
        assert_eq!(length(s("héllo"), None).unwrap(), Value::Int(5));
        assert!(length(Value::Bool(true), None).is_err());
    }

    #[test]
    fn test_default_and_add() {
        assert_eq!(default(Value::Null, Some(s("n/a"))).unwrap(), s("n/a"));
        assert_eq!(default(s("x"), Some(s("n/a"))).unwrap(), s("x"));
        assert_eq!(add(Value::Int(2), Some(Value::Int(3))).unwrap(), Value::Int(5));
        assert_eq!(
            add(Value::Float(0.5), Some(Value::Int(1))).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(add(s("a"), Some(s("b"))).unwrap(), s("ab"));
    }

    #[test]
    fn test_date() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(
            date(Value::DateTime(dt), Some(s("%H:%M %d.%m.%Y"))).unwrap(),
            s("14:05 09.03.2024")
        );
        assert_eq!(
            date(s("2024-03-09T14:05:00"), None).unwrap(),
            s("2024-03-09")
        );
        assert!(date(s("yesterday"), None).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(s("abcdef"), Some(Value::Int(3))).unwrap(), s("abc..."));
        assert_eq!(truncate(s("ab"), Some(Value::Int(3))).unwrap(), s("ab"));
        assert!(truncate(s("ab"), None).is_err());
    }
}
