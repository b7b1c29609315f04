use crate::Result;
use crate::error::TemplateError;
use crate::expr::{Expr, FilterCall, Op};
use crate::registry::Registry;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
    Pipe,
    Colon,
    LParen,
    RParen,
    Cmp(Op),
    And,
    Or,
    Not,
}

fn syntax(msg: impl Into<String>) -> TemplateError {
    TemplateError::Expression(msg.into())
}

/// Splits expression text into tokens.
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            b':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b'"' | b'\'' => {
                let (s, next) = read_string(input, i)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            b'=' | b'!' | b'<' | b'>' => {
                // Order matters (longest first).
                let two = input.get(i..i + 2).unwrap_or("");
                let (op, len) = match (two, c) {
                    ("==", _) => (Op::Eq, 2),
                    ("!=", _) => (Op::Ne, 2),
                    (">=", _) => (Op::Ge, 2),
                    ("<=", _) => (Op::Le, 2),
                    (_, b'>') => (Op::Gt, 1),
                    (_, b'<') => (Op::Lt, 1),
                    _ => return Err(syntax(format!("Unexpected character '{}'", c as char))),
                };
                tokens.push(Token::Cmp(op));
                i += len;
            }
            b'0'..=b'9' | b'-' => {
                let (token, next) = read_number(input, i)?;
                tokens.push(token);
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                let word = &input[start..i];
                tokens.push(match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => {
                        if word.ends_with('.') || word.contains("..") {
                            return Err(syntax(format!("Invalid variable path '{}'", word)));
                        }
                        Token::Ident(word.to_string())
                    }
                });
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(syntax(format!("Unexpected character '{}'", ch)));
            }
        }
    }

    Ok(tokens)
}

/// Reads a quoted literal starting at `start`; supports `\"`, `\'`, `\\`, `\n`, `\t`.
fn read_string(input: &str, start: usize) -> Result<(String, usize)> {
    let quote = input.as_bytes()[start] as char;
    let mut out = String::new();
    let mut chars = input[start + 1..].char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c if c == quote => return Ok((out, start + 1 + offset + 1)),
            c => out.push(c),
        }
    }

    Err(syntax(format!("Unterminated string starting at offset {}", start)))
}

fn read_number(input: &str, start: usize) -> Result<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = start;
    if bytes[i] == b'-' {
        i += 1;
        if !bytes.get(i).is_some_and(u8::is_ascii_digit) {
            return Err(syntax("Unexpected character '-'"));
        }
    }
    let mut is_float = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => i += 1,
            b'.' if !is_float && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                is_float = true;
                i += 1;
            }
            _ => break,
        }
    }
    let text = &input[start..i];
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| syntax(format!("Invalid number '{}'", text)))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| syntax(format!("Invalid number '{}'", text)))?,
        )
    };
    Ok((token, i))
}

/// Recursive-descent parser over the token list.
///
/// Precedence, loosest first: `or`, `and`, `not`, comparison, filter pipeline.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open `not` operators and parentheses.
    depth: usize,
}

/// Deepest `not`/parenthesis nesting accepted in one expression.
const MAX_NESTING: usize = 64;

impl Parser {
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(syntax("expression nested too deeply"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            expr = Expr::Binary(Op::Or, Box::new(expr), Box::new(self.parse_and()?));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            expr = Expr::Binary(Op::And, Box::new(expr), Box::new(self.parse_not()?));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_pipeline()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_pipeline()?;
            return Ok(Expr::Binary(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        let mut filters = Vec::new();
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            let name = match self.next() {
                Some(Token::Ident(name)) => name,
                other => {
                    return Err(syntax(format!(
                        "Expected filter name after '|', got {}",
                        describe(other.as_ref())
                    )));
                }
            };
            let arg = if self.peek() == Some(&Token::Colon) {
                self.pos += 1;
                Some(self.parse_primary()?)
            } else {
                None
            };
            filters.push(FilterCall { name, arg });
        }
        if filters.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Filtered(Box::new(base), filters))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Float(n)) => Ok(Expr::Literal(Value::Float(n))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "none" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Some(Token::LParen) => {
                self.enter()?;
                let expr = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(expr),
                    other => Err(syntax(format!(
                        "Expected ')', got {}",
                        describe(other.as_ref())
                    ))),
                }
            }
            other => Err(syntax(format!(
                "Expected a value, got {}",
                describe(other.as_ref())
            ))),
        }
    }
}

fn describe(token: Option<&Token>) -> String {
    match token {
        None => "end of expression".to_string(),
        Some(Token::Str(s)) => format!("string \"{}\"", s),
        Some(Token::Int(n)) => format!("number {}", n),
        Some(Token::Float(n)) => format!("number {}", n),
        Some(Token::Ident(s)) => format!("'{}'", s),
        Some(Token::Pipe) => "'|'".to_string(),
        Some(Token::Colon) => "':'".to_string(),
        Some(Token::LParen) => "'('".to_string(),
        Some(Token::RParen) => "')'".to_string(),
        Some(Token::Cmp(op)) => format!("operator {:?}", op),
        Some(Token::And) => "'and'".to_string(),
        Some(Token::Or) => "'or'".to_string(),
        Some(Token::Not) => "'not'".to_string(),
    }
}

/// Parses a complete expression; trailing tokens are an error.
pub(crate) fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(syntax("Empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(syntax(format!(
            "Unexpected {} in '{}'",
            describe(parser.peek()),
            input
        )));
    }
    Ok(expr)
}

/// Fails on the first filter name the registry does not know.
pub(crate) fn check_filters(expr: &Expr, registry: &Registry) -> Result<()> {
    match expr {
        Expr::Literal(_) | Expr::Var(_) => Ok(()),
        Expr::Not(inner) => check_filters(inner, registry),
        Expr::Binary(_, left, right) => {
            check_filters(left, registry)?;
            check_filters(right, registry)
        }
        Expr::Filtered(base, filters) => {
            check_filters(base, registry)?;
            for f in filters {
                if !registry.has_filter(&f.name) {
                    return Err(syntax(format!("Filter '{}' does not exist", f.name)));
                }
                if let Some(arg) = &f.arg {
                    check_filters(arg, registry)?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.to_string()))
    }

    #[test]
    fn test_nesting_is_capped() {
        assert!(parse(&format!("{}a{}", "(".repeat(10), ")".repeat(10))).is_ok());
        assert!(parse(&format!("{}a", "not ".repeat(10))).is_ok());

        let deep = format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000));
        match parse(&deep) {
            Err(TemplateError::Expression(msg)) => assert_eq!(msg, "expression nested too deeply"),
            other => panic!("Expected nesting error, got {:?}", other),
        }
        assert!(parse(&format!("{}a", "not ".repeat(10_000))).is_err());
        assert!(parse(&"(".repeat(10_000)).is_err());
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse("a > 1").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(Op::Gt, var("a"), Box::new(Expr::Literal(Value::Int(1))))
        );
    }

    #[test]
    fn test_parse_pipeline_with_argument() {
        let expr = parse(r#"date|date:"%d.%m.%Y"|upper"#).unwrap();
        match expr {
            Expr::Filtered(base, filters) => {
                assert_eq!(*base, Expr::Var("date".to_string()));
                assert_eq!(filters.len(), 2);
                assert_eq!(filters[0].name, "date");
                assert_eq!(
                    filters[0].arg,
                    Some(Expr::Literal(Value::Str("%d.%m.%Y".to_string())))
                );
                assert_eq!(filters[1].name, "upper");
                assert_eq!(filters[1].arg, None);
            }
            other => panic!("Expected Filtered, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_binds_tighter_than_comparison() {
        let expr = parse(r#"name|lower == "florian""#).unwrap();
        match expr {
            Expr::Binary(Op::Eq, left, right) => {
                assert!(matches!(*left, Expr::Filtered(..)));
                assert_eq!(*right, Expr::Literal(Value::Str("florian".to_string())));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_precedence() {
        // a or (b and (not c))
        let expr = parse("a or b and not c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                Op::Or,
                var("a"),
                Box::new(Expr::Binary(
                    Op::And,
                    var("b"),
                    Box::new(Expr::Not(var("c")))
                ))
            )
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("-3").unwrap(), Expr::Literal(Value::Int(-3)));
        assert_eq!(parse("2.5").unwrap(), Expr::Literal(Value::Float(2.5)));
        assert_eq!(parse("none").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(
            parse(r#"'it\'s'"#).unwrap(),
            Expr::Literal(Value::Str("it's".to_string()))
        );
        assert_eq!(parse("items.0").unwrap(), Expr::Var("items.0".to_string()));
    }

    #[test]
    fn test_malformed() {
        assert!(parse("").is_err());
        assert!(parse("a ==").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("name|").is_err());
        assert!(parse("\"open").is_err());
        assert!(parse("a = b").is_err());
        assert!(parse("a.").is_err());
    }
}
