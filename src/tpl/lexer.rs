use crate::Result;
use crate::error::TemplateError;
use crate::registry::Registry;
use crate::tpl::ast::{ContentNode, Node};
use crate::tpl::parser;
use crate::tpl::position::{SourcePosition, Tracker};

/// Scanning states. Each one consumes bytes strictly forward and hands over to the
/// next state, or ends the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Content,
    Comment,
    Filter,
    Tag,
}

/// Byte-level lexer turning template source into the node list.
struct Lexer<'a> {
    name: &'a str,
    source: &'a str,
    registry: &'a Registry,
    autoescape: bool,
    pos: Tracker<'a>,
    /// Offset where the text of the current literal or region starts.
    start: usize,
    /// Position of the first byte of the current construct (literal text or opener).
    construct: SourcePosition,
    nodes: Vec<Node>,
}

impl<'a> Lexer<'a> {
    fn new(name: &'a str, source: &'a str, registry: &'a Registry, autoescape: bool) -> Self {
        let pos = Tracker::new(source);
        let construct = pos.position();
        Self {
            name,
            source,
            registry,
            autoescape,
            pos,
            start: 0,
            construct,
            nodes: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Node>> {
        let mut state = Some(State::Content);
        while let Some(current) = state {
            state = match current {
                State::Content => self.lex_content()?,
                State::Comment => self.lex_comment()?,
                State::Filter => self.lex_region(State::Filter)?,
                State::Tag => self.lex_region(State::Tag)?,
            };
        }
        Ok(self.nodes)
    }

    fn error_at(&self, at: SourcePosition, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            name: self.name.to_string(),
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    /// Starts a new literal at the current byte.
    fn begin_content(&mut self) {
        self.start = self.pos.offset();
        self.construct = self.pos.position();
    }

    fn flush_content(&mut self) {
        let end = self.pos.offset();
        if end > self.start {
            self.nodes.push(Node::Content(ContentNode {
                at: self.construct,
                text: self.source[self.start..end].to_string(),
            }));
        }
    }

    fn lex_content(&mut self) -> Result<Option<State>> {
        loop {
            let Some(c) = self.pos.peek(0) else {
                self.flush_content();
                return Ok(None);
            };

            if c == b'{' {
                let opener = self.pos.position();
                let next = match self.pos.peek(1) {
                    Some(b'#') => State::Comment,
                    Some(b'%') => State::Tag,
                    Some(b'{') => State::Filter,
                    Some(other) => {
                        return Err(self.error_at(
                            opener,
                            format!("Unknown open command ('{}').", other as char),
                        ));
                    }
                    None => {
                        return Err(self.error_at(opener, "File end reached (after opening '{')"));
                    }
                };

                self.flush_content();
                self.pos.advance(2);
                self.start = self.pos.offset();
                self.construct = opener;
                return Ok(Some(next));
            }

            self.pos.advance(1);
        }
    }

    fn lex_comment(&mut self) -> Result<Option<State>> {
        loop {
            match (self.pos.peek(0), self.pos.peek(1)) {
                (None, _) | (Some(b'#'), None) => {
                    return Err(self.error_at(self.construct, "File end reached within comment"));
                }
                (Some(b'#'), Some(b'}')) => {
                    self.pos.advance(2);
                    self.begin_content();
                    return Ok(Some(State::Content));
                }
                _ => {}
            }
            self.pos.advance(1);
        }
    }

    /// Scans a `{{ }}` or `{% %}` region up to its closer and builds the node.
    fn lex_region(&mut self, kind: State) -> Result<Option<State>> {
        let (closer, what) = match kind {
            State::Filter => (b'}', "filter"),
            _ => (b'%', "tag"),
        };

        loop {
            match (self.pos.peek(0), self.pos.peek(1)) {
                (None, _) => {
                    return Err(self.error_at(
                        self.construct,
                        format!("File end reached within {}", what),
                    ));
                }
                (Some(c), None) if c == closer => {
                    return Err(self.error_at(
                        self.construct,
                        format!("File end reached within {}", what),
                    ));
                }
                (Some(c), Some(b'}')) if c == closer => break,
                _ => {}
            }
            self.pos.advance(1);
        }

        let captured = &self.source[self.start..self.pos.offset()];
        let node = match kind {
            State::Filter => {
                parser::filter_node(captured, self.construct, self.registry, self.autoescape)
                    .map(Node::Filter)
            }
            _ => parser::tag_node(captured, self.construct, self.registry).map(Node::Tag),
        }
        .map_err(|e| self.error_at(self.construct, e.to_string()))?;
        self.nodes.push(node);

        self.pos.advance(2);
        self.begin_content();
        Ok(Some(State::Content))
    }
}

/// Lexes and parses `source` into its node list, stopping at the first error.
pub(crate) fn tokenize(
    name: &str,
    source: &str,
    registry: &Registry,
    autoescape: bool,
) -> Result<Vec<Node>> {
    Lexer::new(name, source, registry, autoescape).run()
}
