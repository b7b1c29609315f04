use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::registry::{Registry, TagKind};
use crate::tpl::Template;
use crate::tpl::ast::{Node, TagNode};
use log::trace;

/// The state of one render of a [`Template`].
///
/// The cursor lives here rather than on the template, so a parsed template can be
/// rendered from several places at once. Control tags receive the execution they
/// were rendered from and move its cursor with [`run_until_any_of`] and
/// [`skip_until_any_of`] (or rewind it with [`set_cursor`] to replay a body).
///
/// [`run_until_any_of`]: Execution::run_until_any_of
/// [`skip_until_any_of`]: Execution::skip_until_any_of
/// [`set_cursor`]: Execution::set_cursor
pub struct Execution<'t> {
    template: &'t Template,
    cursor: usize,
    include_depth: usize,
}

impl<'t> Execution<'t> {
    pub(crate) fn new(template: &'t Template, include_depth: usize) -> Self {
        Self {
            template,
            cursor: 0,
            include_depth,
        }
    }

    pub fn template(&self) -> &'t Template {
        self.template
    }

    pub fn registry(&self) -> &'t Registry {
        self.template.options().get_registry()
    }

    /// Index of the node currently being rendered. Inside a tag handler this is the
    /// handler's own tag node.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor, typically back to a tag node recorded earlier with
    /// [`cursor`](Execution::cursor) so its body can be rendered again.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// How many `include`s deep this execution is.
    pub fn include_depth(&self) -> usize {
        self.include_depth
    }

    /// Renders every node from the cursor to the end of the template.
    pub fn render_all(&mut self, ctx: &mut Context) -> Result<String> {
        let nodes = self.template.nodes();
        let mut out = String::with_capacity(self.template.source().len());

        while self.cursor < nodes.len() {
            let node = &nodes[self.cursor];
            let rendered = self
                .render_node(node, ctx)
                .map_err(|e| self.annotate(node, e))?;
            out.push_str(&rendered);
            self.cursor += 1;
        }

        Ok(out)
    }

    /// Renders the nodes after the current one until a tag named in `stops`.
    ///
    /// The stop tag itself is not rendered; the cursor is left on it and it is
    /// returned together with the output, so the caller can tell which terminator
    /// ended the body.
    pub fn run_until_any_of(
        &mut self,
        ctx: &mut Context,
        stops: &[&str],
    ) -> Result<(String, &'t TagNode)> {
        let nodes = self.template.nodes();
        let mut out = String::new();
        self.cursor += 1;

        while self.cursor < nodes.len() {
            let node = &nodes[self.cursor];
            if let Node::Tag(tag) = node
                && is_stop(stops, tag)
            {
                return Ok((out, tag));
            }
            let rendered = self
                .render_node(node, ctx)
                .map_err(|e| self.annotate(node, e))?;
            out.push_str(&rendered);
            self.cursor += 1;
        }

        Err(missing_end_node(stops))
    }

    /// Moves past the nodes after the current one, without rendering them, until a
    /// tag named in `stops`, which is returned with the cursor left on it.
    ///
    /// Tags passed over get their handler's [`on_skip`] hook called. A passed tag
    /// whose handler declares [`closing_tags`] opens a nested block: stop names are
    /// not matched again until that block's closer has been passed.
    ///
    /// [`on_skip`]: crate::tags::TagHandler::on_skip
    /// [`closing_tags`]: crate::tags::TagHandler::closing_tags
    pub fn skip_until_any_of(&mut self, stops: &[&str]) -> Result<&'t TagNode> {
        let nodes = self.template.nodes();
        let mut open_blocks: Vec<Vec<&'static str>> = Vec::new();
        self.cursor += 1;

        while self.cursor < nodes.len() {
            if let Node::Tag(tag) = &nodes[self.cursor] {
                if open_blocks.is_empty() && is_stop(stops, tag) {
                    return Ok(tag);
                }

                if open_blocks
                    .last()
                    .is_some_and(|closers| closers.iter().any(|c| *c == tag.name()))
                {
                    open_blocks.pop();
                } else if let Some(TagKind::Handler(handler)) = self.registry().tag(tag.name()) {
                    trace!(
                        "Skipping tag '{}' at line {} col {}",
                        tag.name(),
                        tag.at.line,
                        tag.at.column
                    );
                    handler.on_skip(tag.args(), self);
                    let closers = handler.closing_tags();
                    if !closers.is_empty() {
                        open_blocks.push(closers.to_vec());
                    }
                }
            }
            self.cursor += 1;
        }

        Err(missing_end_node(stops))
    }

    fn render_node(&mut self, node: &'t Node, ctx: &mut Context) -> Result<String> {
        match node {
            Node::Content(content) => Ok(content.text.clone()),
            Node::Filter(filter) => filter.expression.render(ctx, self.registry()),
            Node::Tag(tag) => {
                if tag.marker {
                    return Err(TemplateError::UnhandledPlaceholder(tag.name.clone()));
                }
                match self.registry().tag(&tag.name) {
                    Some(TagKind::Handler(handler)) => handler.execute(&tag.args, self, ctx),
                    Some(TagKind::Marker) => {
                        Err(TemplateError::UnhandledPlaceholder(tag.name.clone()))
                    }
                    None => Err(TemplateError::UnknownTag(tag.name.clone())),
                }
            }
        }
    }

    /// Attaches the node's position to errors that do not carry one yet, so the
    /// innermost failing node is what gets reported.
    fn annotate(&self, node: &Node, err: TemplateError) -> TemplateError {
        if err.is_positioned() {
            return err;
        }
        TemplateError::Execution {
            name: self.template.name().to_string(),
            line: node.line(),
            column: node.column(),
            raw: node.raw().to_string(),
            message: err.to_string(),
        }
    }
}

fn is_stop(stops: &[&str], tag: &TagNode) -> bool {
    stops.iter().any(|s| *s == tag.name())
}

fn missing_end_node(stops: &[&str]) -> TemplateError {
    TemplateError::MissingEndNode(stops.iter().map(|s| s.to_string()).collect())
}
