use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("[Parsing error: {name}] [Line {line}, Column {column}] {message}")]
    Parse {
        name: String,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("[Error: {name}] [Line {line} Col {column} ({raw})] {message}")]
    Execution {
        name: String,
        line: usize,
        column: usize,
        raw: String,
        message: String,
    },
    #[error("Template has no content: {0}")]
    EmptyTemplate(String),
    #[error("Template '{0}' has not been parsed")]
    NotParsed(String),
    #[error("{0}")]
    Syntax(String),
    #[error("Expression Error: {0}")]
    Expression(String),
    #[error("{0}")]
    Render(String),
    #[error("No end-node (possible nodes: {0:?}) found.")]
    MissingEndNode(Vec<String>),
    #[error("Unhandled placeholder (for example 'endif' for an if-clause): '{0}'")]
    UnhandledPlaceholder(String),
    #[error("Tag '{0}' is no longer registered")]
    UnknownTag(String),
    #[error("Could not find the template '{name}': {reason}")]
    Resolution { name: String, reason: String },
    #[error("Include depth limit of {0} exceeded")]
    IncludeDepth(usize),
    #[error("Serialization Error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Whether the error already carries a template position.
    pub fn is_positioned(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Execution { .. })
    }
}

impl serde::ser::Error for TemplateError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TemplateError::Serialization(msg.to_string())
    }
}
