//! A text template engine.
//!
//! Sources are split by a byte-level lexer into content, `{{ expression|filter }}`
//! outputs and `{% tag args %}` tags (`{# ... #}` comments are dropped). Rendering
//! walks the node list with a cursor that block tags move themselves, which is
//! how `if`, `for` and user-defined tags consume their bodies.
//!
//! ```
//! use stencil::{Context, Template, TemplateOptions};
//!
//! let tpl = Template::from_string("hello", "Hello {{ name|upper }}!", TemplateOptions::new()).unwrap();
//! let mut ctx = Context::new();
//! ctx.insert("name", "world");
//! assert_eq!(tpl.execute(Some(&mut ctx)).unwrap(), "Hello WORLD!");
//! ```

pub mod context;
pub mod error;
pub mod expr;
pub mod registry;
pub mod serializer;
pub mod tags;
pub mod tpl;
pub mod value;

pub use context::Context;
pub use error::TemplateError;
pub use expr::Expression;
pub use expr::filters::Filter;
pub use registry::{Registry, TagKind, registry};
pub use tags::TagHandler;
pub use tpl::ast::{ContentNode, FilterNode, Node, TagNode};
pub use tpl::engine::Execution;
pub use tpl::locator::{FileLocator, Locator, MemoryLocator};
pub use tpl::position::SourcePosition;
pub use tpl::{Template, TemplateOptions};
pub use value::{ToValue, Value};

pub type Result<T> = std::result::Result<T, TemplateError>;
