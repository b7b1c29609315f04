use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use stencil::{
    Context, Execution, Registry, TagHandler, TemplateError, Template, TemplateOptions, Value,
    registry,
};

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// `{% repeat n %} ... {% endrepeat %}` renders its body `n` times.
struct RepeatTag;

impl TagHandler for RepeatTag {
    fn execute(
        &self,
        args: &str,
        exec: &mut Execution<'_>,
        ctx: &mut Context,
    ) -> stencil::Result<String> {
        let times: usize = args
            .parse()
            .map_err(|_| TemplateError::Render(format!("bad repeat count '{}'", args)))?;
        if times == 0 {
            exec.skip_until_any_of(&["endrepeat"])?;
            return Ok(String::new());
        }

        let start = exec.cursor();
        let mut out = String::new();
        for i in 0..times {
            exec.set_cursor(start);
            ctx.push("round", Value::Int(i as i64));
            let result = exec.run_until_any_of(ctx, &["endrepeat"]);
            ctx.pop();
            out.push_str(&result?.0);
        }
        Ok(out)
    }

    fn closing_tags(&self) -> &[&'static str] {
        &["endrepeat"]
    }
}

/// Counts how often it is executed and skipped.
#[derive(Default)]
struct ProbeTag {
    executed: Arc<AtomicUsize>,
    skipped: Arc<AtomicUsize>,
}

impl TagHandler for ProbeTag {
    fn execute(&self, _: &str, _: &mut Execution<'_>, _: &mut Context) -> stencil::Result<String> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok("P".to_string())
    }

    fn on_skip(&self, _: &str, _: &Execution<'_>) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Renders everything up to `{% stop %}`, which never appears in the tests using it.
struct GreedyTag;

impl TagHandler for GreedyTag {
    fn execute(
        &self,
        _: &str,
        exec: &mut Execution<'_>,
        ctx: &mut Context,
    ) -> stencil::Result<String> {
        Ok(exec.run_until_any_of(ctx, &["stop"])?.0)
    }
}

struct Fixture {
    registry: Arc<Registry>,
    executed: Arc<AtomicUsize>,
    skipped: Arc<AtomicUsize>,
    filtered: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        init_logger();
        let registry = Arc::new(Registry::new());
        let probe = ProbeTag::default();
        let executed = probe.executed.clone();
        let skipped = probe.skipped.clone();
        let filtered = Arc::new(AtomicUsize::new(0));

        registry.register_tag("repeat", RepeatTag);
        registry.register_marker("endrepeat");
        registry.register_tag("probe", probe);
        registry.register_tag("greedy", GreedyTag);
        registry.register_marker("stop");

        let counter = filtered.clone();
        registry.register_filter(
            "tap",
            move |value: Value, _: Option<Value>| -> stencil::Result<Value> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            },
        );

        Self {
            registry,
            executed,
            skipped,
            filtered,
        }
    }

    fn compile(&self, src: &str) -> stencil::Result<Template> {
        Template::from_string(
            "custom",
            src,
            TemplateOptions::new()
                .autoescape(false)
                .registry(self.registry.clone()),
        )
    }
}

#[test]
fn test_tag_can_rewind_the_cursor() {
    let f = Fixture::new();
    let tpl = f
        .compile("{% repeat 3 %}[{{ round }}{% probe %}]{% endrepeat %}.")
        .unwrap();
    assert_eq!(tpl.execute(None).unwrap(), "[0P][1P][2P].");
    assert_eq!(f.executed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_skipped_nodes_are_never_rendered_or_evaluated() {
    let f = Fixture::new();
    let tpl = f
        .compile("a{% if false %}{% probe %}{{ x|tap }}{% repeat 2 %}{% probe %}{% endrepeat %}{% endif %}b")
        .unwrap();
    assert_eq!(tpl.execute(None).unwrap(), "ab");
    assert_eq!(f.executed.load(Ordering::SeqCst), 0);
    assert_eq!(f.skipped.load(Ordering::SeqCst), 2);
    assert_eq!(f.filtered.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_repeats_skips_nested_blocks() {
    let f = Fixture::new();
    let tpl = f
        .compile("{% repeat 0 %}{% repeat 2 %}x{% endrepeat %}{% endrepeat %}done")
        .unwrap();
    assert_eq!(tpl.execute(None).unwrap(), "done");
}

#[test]
fn test_missing_stop_reports_the_opening_tag() {
    let f = Fixture::new();
    let tpl = f.compile("one\ntwo {% greedy %}{{ x|tap }} rest").unwrap();
    match tpl.execute(None).unwrap_err() {
        TemplateError::Execution {
            line,
            column,
            raw,
            message,
            ..
        } => {
            assert_eq!((line, column), (2, 5));
            assert_eq!(raw, "greedy");
            assert_eq!(message, "No end-node (possible nodes: [\"stop\"]) found.");
        }
        other => panic!("Expected Execution error, got {:?}", other),
    }
    // The body was rendered before the end of the template was reached.
    assert_eq!(f.filtered.load(Ordering::SeqCst), 1);
}

#[test]
fn test_errors_inside_a_body_point_at_the_inner_node() {
    let f = Fixture::new();
    let tpl = f
        .compile("{% repeat 2 %}\n  {% for x in 5 %}{% endfor %}{% endrepeat %}")
        .unwrap();
    match tpl.execute(None).unwrap_err() {
        TemplateError::Execution { line, column, raw, .. } => {
            assert_eq!((line, column), (2, 3));
            assert_eq!(raw, "for x in 5");
        }
        other => panic!("Expected Execution error, got {:?}", other),
    }
}

#[test]
fn test_tags_are_scoped_to_their_registry() {
    let f = Fixture::new();
    assert!(f.compile("{% repeat 1 %}x{% endrepeat %}").is_ok());

    let err = Template::from_string(
        "custom",
        "{% repeat 1 %}x{% endrepeat %}",
        TemplateOptions::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Tag 'repeat' does not exist"), "{err}");
}

#[test]
fn test_filters_registered_globally() {
    init_logger();
    registry().register_filter(
        "shout",
        |value: Value, _: Option<Value>| -> stencil::Result<Value> {
            Ok(Value::Str(format!("{}!", value.to_string().to_uppercase())))
        },
    );
    let tpl = Template::from_string("g", "{{ word|shout }}", TemplateOptions::new()).unwrap();
    let mut ctx = Context::new();
    ctx.insert("word", "hey");
    assert_eq!(tpl.execute(Some(&mut ctx)).unwrap(), "HEY!");
}

#[test]
fn test_unknown_filter_fails_to_parse() {
    let f = Fixture::new();
    let err = f.compile("\n{{ x|nope }}").unwrap_err();
    assert!(err.to_string().starts_with("[Parsing error: custom] [Line 2, Column 1]"), "{err}");
}
