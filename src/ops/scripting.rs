// ============================================================================
// STROKE SCRIPTS - Rhai-driven pointer replay against an edit session
// ============================================================================
//
// A script drives the same press/drag/release lifecycle a pointer would, so
// batch runs go through exactly the operators, skips and history commits an
// interactive session does.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, Scope};

use crate::canvas::Point;
use crate::components::tools::{MAX_BRUSH_SIZE, ToolKind};
use crate::session::EditSession;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|&l| l > 0),
            column: pos.position().filter(|&c| c > 0),
        }
    }

    fn internal(message: &str) -> Self {
        Self {
            message: message.to_string(),
            line: None,
            column: None,
        }
    }

    /// Error explanation with location and a hint where one helps.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let cleaned = raw.split(" (line ").next().unwrap_or(raw).trim();
        let mut parts = Vec::new();

        match (self.line, self.column) {
            (Some(line), Some(col)) => parts.push(format!("Error on line {}, column {}:", line, col)),
            (Some(line), None) => parts.push(format!("Error on line {}:", line)),
            _ => parts.push("Script error:".to_string()),
        }
        parts.push(format!("  {}", cleaned));

        if raw.contains("Function not found:") {
            parts.push(String::new());
            parts.push("  Tip: stroke functions are press(x, y), drag(x, y), release(),".to_string());
            parts.push("  leave(), dab(x, y) and stroke([[x, y], ...]).".to_string());
        } else if raw.contains("Variable not found:") {
            parts.push(String::new());
            parts.push("  Tip: declare variables with 'let' before using them.".to_string());
        } else if raw.contains("Too many operations") {
            parts.push(String::new());
            parts.push("  Tip: the script may contain an infinite loop.".to_string());
        } else if raw.contains("unknown tool") {
            parts.push(String::new());
            let names: Vec<&str> = ToolKind::all().iter().map(|t| t.name()).collect();
            parts.push(format!("  Tip: available tools are {}.", names.join(", ")));
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Script context - shared mutable state between engine and host functions
// ============================================================================

struct ScriptContext {
    session: EditSession,
    console_output: Vec<String>,
}

type SharedContext = Rc<RefCell<ScriptContext>>;

/// What a successful run hands back.
pub struct ScriptOutput {
    pub session: EditSession,
    /// Lines written by `print`, in order.
    pub console_output: Vec<String>,
}

type HostResult<T> = Result<T, Box<EvalAltResult>>;

/// Coordinates may be written as ints or floats.
fn coord(value: &Dynamic) -> HostResult<f32> {
    if let Ok(f) = value.as_float() {
        return Ok(f as f32);
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f32);
    }
    Err(format!("expected a number for a coordinate, got {}", value.type_name()).into())
}

fn point(x: &Dynamic, y: &Dynamic) -> HostResult<Point> {
    Ok(Point::new(coord(x)?, coord(y)?))
}

// ============================================================================
// Engine construction with sandbox + API registration
// ============================================================================

fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    // Sandbox limits
    engine.set_max_operations(50_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(1_000);

    register_image_api(&mut engine, ctx.clone());
    register_stroke_api(&mut engine, ctx.clone());
    register_history_api(&mut engine, ctx.clone());

    let c = ctx;
    engine.on_print(move |msg| {
        tracing::info!(target: "script", "{}", msg);
        c.borrow_mut().console_output.push(msg.to_string());
    });

    engine
}

fn register_image_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> i64 { c.borrow().session.buffer().width() as i64 });

    let c = ctx.clone();
    engine.register_fn("height", move || -> i64 { c.borrow().session.buffer().height() as i64 });

    // get_pixel(x, y) -> [r, g, b, a], or [] outside the image
    let c = ctx.clone();
    engine.register_fn("get_pixel", move |x: i64, y: i64| -> Array {
        match c.borrow().session.buffer().get_pixel(x, y) {
            Some(p) => p.0.iter().map(|&v| Dynamic::from(v as i64)).collect(),
            None => Array::new(),
        }
    });

    let c = ctx.clone();
    engine.register_fn("skipped_steps", move || -> i64 { c.borrow().session.skipped_steps() as i64 });
}

fn register_stroke_api(engine: &mut Engine, ctx: SharedContext) {
    // tool("blur") selects a tool; tool() reports the active one
    let c = ctx.clone();
    engine.register_fn("tool", move |name: ImmutableString| -> HostResult<()> {
        let tool: ToolKind = name.as_str().parse().map_err(|e: String| -> Box<EvalAltResult> { e.into() })?;
        c.borrow_mut().session.set_tool(tool);
        Ok(())
    });
    let c = ctx.clone();
    engine.register_fn("tool", move || -> ImmutableString { c.borrow().session.tool().name().into() });

    let c = ctx.clone();
    engine.register_fn("brush", move |diameter: i64| -> HostResult<()> {
        let diameter = u32::try_from(diameter)
            .ok()
            .filter(|d| (1..=MAX_BRUSH_SIZE).contains(d))
            .ok_or_else(|| format!("brush diameter must be 1-{}, got {}", MAX_BRUSH_SIZE, diameter))?;
        c.borrow_mut().session.set_brush_diameter(diameter);
        Ok(())
    });
    let c = ctx.clone();
    engine.register_fn("brush", move || -> i64 { c.borrow().session.brush().diameter as i64 });

    // press/drag return true when the step changed pixels
    let c = ctx.clone();
    engine.register_fn("press", move |x: Dynamic, y: Dynamic| -> HostResult<bool> {
        let p = point(&x, &y)?;
        Ok(c.borrow_mut().session.press(p).is_some_and(|o| o.is_applied()))
    });

    let c = ctx.clone();
    engine.register_fn("drag", move |x: Dynamic, y: Dynamic| -> HostResult<bool> {
        let p = point(&x, &y)?;
        Ok(c.borrow_mut().session.move_to(p).is_some_and(|o| o.is_applied()))
    });

    let c = ctx.clone();
    engine.register_fn("release", move || -> bool { c.borrow_mut().session.release() });

    // Pointer left the canvas
    let c = ctx.clone();
    engine.register_fn("leave", move || -> bool { c.borrow_mut().session.release() });

    // dab(x, y): a single-point stroke
    let c = ctx.clone();
    engine.register_fn("dab", move |x: Dynamic, y: Dynamic| -> HostResult<bool> {
        let p = point(&x, &y)?;
        let mut lock = c.borrow_mut();
        lock.session.press(p);
        Ok(lock.session.release())
    });

    // stroke([[x, y], ...]): press on the first point, drag through the rest
    let c = ctx.clone();
    engine.register_fn("stroke", move |points: Array| -> HostResult<bool> {
        let mut parsed = Vec::with_capacity(points.len());
        for item in points {
            let pair = item
                .try_cast::<Array>()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| -> Box<EvalAltResult> { "stroke points must be [x, y] pairs".into() })?;
            parsed.push(point(&pair[0], &pair[1])?);
        }
        let Some((first, rest)) = parsed.split_first() else {
            return Ok(false);
        };
        let mut lock = c.borrow_mut();
        lock.session.press(*first);
        for p in rest {
            lock.session.move_to(*p);
        }
        Ok(lock.session.release())
    });

    let c = ctx.clone();
    engine.register_fn("has_anchor", move || -> bool { c.borrow().session.clone_source().is_some() });
}

fn register_history_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("undo", move || -> bool { c.borrow_mut().session.undo().is_some() });

    let c = ctx.clone();
    engine.register_fn("redo", move || -> bool { c.borrow_mut().session.redo().is_some() });

    let c = ctx.clone();
    engine.register_fn("reset", move || {
        c.borrow_mut().session.reset();
    });

    let c = ctx.clone();
    engine.register_fn("can_undo", move || -> bool { c.borrow().session.can_undo() });

    let c = ctx;
    engine.register_fn("can_redo", move || -> bool { c.borrow().session.can_redo() });
}

// ============================================================================
// Entry points
// ============================================================================

/// Syntax-check a script without running it. The AST can be reused across
/// sessions with [`run_script`].
pub fn compile_script(source: &str) -> Result<AST, ScriptError> {
    let engine = Engine::new();
    engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))
}

/// Run a compiled script against `session`. A stroke left open at the end is
/// released so its edits are committed.
pub fn run_script(ast: &AST, session: EditSession) -> Result<ScriptOutput, ScriptError> {
    let ctx = Rc::new(RefCell::new(ScriptContext {
        session,
        console_output: Vec::new(),
    }));

    let engine = create_engine(ctx.clone());
    let mut scope = Scope::new();
    let result = engine.run_ast_with_scope(&mut scope, ast);
    // Host closures hold clones of the context
    drop(engine);

    result.map_err(|e| ScriptError::at(e.to_string(), e.position()))?;

    let ScriptContext {
        mut session,
        console_output,
    } = Rc::try_unwrap(ctx)
        .map_err(|_| ScriptError::internal("script context still shared after run"))?
        .into_inner();

    if session.is_stroke_active() {
        session.release();
    }
    Ok(ScriptOutput {
        session,
        console_output,
    })
}

pub fn execute_script(source: &str, session: EditSession) -> Result<ScriptOutput, ScriptError> {
    let ast = compile_script(source)?;
    run_script(&ast, session)
}
