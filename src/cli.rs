// ============================================================================
// RetouchFE CLI - headless retouching via stroke scripts
// ============================================================================
//
// Usage examples:
//   retouchfe --input photo.png --script logo.rhai --output clean.png
//   retouchfe -i photo.jpg --fit 1200x900 -s strokes.rhai      (writes photo_retouched.png)
//   retouchfe -i "shots/*.jpg" -s strokes.rhai --output-dir out/ --format jpg -q 85
//
// Every file goes through the same pipeline: load, start an edit session,
// replay the script's strokes, export the current bitmap.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use rhai::AST;
use tracing::{info, warn};

use crate::components::tools::{MAX_BRUSH_SIZE, ToolKind};
use crate::io::{DEFAULT_QUALITY, SaveFormat, default_output_path, encode_and_write, load_image_sync};
use crate::ops::scripting::{compile_script, run_script};
use crate::session::EditSession;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RetouchFE headless retoucher.
///
/// Replays clone/blur/fill/eraser strokes from a Rhai script on image files.
#[derive(Parser, Debug)]
#[command(
    name = "retouchfe",
    version,
    about = "RetouchFE headless retouching",
    long_about = "Run stroke scripts (clone stamp, blur, fill, eraser) on image files\n\
                  and export the result. Reads any format the image decoder supports,\n\
                  writes PNG, JPEG, WEBP, BMP, TGA or TIFF.\n\n\
                  Example:\n  \
                  retouchfe --input photo.png --script logo.rhai --output clean.png\n  \
                  retouchfe -i \"*.jpg\" -s logo.rhai --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Rhai stroke script to run on each input image.
    /// If omitted, images are only loaded (and fitted) and re-saved.
    #[arg(short, long, value_name = "SCRIPT.rhai")]
    pub script: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, tiff.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Other formats ignore it.
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, value_name = "1-100",
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Shrink each image to fit WIDTHxHEIGHT before editing.
    #[arg(long, value_name = "WxH", value_parser = parse_fit)]
    pub fit: Option<(u32, u32)>,

    /// Brush diameter in pixels, 1-500 (overrides settings).
    #[arg(long, value_name = "PX",
          value_parser = clap::value_parser!(u32).range(1..=MAX_BRUSH_SIZE as i64))]
    pub brush: Option<u32>,

    /// Starting tool: clone, blur, fill, eraser (overrides settings).
    #[arg(long, value_name = "TOOL")]
    pub tool: Option<ToolKind>,

    /// Undo history capacity (overrides settings).
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Print script console output and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = setup failed or one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    match run_batch(&args) {
        Ok(report) if report.failed == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            eprintln!("{} of {} file(s) failed.", report.failed, report.total);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Per-batch tally.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub failed: usize,
}

/// Validate arguments, then process every input. Setup problems (bad script,
/// bad settings, ambiguous output) are errors; per-file problems are counted.
pub fn run_batch(args: &CliArgs) -> anyhow::Result<BatchReport> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        bail!("no input files matched the given pattern(s).");
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() {
        bail!(
            "{} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
    }

    let settings = resolve_settings(args)?;
    let save_format = parse_format(args.format.as_deref(), args.output.as_deref())?;

    // Compile once; every file replays the same AST
    let script: Option<AST> = match &args.script {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("could not read script '{}'", path.display()))?;
            let ast = compile_script(&src)
                .map_err(|e| anyhow!("script '{}':\n{}", path.display(), e.friendly_message()))?;
            Some(ast)
        }
        None => None,
    };

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create output directory '{}'", dir.display()))?;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut report = BatchReport { total, failed: 0 };

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let output_path =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), save_format);

        let job = FileJob {
            input: input_path,
            output: &output_path,
            script: script.as_ref(),
            settings: &settings,
            fit: args.fit,
            format: save_format,
            quality: args.quality,
            verbose: args.verbose,
        };
        match run_one(&job) {
            Ok(()) => {
                info!("wrote {}", output_path.display());
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                warn!("{}: {:#}", input_path.display(), e);
                eprintln!("  error: {:#}", e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct FileJob<'a> {
    input: &'a Path,
    output: &'a Path,
    script: Option<&'a AST>,
    settings: &'a EditorSettings,
    fit: Option<(u32, u32)>,
    format: SaveFormat,
    quality: u8,
    verbose: bool,
}

fn run_one(job: &FileJob<'_>) -> anyhow::Result<()> {
    // -- Step 1: Load ----------------------------------------------------
    let bitmap = load_image_sync(job.input, job.fit)?;
    let mut session = EditSession::from_settings(bitmap, job.settings);

    // -- Step 2: Replay strokes (optional) -------------------------------
    if let Some(ast) = job.script {
        let out = run_script(ast, session).map_err(|e| anyhow!("script error: {}", e.friendly_message()))?;
        if job.verbose {
            for line in &out.console_output {
                println!("  [script] {}", line);
            }
        }
        session = out.session;
        if session.skipped_steps() > 0 {
            info!(
                "{}: {} step(s) skipped at the image edge",
                job.input.display(),
                session.skipped_steps()
            );
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    encode_and_write(&session.current_bitmap(), job.output, job.format, job.quality)
}

// ============================================================================
// Helpers
// ============================================================================

/// Settings file (explicit or platform default) with CLI overrides applied.
fn resolve_settings(args: &CliArgs) -> anyhow::Result<EditorSettings> {
    let mut settings = match &args.settings {
        Some(path) => EditorSettings::load_from(path)?,
        None => EditorSettings::load(),
    };
    if let Some(brush) = args.brush {
        settings.brush_size = brush;
    }
    if let Some(tool) = args.tool {
        settings.default_tool = tool;
    }
    if let Some(history) = args.history {
        settings.max_undo_steps = history.max(1);
    }
    Ok(settings)
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    warn!("pattern '{}' matched no files", pattern);
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                warn!("invalid glob '{}': {}", pattern, e);
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from `--format`, else the output extension,
/// else PNG. An unknown `--format` is an error; an unknown extension falls
/// back to PNG.
pub fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> anyhow::Result<SaveFormat> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).ok_or_else(|| {
            let known: Vec<&str> = SaveFormat::all().iter().map(|f| f.extension()).collect();
            anyhow!("unknown format '{}' (expected one of: {})", f, known.join(", "))
        });
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Output path for one input: `--output`, else `--output-dir/<stem>_retouched.<ext>`,
/// else `<stem>_retouched.<ext>` next to the input.
pub fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> PathBuf {
    match output {
        Some(out) => out.to_path_buf(),
        None => default_output_path(input, output_dir, format),
    }
}

/// Parse `--fit` as `WIDTHxHEIGHT` (e.g. `800x600`).
pub fn parse_fit(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("fit bounds must be positive, got '{}'", s));
    }
    Ok((w, h))
}
