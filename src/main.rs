use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use rune_config::{RuneConfig, parse_viewport};
use rune_io::{DocumentSource, FetchOptions, load_document, load_stylesheets};
use rune_shape::pack::stylesheet_links;
use rune_shape::{
    ClassificationWarning, CompareOptions, Context, ExtractOptions, GenerateOptions, Viewport,
    analyze, compare, extract_from_markup, generate_from_shapes, load_shapes_file, round_trip,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "rune-shapes", version, about = "Shape models to web interfaces and back")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify shapes into page regions and print the layout.
    Analyze(AnalyzeArgs),
    /// Write index.html, styles, behavior and optionally a manifest.
    Generate(GenerateArgs),
    /// Reconstruct a shape list from an HTML document.
    Extract(ExtractArgs),
    /// Diff two shape lists and print the fidelity report.
    Compare(CompareArgs),
    /// Generate, extract and compare in memory.
    RoundTrip(RoundTripArgs),
}

#[derive(Args, Debug, Default)]
struct CommonArgs {
    /// Logical screen size, e.g. 1920x1080.
    #[arg(long, value_parser = viewport_arg)]
    viewport: Option<Viewport>,

    /// Config file; defaults to ./rune.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Shape list JSON.
    #[arg(long)]
    shapes: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[arg(long)]
    shapes: PathBuf,

    /// Output directory for the bundle.
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    title: Option<String>,

    /// Also write manifest.json.
    #[arg(long, default_value_t = false)]
    manifest: bool,

    /// Skip the viewport meta tag and narrow-screen rules.
    #[arg(long, default_value_t = false)]
    no_responsive: bool,

    #[arg(long)]
    theme: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// File path or http(s) URL of the document.
    #[arg(long)]
    input: String,

    /// Extra stylesheets applied after the document's own.
    #[arg(long = "css")]
    css: Vec<PathBuf>,

    #[arg(long, default_value_t = false)]
    preserve_ids: bool,

    #[arg(long, default_value_t = false)]
    infer_functions: bool,

    /// Write the shape list here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    #[arg(long)]
    original: PathBuf,

    #[arg(long)]
    extracted: PathBuf,

    #[arg(long, default_value_t = false)]
    ignore_geometry: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct RoundTripArgs {
    #[arg(long)]
    shapes: PathBuf,

    #[arg(long, default_value_t = false)]
    ignore_geometry: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn viewport_arg(raw: &str) -> Result<Viewport, String> {
    parse_viewport(raw)
        .map(|(width, height)| Viewport::new(width, height))
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))
}

/// Config file plus environment, with the shared flags applied on top.
struct Settings {
    config: RuneConfig,
    viewport: Viewport,
}

impl Settings {
    fn load(common: &CommonArgs) -> anyhow::Result<Self> {
        let config = RuneConfig::load_with(common.config.as_deref()).context("load config")?;
        Ok(Self::from_config(config, common))
    }

    fn from_config(config: RuneConfig, common: &CommonArgs) -> Self {
        if let Some(raw) = config.diagnostics.as_deref() {
            rune_shape::diagnostics::init_diagnostics(raw);
        }
        let viewport = common
            .viewport
            .unwrap_or_else(|| Viewport::new(config.viewport.width, config.viewport.height));
        Self { config, viewport }
    }

    fn generate_options(&self) -> GenerateOptions {
        let generate = &self.config.generate;
        GenerateOptions {
            title: generate.title.clone(),
            responsive: generate.responsive,
            manifest: generate.manifest,
            theme: generate.theme.clone(),
        }
    }

    fn extract_options(&self) -> ExtractOptions {
        let extract = &self.config.extract;
        ExtractOptions {
            viewport: self.viewport,
            preserve_ids: extract.preserve_ids,
            infer_functions: extract.infer_functions,
            stamp_timestamps: extract.stamp_timestamps,
        }
    }

    fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            ignore_geometry: self.config.compare.ignore_geometry,
            ..CompareOptions::default()
        }
    }

    fn fetch_options(&self) -> FetchOptions {
        let fetch = &self.config.fetch;
        FetchOptions {
            timeout: Duration::from_secs(fetch.timeout_secs),
            user_agent: fetch.user_agent.clone(),
            ..FetchOptions::default()
        }
        .with_allowed_origins(fetch.allowed_origins.iter().cloned())
    }
}

fn report_warnings(warnings: &[ClassificationWarning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("write stdout")?;
    Ok(())
}

fn load_shapes(path: &Path) -> anyhow::Result<Vec<rune_shape::Shape>> {
    let (shapes, warnings) = load_shapes_file(path)
        .with_context(|| format!("load shapes '{}'", path.display()))?
        .into_parts();
    report_warnings(&warnings);
    Ok(shapes)
}

fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.common)?;
    let shapes = load_shapes(&args.shapes)?;
    let (layout, warnings) = analyze(&shapes, &settings.viewport)?.into_parts();
    report_warnings(&warnings);
    print_json(&layout)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.common)?;
    let mut options = settings.generate_options();
    if let Some(title) = args.title {
        options.title = title;
    }
    if let Some(theme) = args.theme {
        options.theme = theme;
    }
    options.manifest |= args.manifest;
    options.responsive &= !args.no_responsive;

    let shapes = load_shapes(&args.shapes)?;
    let (interface, warnings) =
        generate_from_shapes(&shapes, &settings.viewport, &options)?.into_parts();
    report_warnings(&warnings);

    let toc = interface
        .write_bundle(&args.out)
        .with_context(|| format!("write bundle '{}'", args.out.display()))?;
    for name in toc.entries.keys() {
        eprintln!("wrote {}", args.out.join(name).display());
    }
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.common)?;
    let mut options = settings.extract_options();
    options.preserve_ids |= args.preserve_ids;
    options.infer_functions |= args.infer_functions;

    let fetch = settings.fetch_options();
    let source = DocumentSource::parse(&args.input)
        .with_context(|| format!("document location '{}'", args.input))?;
    let markup =
        load_document(&source, &fetch).with_context(|| format!("load document '{source}'"))?;

    let mut stylesheets = load_stylesheets(&source, &stylesheet_links(&markup), &fetch);
    for path in &args.css {
        let css = std::fs::read_to_string(path)
            .with_context(|| format!("read stylesheet '{}'", path.display()))?;
        stylesheets.push(css);
    }
    info!("extracting from {source} with {} stylesheet(s)", stylesheets.len());

    let (shapes, warnings) = extract_from_markup(&markup, &stylesheets, &options)?.into_parts();
    report_warnings(&warnings);

    match args.out {
        Some(out) => {
            let json = serde_json::to_string_pretty(&shapes).context("serialize shapes")?;
            std::fs::write(&out, json).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {} shapes to {}", shapes.len(), out.display());
            Ok(())
        }
        None => print_json(&shapes),
    }
}

fn cmd_compare(args: CompareArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.common)?;
    let mut options = settings.compare_options();
    options.ignore_geometry |= args.ignore_geometry;

    let original = load_shapes(&args.original)?;
    let extracted = load_shapes(&args.extracted)?;
    print_json(&compare(&original, &extracted, &options))
}

fn cmd_round_trip(args: RoundTripArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.common)?;
    let mut ctx = Context::round_trip(settings.viewport);
    ctx.generate = settings.generate_options();
    ctx.compare = settings.compare_options();
    ctx.compare.ignore_geometry |= args.ignore_geometry;

    let shapes = load_shapes(&args.shapes)?;
    let result = round_trip(&ctx, &shapes)?;
    report_warnings(&result.warnings);
    print_json(&result.report)
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Compare(args) => cmd_compare(args),
        Command::RoundTrip(args) => cmd_round_trip(args),
    }
}
