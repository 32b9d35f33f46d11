//! staincount CLI — command-line interface for stained-cell counting.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use staincount::{
    render_overlay, run_batch, AnalysisConfig, Analyzer, BatchConfig, BatchLayout, CountError,
    CsvWriter, EngineConfig, MissingPolicy, OverlayStyle, RowSchema, SlideEngine, SlideLoader,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "staincount")]
#[command(
    about = "Count stained cells in microscopy slide images (dual-channel contour containment)"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single slide or raster image.
    Count(CliCountArgs),

    /// Sweep a directory tree and write one CSV row per image.
    Batch(CliBatchArgs),

    /// Print the built-in analysis presets and their thresholds.
    Presets,
}

#[derive(Debug, Clone, Args)]
struct CliCountArgs {
    /// Path to the input image (.vsi slide or plain raster).
    #[arg(long)]
    image: PathBuf,

    /// Analysis preset.
    #[arg(long, value_enum, default_value_t = PresetArg::DualStain)]
    preset: PresetArg,

    /// Path to a JSON analysis configuration (overrides --preset).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Require the file name to end with this suffix (e.g. m.vsi).
    #[arg(long)]
    require_suffix: Option<String>,

    /// Write a color-coded contour overlay PNG.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write the full per-contour analysis as JSON.
    #[arg(long)]
    debug_json: Option<PathBuf>,

    #[command(flatten)]
    engine: CliEngineArgs,
}

#[derive(Debug, Clone, Args)]
struct CliBatchArgs {
    /// Root directory of the slide tree.
    #[arg(long)]
    root: PathBuf,

    /// Output CSV path.
    #[arg(long)]
    out: PathBuf,

    /// Directory nesting under the root.
    #[arg(long, value_enum, default_value_t = LayoutArg::Slides)]
    layout: LayoutArg,

    /// Required filename suffix selecting which files qualify.
    #[arg(long, default_value = "m.vsi")]
    suffix: String,

    /// Policy for qualifying files that fail to load or decode.
    #[arg(long, value_enum, default_value_t = MissingArg::Skip)]
    on_missing: MissingArg,

    /// Trailing count columns per row.
    #[arg(long, value_enum, default_value_t = ColumnsArg::ValidTotal)]
    columns: ColumnsArg,

    /// Analysis preset.
    #[arg(long, value_enum, default_value_t = PresetArg::DualStain)]
    preset: PresetArg,

    /// Path to a JSON analysis configuration (overrides --preset).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    engine: CliEngineArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct CliEngineArgs {
    /// Slide converter executable (default: $STAINCOUNT_CONVERTER, then
    /// `bfconvert` on PATH). Only consulted when a .vsi file is decoded.
    #[arg(long)]
    converter: Option<PathBuf>,
}

impl CliEngineArgs {
    fn to_core(&self) -> EngineConfig {
        EngineConfig {
            converter: self.converter.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    DualStain,
    NuclearCount,
    AdaptiveCount,
}

impl PresetArg {
    fn to_core(self) -> AnalysisConfig {
        match self {
            Self::DualStain => AnalysisConfig::dual_stain(),
            Self::NuclearCount => AnalysisConfig::nuclear_count(),
            Self::AdaptiveCount => AnalysisConfig::adaptive_count(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::DualStain => {
                "blue marker (k=1) inside red reference (k=5), Canny 100/200, min area 5"
            }
            Self::NuclearCount => "luminance count (k=1), Canny 100/200, min area 5",
            Self::AdaptiveCount => {
                "blue count (k=3), equalize + adaptive threshold + open, min area 50"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// root/<slide-file>
    Slides,
    /// root/<collection>/<slide>/<region-file>
    Nested,
}

impl LayoutArg {
    fn to_core(self) -> BatchLayout {
        match self {
            Self::Slides => BatchLayout::Slides,
            Self::Nested => BatchLayout::CollectionSlideRegion,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MissingArg {
    Skip,
    Abort,
}

impl MissingArg {
    fn to_core(self) -> MissingPolicy {
        match self {
            Self::Skip => MissingPolicy::SkipAndLog,
            Self::Abort => MissingPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColumnsArg {
    Valid,
    ValidTotal,
}

impl ColumnsArg {
    fn to_core(self) -> RowSchema {
        match self {
            Self::Valid => RowSchema::ValidOnly,
            Self::ValidTotal => RowSchema::ValidAndTotal,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count(args) => run_count(&args),
        Commands::Batch(args) => run_batch_cmd(&args),
        Commands::Presets => run_presets(),
    }
}

fn load_analysis_config(
    preset: PresetArg,
    config_path: Option<&Path>,
) -> CliResult<AnalysisConfig> {
    match config_path {
        Some(path) => Ok(AnalysisConfig::from_json_file(path)?),
        None => Ok(preset.to_core()),
    }
}

/// Start the engine only when the run will actually decode a slide.
fn maybe_start_engine(
    needed: bool,
    engine_args: &CliEngineArgs,
) -> CliResult<Option<SlideEngine>> {
    if !needed {
        return Ok(None);
    }
    Ok(Some(SlideEngine::start(&engine_args.to_core())?))
}

// ── count ──────────────────────────────────────────────────────────────

fn run_count(args: &CliCountArgs) -> CliResult<()> {
    if let Some(suffix) = &args.require_suffix {
        let name = args
            .image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !name.ends_with(suffix.as_str()) {
            return Err(CountError::InvalidSuffix {
                path: args.image.clone(),
                suffix: suffix.clone(),
            }
            .into());
        }
    }

    let config = load_analysis_config(args.preset, args.config.as_deref())?;
    let engine = maybe_start_engine(SlideLoader::is_slide(&args.image), &args.engine)?;
    let loader = match &engine {
        Some(e) => SlideLoader::with_engine(e),
        None => SlideLoader::new(),
    };

    tracing::info!("Loading image: {}", args.image.display());
    let image = loader.load(&args.image)?;
    tracing::info!("Image size: {}x{}", image.width(), image.height());

    let analyzer = Analyzer::with_config(config);
    let detailed = analyzer.analyze_detailed(&image);
    let summary = detailed.analysis.summary;

    println!("Valid cells:  {}", summary.valid);
    println!("Total cells:  {}", summary.total);

    if let Some(overlay_path) = &args.overlay {
        let canvas = render_overlay(&image, &detailed, &OverlayStyle::default());
        canvas.save(overlay_path)?;
        tracing::info!("Overlay written to {}", overlay_path.display());
    }

    if let Some(debug_path) = &args.debug_json {
        let json = serde_json::to_string_pretty(&detailed.analysis)?;
        std::fs::write(debug_path, &json)?;
        tracing::info!("Debug dump written to {}", debug_path.display());
    }

    Ok(())
}

// ── batch ──────────────────────────────────────────────────────────────

fn run_batch_cmd(args: &CliBatchArgs) -> CliResult<()> {
    let config = load_analysis_config(args.preset, args.config.as_deref())?;
    let batch = BatchConfig {
        layout: args.layout.to_core(),
        suffix: args.suffix.clone(),
        missing: args.on_missing.to_core(),
        schema: args.columns.to_core(),
    };

    // One engine for the whole run, held until every file is done.
    let engine = maybe_start_engine(batch.suffix.ends_with(".vsi"), &args.engine)?;
    let loader = match &engine {
        Some(e) => SlideLoader::with_engine(e),
        None => SlideLoader::new(),
    };

    let analyzer = Analyzer::with_config(config);
    let file = std::fs::File::create(&args.out)?;
    let mut writer = CsvWriter::new(std::io::BufWriter::new(file));

    let stats = run_batch(&loader, &analyzer, &batch, &args.root, &mut writer)?;

    println!(
        "Done. {} rows written to {} ({} skipped, {} failed)",
        stats.rows_written,
        args.out.display(),
        stats.skipped,
        stats.failed
    );
    Ok(())
}

// ── presets ────────────────────────────────────────────────────────────

fn run_presets() -> CliResult<()> {
    println!("staincount built-in presets");
    for preset in [
        PresetArg::DualStain,
        PresetArg::NuclearCount,
        PresetArg::AdaptiveCount,
    ] {
        let name = preset
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        println!("  {name:15} {}", preset.describe());
    }
    Ok(())
}
