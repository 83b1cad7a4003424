//! wellplate CLI: per-well colors from deck photographs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use wellplate::{
    get_colors_with_sink, match_size, measure_well_with_sink, to_rgb, DebugSink, ImageDumpSink,
    NoopSink, PipelineConfig, PipelineError, WellName,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "wellplate")]
#[command(about = "Locate multi-well plates in a deck photograph and read well colors")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// JSON pipeline config; missing fields use the built-in rig defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resize and crop the frame to ROWSxCOLS first (e.g. 1280x1920).
    #[arg(long, global = true, value_parser = parse_shape)]
    match_size: Option<(u32, u32)>,

    /// Write annotated stage images into this directory.
    #[arg(long, global = true)]
    debug_dir: Option<PathBuf>,

    /// 1: final wells only, 2: every stage.
    #[arg(long, global = true, default_value_t = 2)]
    debug_level: u8,

    /// off, error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Emit JSON log lines (with the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the color of every well on every visible plate.
    Colors {
        /// Path to the deck photograph.
        image: PathBuf,

        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Measure one well with the neighborhood median sampler.
    Measure {
        /// Path to the deck photograph.
        image: PathBuf,

        /// Well name, e.g. A1.
        #[arg(long)]
        well: String,

        /// Deck slot; defaults to the plate closest to the frame center.
        #[arg(long)]
        slot: Option<usize>,
    },

    /// Print the effective config as JSON.
    Config {
        /// Write the config here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_shape(s: &str) -> Result<(u32, u32), String> {
    let (r, c) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got {s:?}"))?;
    let rows = r.trim().parse::<u32>().map_err(|e| format!("rows: {e}"))?;
    let cols = c.trim().parse::<u32>().map_err(|e| format!("cols: {e}"))?;
    if rows == 0 || cols == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((rows, cols))
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse().map_err(|_| format!("unknown log level {s:?}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.common);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.common.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Colors { image, out } => run_colors(&cli.common, &config, &image, out.as_deref()),
        Commands::Measure { image, well, slot } => {
            run_measure(&cli.common, &config, &image, &well, slot)
        }
        Commands::Config { out } => run_config(&config, out.as_deref()),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(args: &CommonArgs) {
    let _ = tracing_log::LogTracer::init_with_filter(args.log_level);
    wellplate::core::init_tracing(args.log_json);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(args: &CommonArgs) {
    if args.log_json {
        eprintln!("--log-json needs the `tracing` feature; using plain logs");
    }
    let _ = wellplate::core::init_with_level(args.log_level);
}

fn load_frame(args: &CommonArgs, path: &Path) -> CliResult<image::RgbImage> {
    log::info!("loading {}", path.display());
    let frame = to_rgb(&image::open(path)?);
    log::info!("frame size {}x{}", frame.width(), frame.height());
    Ok(match args.match_size {
        Some(shape) => match_size(&frame, shape),
        None => frame,
    })
}

fn make_sink(args: &CommonArgs) -> CliResult<Box<dyn DebugSink>> {
    let sink: Box<dyn DebugSink> = match &args.debug_dir {
        Some(dir) => Box::new(ImageDumpSink::new(dir, args.debug_level)?),
        None => Box::new(NoopSink),
    };
    Ok(sink)
}

fn run_colors(
    args: &CommonArgs,
    config: &PipelineConfig,
    image: &Path,
    out: Option<&Path>,
) -> CliResult<()> {
    let frame = load_frame(args, image)?;
    let mut sink = make_sink(args)?;
    let report = get_colors_with_sink(&frame, config, sink.as_mut())?;
    match out {
        Some(path) => {
            report.write_json(path)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_measure(
    args: &CommonArgs,
    config: &PipelineConfig,
    image: &Path,
    well: &str,
    slot: Option<usize>,
) -> CliResult<()> {
    let known = well
        .parse::<WellName>()
        .is_ok_and(|w| w.fits(config.plate_rows(), config.plate_cols()));
    if !known {
        return Err(PipelineError::UnknownWell(well.to_string()).into());
    }
    let frame = load_frame(args, image)?;
    let mut sink = make_sink(args)?;
    let reading = measure_well_with_sink(&frame, well, slot, config, sink.as_mut())?;
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

fn run_config(config: &PipelineConfig, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(path) => config.write_json(path)?,
        None => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
