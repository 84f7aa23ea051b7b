use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use image_merge::{BatchOptions, ComposeOptions, FitRule, PageSpec, Template};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "image-merge",
    version,
    about = "Combines multiple images into one for printing",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,

    #[command(flatten)]
    merge: MergeArgs,

    /// Log more (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine every photo in a folder into numbered pages.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Source photos (2 to 4).
    #[arg(value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Layout: 2-up, 3-up, 4-up or landscape-max-height.
    #[arg(short, long)]
    template: Option<String>,

    /// Image height in centimeters (selects landscape-max-height).
    #[arg(long, value_name = "CM")]
    max_height: Option<f64>,

    /// Crop images to cover their slots instead of letterboxing.
    #[arg(long)]
    fill: bool,

    /// Output JPEG path.
    #[arg(short, long, default_value = "image-merge.jpg")]
    out: PathBuf,

    /// Page description JSON (size, dpi, border, background, quality).
    #[arg(long, value_name = "JSON")]
    page: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("layout").required(true).args(["count", "max_height"])))]
struct BatchArgs {
    /// Folder with the source photos.
    source: PathBuf,

    /// Folder the pages are written to (created if missing).
    dest: PathBuf,

    /// How many images per page.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(2..=4))]
    count: Option<u8>,

    /// Image height in centimeters; images are packed left to right.
    #[arg(long, value_name = "CM")]
    max_height: Option<f64>,

    /// Output file name prefix.
    #[arg(long, default_value = "img-")]
    prefix: String,

    /// Number of the first page.
    #[arg(long, default_value_t = 1)]
    start: u32,

    /// Compose a short last page instead of failing when the photos do not divide evenly.
    #[arg(long)]
    allow_partial: bool,

    /// Crop images to cover their slots instead of letterboxing.
    #[arg(long)]
    fill: bool,

    /// Page description JSON (size, dpi, border, background, quality).
    #[arg(long, value_name = "JSON")]
    page: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Some(Command::Batch(args)) => cmd_batch(args),
        None => cmd_merge(cli.merge),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_page_spec(path: Option<&Path>) -> anyhow::Result<PageSpec> {
    match path {
        Some(p) => {
            PageSpec::from_path(p).with_context(|| format!("load page config '{}'", p.display()))
        }
        None => Ok(PageSpec::default()),
    }
}

fn fit_rule(fill: bool) -> FitRule {
    if fill { FitRule::Fill } else { FitRule::Fit }
}

fn cmd_merge(args: MergeArgs) -> anyhow::Result<()> {
    let spec = load_page_spec(args.page.as_deref())?;
    let template =
        image_merge::resolve_template(args.template.as_deref(), args.max_height, &spec)?;
    let opts = ComposeOptions {
        template,
        fit: fit_rule(args.fill),
    };

    let page = image_merge::merge_files(&args.images, &args.out, &spec, &opts)?;

    eprintln!(
        "wrote {} ({}, {}x{} at {}dpi)",
        args.out.display(),
        page.template,
        page.canvas.width,
        page.canvas.height,
        page.canvas.dpi
    );
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let spec = load_page_spec(args.page.as_deref())?;
    // The `layout` group makes --count and --max-height exclusive and requires one.
    let template = match args.count {
        Some(n) => Template::default_for_count(usize::from(n))?,
        None => Template::LandscapeMaxHeight {
            max_height_px: args.max_height.map(|cm| spec.cm_to_px(cm)).transpose()?,
        },
    };

    let opts = BatchOptions {
        template,
        fit: fit_rule(args.fill),
        prefix: args.prefix,
        start: args.start,
        allow_partial: args.allow_partial,
    };

    let written = image_merge::run_batch(&args.source, &args.dest, &spec, &opts)
        .with_context(|| format!("batch '{}'", args.source.display()))?;

    eprintln!(
        "wrote {} page(s) to {}",
        written.len(),
        args.dest.display()
    );
    Ok(())
}
