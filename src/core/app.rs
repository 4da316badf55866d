use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail, ensure};
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use tokio::io::BufReader;
use tokio::sync::mpsc;

use super::console::{FileReadout, forward_console, print_status};
use super::sink::DirectorySink;
use crate::capture::{CaptureError, HttpTileSource, TileSource};
use crate::config::TileSnapConfig;
use crate::domain::{CaptureRect, Rect, SurfaceEvent, TileCoord, TileGrid, parse_readout};
use crate::library::{LibraryError, Template, TemplateLibrary};
use crate::session::{
    ArtifactSink, CaptureOrchestrator, CaptureOutcome, ReadoutSource, SurfaceBounds,
};

#[derive(Parser, Debug)]
#[command(
    name = "tilesnap",
    version,
    about = "Capture regions of a tiled pixel canvas and keep a library of templates"
)]
pub struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file to use instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture the rectangle between two corners, or a template's footprint
    Capture(CaptureArgs),
    /// Pick two corners interactively, commands are read from stdin
    Pick(PickArgs),
    /// Parse the overlay readout into coordinates
    Readout(ReadoutArgs),
    /// Manage the template library
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Show or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Tile server base URL, tiles are fetched from {base}/{x}/{y}.png
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory the capture is saved to
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("region").required(true).args(["from", "template"])))]
pub struct CaptureArgs {
    /// First corner
    #[arg(long, value_name = "TLX,TLY,PX,PY", requires = "to")]
    pub from: Option<TileCoord>,

    /// Opposite corner
    #[arg(long, value_name = "TLX,TLY,PX,PY", requires = "from")]
    pub to: Option<TileCoord>,

    /// Capture the area covered by a library template
    #[arg(long, value_name = "NAME", conflicts_with_all = ["from", "to"])]
    pub template: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct PickArgs {
    /// File the overlay bridge writes the coordinate readout to
    #[arg(long, value_name = "FILE")]
    pub readout: Option<PathBuf>,

    /// Screen rectangle of the canvas surface
    #[arg(long, value_name = "X,Y,W,H")]
    pub surface: Option<Rect>,

    /// Start picking right away and exit after one capture
    #[arg(long)]
    pub once: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ReadoutArgs {
    /// Readout text such as "(Tl X: 1, Tl Y: 2, Px X: 3, Px Y: 4)"
    pub text: Option<String>,

    /// Read the readout from this file instead
    #[arg(long, value_name = "FILE", conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Add an image with the coordinates it belongs at
    Add {
        name: String,
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
        #[arg(
            long,
            value_name = "TLX,TLY,PX,PY",
            required_unless_present = "from_readout",
            conflicts_with = "from_readout"
        )]
        coords: Option<TileCoord>,
        /// Take the coordinates from the configured readout file
        #[arg(long)]
        from_readout: bool,
    },
    /// List templates, newest first
    List,
    /// Show one template
    Show { name: String },
    Remove { name: String },
    /// Move a template up (negative) or down the list
    Move {
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        by: isize,
    },
    /// Write all templates and their images into a directory
    Export { dir: PathBuf },
    /// Merge templates exported into a directory
    Import { dir: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print where the config file lives
    Path,
    /// Write a config file with default values
    Init {
        #[arg(long)]
        force: bool,
    },
}

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) if path.exists() => TileSnapConfig::load_from(path)?,
        Some(_) => TileSnapConfig::default(),
        None => TileSnapConfig::load(),
    };

    match cli.command {
        Command::Capture(args) => block_on(capture(&config, args)),
        Command::Pick(args) => block_on(pick(&config, args)),
        Command::Readout(args) => readout(&config, args),
        Command::Template(command) => template(&config, command),
        Command::Config(command) => config_command(&config, command, cli.config),
    }
}

fn block_on<F: Future<Output = anyhow::Result<()>>>(future: F) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(future);
    // The stdin reader may still be parked in a blocking read
    runtime.shutdown_background();
    result
}

fn orchestrator<R: ReadoutSource>(
    config: &TileSnapConfig,
    output: &OutputArgs,
    surface: Rect,
    readout: R,
) -> anyhow::Result<CaptureOrchestrator<HttpTileSource, Rect, R, DirectorySink>> {
    let base_url = output
        .base_url
        .clone()
        .unwrap_or_else(|| config.tile_base_url.clone());
    let source = HttpTileSource::new(
        base_url,
        Duration::from_secs(config.http_timeout_secs),
        config.blank_missing_tiles,
    )?;
    let dir = output
        .out
        .clone()
        .or_else(|| config.capture_dir())
        .context("No directory to save captures to, pass --out")?;
    log::debug!("Saving captures to {}", dir.display());

    Ok(CaptureOrchestrator::new(
        source,
        surface,
        readout,
        DirectorySink::new(dir),
        config.capture_settings(),
    ))
}

async fn capture(config: &TileSnapConfig, args: CaptureArgs) -> anyhow::Result<()> {
    let grid = config.grid();
    let rect = match (args.from, args.to, &args.template) {
        (Some(from), Some(to), _) => {
            for corner in [from, to] {
                ensure!(
                    corner.is_valid_for(grid),
                    "{} is outside a {}px tile",
                    corner,
                    grid.tile_size
                );
            }
            CaptureRect::normalize(grid.coord_to_global(from), grid.coord_to_global(to))
        }
        (_, _, Some(name)) => {
            let library = open_library(config)?;
            let template = library
                .get(name)
                .ok_or_else(|| LibraryError::NotFound(name.clone()))?;
            template_rect(template, grid)?
        }
        _ => bail!("Pass --from and --to, or --template"),
    };

    let readout: Option<FileReadout> = None;
    let orchestrator = orchestrator(config, &args.output, config.surface, readout)?;
    let outcome = orchestrator.capture_rect(rect).await?;
    report(&outcome);
    Ok(())
}

/// Area a template covers on the canvas
fn template_rect(template: &Template, grid: TileGrid) -> anyhow::Result<CaptureRect> {
    ensure!(
        template.coords.is_valid_for(grid),
        "Template \"{}\" at {} is outside a {}px tile",
        template.name,
        template.coords,
        grid.tile_size
    );
    if template.width == 0 || template.height == 0 {
        return Err(CaptureError::InvalidRegion {
            width: i64::from(template.width),
            height: i64::from(template.height),
        })
        .with_context(|| format!("Template \"{}\" has no recorded size", template.name));
    }
    Ok(CaptureRect::from_origin(
        grid.coord_to_global(template.coords),
        template.width,
        template.height,
    ))
}

async fn pick(config: &TileSnapConfig, args: PickArgs) -> anyhow::Result<()> {
    let readout_path = args
        .readout
        .or_else(|| config.readout_file.clone())
        .context("No readout file, pass --readout or set readout_file in the config")?;
    let surface = args.surface.unwrap_or(config.surface);
    let mut orchestrator = orchestrator(
        config,
        &args.output,
        surface,
        FileReadout::new(readout_path),
    )?;

    let (tx, mut rx) = mpsc::channel(32);
    let console = tokio::spawn(forward_console(BufReader::new(tokio::io::stdin()), tx));
    let status = tokio::spawn(print_status(orchestrator.subscribe()));
    if args.once {
        eprintln!("Commands: click <x> <y> [button], esc");
    } else {
        eprintln!("Commands: capture, click <x> <y> [button], esc, quit");
    }

    let result = pick_loop(&mut orchestrator, &mut rx, args.once).await;
    console.abort();
    status.abort();
    result
}

/// Run captures on trigger until the input closes, or once right away
async fn pick_loop<S, B, R, K>(
    orchestrator: &mut CaptureOrchestrator<S, B, R, K>,
    events: &mut mpsc::Receiver<SurfaceEvent>,
    once: bool,
) -> anyhow::Result<()>
where
    S: TileSource,
    B: SurfaceBounds,
    R: ReadoutSource,
    K: ArtifactSink,
{
    loop {
        if !once {
            match events.recv().await {
                Some(SurfaceEvent::Trigger) => {}
                Some(event) => {
                    log::debug!("Ignoring {:?}, no capture in progress", event);
                    continue;
                }
                None => return Ok(()),
            }
        }
        match orchestrator.capture(events).await {
            Ok(outcome) => report(&outcome),
            Err(err) if once => return Err(err.into()),
            Err(err) if err.is_silent() => eprintln!("Capture cancelled"),
            Err(err) => eprintln!("Capture failed: {}", err),
        }
        if once {
            return Ok(());
        }
    }
}

fn report(outcome: &CaptureOutcome) {
    println!(
        "Saved {}x{} capture to {}",
        outcome.width,
        outcome.height,
        outcome.location.display()
    );
}

fn readout_coords(text: &str, grid: TileGrid) -> anyhow::Result<TileCoord> {
    let coords = parse_readout(text).context("No coordinates found in the readout")?;
    ensure!(
        coords.is_valid_for(grid),
        "{} is outside a {}px tile",
        coords,
        grid.tile_size
    );
    Ok(coords)
}

fn read_readout_file(path: &std::path::Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read readout file: {}", path.display()))
}

fn readout(config: &TileSnapConfig, args: ReadoutArgs) -> anyhow::Result<()> {
    let text = match (args.text, args.file.or_else(|| config.readout_file.clone())) {
        (Some(text), _) => text,
        (None, Some(path)) => read_readout_file(&path)?,
        (None, None) => bail!("Pass the readout text or --file"),
    };
    let grid = config.grid();
    let coords = readout_coords(&text, grid)?;
    let global = grid.coord_to_global(coords);
    println!("{}", coords);
    println!("{}", coords.compact());
    println!("global {} {}", global.x, global.y);
    Ok(())
}

fn open_library(config: &TileSnapConfig) -> anyhow::Result<TemplateLibrary> {
    let dir = config
        .library_dir()
        .context("No data directory on this platform, set library_dir in the config")?;
    TemplateLibrary::open(&dir, config.grid())
        .with_context(|| format!("Failed to open template library at {}", dir.display()))
}

fn template(config: &TileSnapConfig, command: TemplateCommand) -> anyhow::Result<()> {
    let mut library = open_library(config)?;
    match command {
        TemplateCommand::Add {
            name,
            image,
            coords,
            from_readout: _,
        } => {
            let coords = match coords {
                Some(coords) => coords,
                None => {
                    let path = config
                        .readout_file
                        .as_deref()
                        .context("No readout_file set in the config")?;
                    readout_coords(&read_readout_file(path)?, config.grid())?
                }
            };
            let template = library.add(&name, coords, &image)?;
            println!("Added {}", template);
        }
        TemplateCommand::List => {
            if library.templates().is_empty() {
                println!("No templates yet");
            }
            for line in library.list() {
                println!("{}", line);
            }
        }
        TemplateCommand::Show { name } => {
            let template = library
                .get(&name)
                .ok_or_else(|| LibraryError::NotFound(name.clone()))?;
            println!("{}", template.name);
            println!("  coords  {}", template.coords);
            println!("  size    {}x{}", template.width, template.height);
            println!("  image   {}", library.image_path(template).display());
        }
        TemplateCommand::Remove { name } => {
            let removed = library.remove(&name)?;
            println!("Removed {}", removed.name);
        }
        TemplateCommand::Move { name, by } => {
            let position = library.move_entry(&name, by)?;
            println!("{} is at position {}", name, position + 1);
        }
        TemplateCommand::Export { dir } => {
            let count = library.export(&dir)?;
            println!("Exported {} template(s) to {}", count, dir.display());
        }
        TemplateCommand::Import { dir } => {
            let count = library.import(&dir)?;
            println!("Imported {} template(s)", count);
        }
    }
    Ok(())
}

fn config_command(
    config: &TileSnapConfig,
    command: ConfigCommand,
    path_override: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = path_override.or_else(TileSnapConfig::path);
    match command {
        ConfigCommand::Show => println!("{}", serde_json::to_string_pretty(config)?),
        ConfigCommand::Path => match path {
            Some(path) => println!("{}", path.display()),
            None => bail!("No config directory on this platform"),
        },
        ConfigCommand::Init { force } => {
            let path = path.context("No config directory on this platform")?;
            if path.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", path.display());
            }
            TileSnapConfig::default().save_to(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
