//! Headless frame editor.
//!
//! Drives an editing session from the command line: pick a frame from the
//! catalog, crop a photo into it, caption it and write the PNG.

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use frame_compositor::{CropRect, DisplaySize, LayerSource};
use tracing_subscriber::EnvFilter;

use frame_editor_lib::app::SharedState;
use frame_editor_lib::config::validation::validate_setting;
use frame_editor_lib::export::{download_filename, write_output};
use frame_editor_lib::tracking::NoopTracker;
use frame_editor_lib::upload::PhotoUpload;

#[derive(Parser, Debug)]
#[command(name = "frame-editor", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the frames offered by the catalog.
    List,
    /// Composite a photo into a frame and write the PNG.
    Compose(ComposeArgs),
    /// Toggle a frame as favorite.
    Favorite {
        /// Frame id.
        id: String,
    },
    /// List favorite frame ids.
    Favorites,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Frame id from the catalog.
    #[arg(long)]
    frame: String,

    /// Photo to place into the frame.
    #[arg(long)]
    photo: PathBuf,

    /// Caption text drawn in the frame's text area.
    #[arg(long)]
    caption: Option<String>,

    /// Crop selection `x,y,w,h` in display coordinates (default: auto-fit).
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRect>,

    /// Width the photo is displayed at; height follows the photo's aspect.
    /// Defaults to the photo's natural width.
    #[arg(long)]
    display_width: Option<f64>,

    /// Device pixel ratio (default from PIXEL_RATIO).
    #[arg(long, value_parser = parse_pixel_ratio)]
    pixel_ratio: Option<f32>,

    /// Output PNG path (default: <data dir>/exports/<frame>-<timestamp>.png).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_crop(value: &str) -> Result<CropRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number: {e}"))?;
    if parts.iter().any(|v| !v.is_finite()) {
        return Err("coordinates must be finite".into());
    }
    match parts.as_slice() {
        &[x, y, w, h] if w > 0.0 && h > 0.0 => Ok(CropRect::new(x, y, w, h)),
        [_, _, _, _] => Err("width and height must be positive".into()),
        _ => Err("expected x,y,w,h".into()),
    }
}

fn parse_pixel_ratio(value: &str) -> Result<f32, String> {
    validate_setting("PIXEL_RATIO", value)?;
    value.parse().map_err(|e| format!("invalid number: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = frame_editor_lib::init_foundation()?;
    let state = SharedState::init(config).await?;

    match cli.cmd {
        Command::List => cmd_list(&state).await,
        Command::Compose(args) => cmd_compose(&state, args).await,
        Command::Favorite { id } => cmd_favorite(&state, &id),
        Command::Favorites => cmd_favorites(&state),
    }
}

async fn cmd_list(state: &SharedState) -> anyhow::Result<()> {
    let Some(catalog) = state.catalog() else {
        bail!("no frame catalog configured");
    };
    let favorites = state.favorites()?.list()?;
    for frame in catalog.list_frames().await? {
        let star = if favorites.contains(&frame.id) { "*" } else { " " };
        println!(
            "{star} {:<16} {:<28} {}x{}",
            frame.id,
            frame.display_name(),
            frame.dimensions.width,
            frame.dimensions.height
        );
    }
    Ok(())
}

async fn cmd_compose(state: &SharedState, args: ComposeArgs) -> anyhow::Result<()> {
    let Some(catalog) = state.catalog() else {
        bail!("no frame catalog configured");
    };
    let frame = catalog
        .get_frame(&args.frame)
        .await
        .with_context(|| format!("loading frame {}", args.frame))?;
    let template = catalog.template_reference(&frame)?;

    let mut session = state.new_session();
    if let Some(ratio) = args.pixel_ratio {
        session.set_pixel_ratio(ratio);
    }
    session.select_frame_with_template(frame, LayerSource::reference(template))?;

    let upload = PhotoUpload::from_path(&args.photo)
        .await
        .with_context(|| format!("reading {}", args.photo.display()))?;
    // Display size is only known once the photo is decoded.
    session.upload_photo(&upload, DisplaySize::new(0.0, 0.0))?;
    let (natural_w, natural_h) = session.natural_size().context("photo was not decoded")?;
    let display_w = args.display_width.unwrap_or(f64::from(natural_w));
    let display_h = display_w * f64::from(natural_h) / f64::from(natural_w);
    session.set_display_size(DisplaySize::new(display_w, display_h))?;

    match args.crop {
        Some(rect) => {
            session.set_selection(rect)?;
        }
        None => {
            session.auto_fit()?;
        }
    }
    session.commit_crop()?;
    session.confirm_crop()?;

    if let Some(caption) = args.caption {
        session.set_caption(caption)?;
    }
    session
        .refresh_preview(state.compositor(), state.loader())
        .await?;
    let output = session.complete()?;

    let path = match args.output {
        Some(path) => path,
        None => state.config().exports_dir().join(download_filename(
            session.frame().context("frame missing")?,
            &chrono::Local::now(),
        )),
    };
    let written = write_output(&output, &path).await?;

    if state.config().usage_tracking {
        session.deliver(catalog).await?;
    } else {
        session.deliver(&NoopTracker).await?;
    }
    println!("{}", written.display());
    Ok(())
}

fn cmd_favorite(state: &SharedState, id: &str) -> anyhow::Result<()> {
    let now = state.favorites()?.toggle(id)?;
    println!("{id}: {}", if now { "favorited" } else { "removed from favorites" });
    Ok(())
}

fn cmd_favorites(state: &SharedState) -> anyhow::Result<()> {
    for id in state.favorites()?.list()? {
        println!("{id}");
    }
    Ok(())
}
