//! Tilepaint - draw strokes onto a tiled canvas from the command line.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use common::color::Color;
use common::geometry::IntPoint;
use raster::Stroke;
use studio::{Document, StudioConfig};
use texture::{Blend, BufferId, DisplaySink};

/// Tilepaint - draw strokes onto a tiled canvas
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Line to draw as x0,y0,x1,y1 (repeatable)
    #[arg(long = "line", value_parser = parse_line)]
    lines: Vec<(IntPoint, IntPoint)>,

    /// Stroke thickness in pixels
    #[arg(long, default_value = "1")]
    thickness: u32,

    /// Stroke color, as a name or hex value
    #[arg(long, default_value = "black")]
    color: String,

    /// Blend mode (replace, mask, alpha, stencil-keep, stencil-cut)
    #[arg(long, default_value = "alpha")]
    mode: String,

    /// Cell size, overriding the config file
    #[arg(long)]
    cell_size: Option<u32>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Undo the last stroke before exporting
    #[arg(long)]
    undo: bool,

    /// Write the painted region to a PNG file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_line(value: &str) -> Result<(IntPoint, IntPoint), String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate in '{value}': {e}"))?;

    match parts.as_slice() {
        &[x0, y0, x1, y1] => Ok((IntPoint::new(x0, y0), IntPoint::new(x1, y1))),
        _ => Err(format!("expected x0,y0,x1,y1 but got '{value}'")),
    }
}

/// Counts uploads instead of displaying them.
#[derive(Default)]
struct CountingSink {
    uploads: usize,
}

impl DisplaySink<Color> for CountingSink {
    fn upload(&mut self, _id: BufferId, _width: u32, _height: u32, _pixels: &[Color]) {
        self.uploads += 1;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Tilepaint v{}", studio::VERSION);

    // Build configuration
    let mut config = match &args.config {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => StudioConfig::default(),
    };
    if let Some(cell_size) = args.cell_size {
        config.canvas.cell_size = cell_size;
    }

    let color = Color::parse(&args.color).ok_or_else(|| anyhow!("unknown color '{}'", args.color))?;
    let blend = Blend::from_name(&args.mode).ok_or_else(|| anyhow!("unknown mode '{}'", args.mode))?;

    if args.lines.is_empty() {
        bail!("nothing to draw, pass at least one --line");
    }

    let mut document = Document::<Color>::new(config)?;

    for &(start, end) in &args.lines {
        let stroke = Stroke::new(start, end, color)
            .with_thickness(args.thickness)
            .with_blend(blend.clone());
        document.draw(&stroke)?;
        info!(
            "Drew ({}, {}) -> ({}, {}) with {}",
            start.x,
            start.y,
            end.x,
            end.y,
            blend.name()
        );
    }

    if args.undo && document.undo()? {
        info!("Undid last stroke");
    }

    let mut sink = CountingSink::default();
    let uploads = document.flush(&mut sink);
    let canvas = document.canvas();
    info!(
        "{} cells allocated, {} published, {} bytes of history",
        canvas.cell_count(),
        uploads,
        document.history_memory()
    );

    for key in canvas.cell_keys() {
        println!("cell ({}, {})", key.x, key.y);
    }

    if let Some(path) = args.export {
        match canvas.bounds() {
            Some(bounds) => {
                document.export_region(bounds)?.save(&path)?;
                info!("Exported {}x{} to {}", bounds.width, bounds.height, path.display());
            }
            None => info!("Canvas is empty, nothing exported"),
        }
    }

    Ok(())
}
