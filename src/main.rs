use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use strata_runtime::World;
use strata_structures::StructureCatalog;
use strata_world::WorldConfig;

mod app;
mod mesher;
mod render_thread;

use app::App;
use render_thread::RenderThread;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Headless driver for the strata voxel world")]
struct Args {
    /// World config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Structure catalog (TOML) replacing the built-in templates.
    #[arg(long)]
    structures: Option<PathBuf>,
    #[arg(long)]
    seed: Option<i32>,
    #[arg(long, default_value_t = 200)]
    ticks: u64,
    /// Loader radius in chunks.
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Also write a debug-level log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Loader speed along +X, in blocks per tick.
    #[arg(long, default_value_t = 2.0)]
    speed: f32,
    /// Ticks between raycast edits; 0 disables edits.
    #[arg(long, default_value_t = 10)]
    edit_every: u64,
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, Config::default(), file),
            ])?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<WorldConfig, Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(radius) = args.radius {
        cfg.streaming.radius = radius;
    }
    if let Some(dir) = &args.save_dir {
        cfg.save_dir = Some(dir.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let cfg = load_config(&args)?;
    let catalog = match &args.structures {
        Some(path) => StructureCatalog::load(path)?,
        None => StructureCatalog::builtin(),
    };
    log::info!(
        "seed={} radius={} structures={} save_dir={:?}",
        cfg.seed,
        cfg.streaming.radius,
        catalog.len(),
        cfg.save_dir
    );

    let (world, teardown_rx) = World::new(cfg, catalog);
    let render = RenderThread::spawn(teardown_rx, Duration::from_millis(16));
    let mut app = App::new(world, args.speed, args.edit_every)?;
    app.run(args.ticks);
    let summary = app.finish()?;
    let render_stats = render.finish();

    log::info!(
        "done: ticks={} generated={} freed={} structures={} placed={} removed={} meshed={} faces={} saved={}",
        summary.ticks,
        summary.generated,
        summary.freed,
        summary.structures,
        summary.placed,
        summary.removed,
        summary.meshed,
        summary.faces,
        summary.saved
    );
    log::info!(
        "render: frames={} teardowns={} buffers_recycled={}",
        render_stats.frames,
        render_stats.teardowns,
        summary.recycled
    );
    Ok(())
}
