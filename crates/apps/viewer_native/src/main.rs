//! Headless globe session.
//!
//! Loads trips, flies to one of them, hovers and clicks its pin, then picks
//! the location under the screen centre. Engine events are printed to stdout
//! as JSON lines.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use foundation::ids::TripId;
use foundation::math::Vec2;
use globe::{EngineConfig, GlobeEngine, PointerEvent};
use gpu::{FileTextureLoader, HeadlessDevice, RenderDevice};
use runtime::ManualScheduler;
use scene::Trip;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Resource bookkeeping only; no GPU needed.
    Headless,
    /// Offscreen wgpu rendering. Needs the `wgpu` feature.
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the travel globe engine without a window")]
struct Args {
    /// Engine config (JSON). Defaults apply to anything left out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trip list (JSON array of `{ id, coordinates: { lat, lng } }`)
    #[arg(long, default_value = "demos/trips.json")]
    trips: PathBuf,

    /// Trip to fly to; the first trip when omitted
    #[arg(long)]
    select: Option<String>,

    /// Give up on the fly-to after this many frames
    #[arg(long, default_value_t = 600)]
    max_frames: u32,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    #[arg(long, value_enum, default_value_t = Backend::Headless)]
    backend: Backend,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short)]
    verbose: bool,
}

type Engine<D> = GlobeEngine<D, ManualScheduler>;

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let trips = load_trips(&args.trips)?;
    let selected = match &args.select {
        Some(id) => TripId::new(id.as_str()),
        None => match trips.first() {
            Some(trip) => trip.id.clone(),
            None => bail!("{} contains no trips", args.trips.display()),
        },
    };

    match args.backend {
        Backend::Headless => {
            let device = HeadlessDevice::new(args.width, args.height);
            run_session(&args, config, trips, selected, device)
        }
        #[cfg(feature = "wgpu")]
        Backend::Wgpu => {
            let device = gpu::WgpuDevice::new_offscreen(args.width, args.height)
                .context("creating wgpu device")?;
            run_session(&args, config, trips, selected, device)
        }
        #[cfg(not(feature = "wgpu"))]
        Backend::Wgpu => bail!("viewer_native was built without the `wgpu` feature"),
    }
}

fn run_session<D: RenderDevice>(
    args: &Args,
    config: EngineConfig,
    trips: Vec<Trip>,
    selected: TripId,
    device: D,
) -> Result<()> {
    let probe_interval = config.picking.hover_probe_interval as usize;
    let mut loader = FileTextureLoader::new();
    let mut engine: Engine<D> = GlobeEngine::new(
        config,
        device,
        ManualScheduler::new(),
        &mut loader,
        args.width,
        args.height,
    )
    .context("starting globe engine")?;

    engine.set_trips(trips);
    run_frames(&mut engine, 1)?;

    engine.set_selected_trip(Some(selected.clone()));
    let mut frames = 0;
    loop {
        run_frames(&mut engine, 1)?;
        frames += 1;
        if engine.camera().fly_to_target().is_none() {
            info!(trip = %selected, frames, "arrived");
            break;
        }
        if frames >= args.max_frames {
            warn!(trip = %selected, frames, "fly-to still in flight; continuing anyway");
            break;
        }
    }

    let centre = Vec2::new(f64::from(args.width) / 2.0, f64::from(args.height) / 2.0);
    engine.push_pointer(PointerEvent::Move { at: centre });
    // Enough frames for one hover probe to come due.
    run_frames(&mut engine, probe_interval)?;
    let tooltip = engine.tooltip();
    info!(
        hovered = ?tooltip.trip_id,
        x = tooltip.anchor.x,
        y = tooltip.anchor.y,
        visible = tooltip.visible,
        "tooltip"
    );

    engine.push_pointer(PointerEvent::Down { at: centre });
    engine.push_pointer(PointerEvent::Up { at: centre });
    run_frames(&mut engine, 1)?;

    engine.set_picking_mode(true);
    run_frames(&mut engine, 1)?;
    engine.push_pointer(PointerEvent::Down { at: centre });
    engine.push_pointer(PointerEvent::Up { at: centre });
    run_frames(&mut engine, 1)?;

    let frames = engine.frame_index();
    let (report, device, _) = engine.teardown();
    println!("{}", serde_json::to_string(&report)?);
    info!(frames, live = ?device.live_resources(), "session finished");
    Ok(())
}

fn load_trips(path: &Path) -> Result<Vec<Trip>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading trips {}", path.display()))?;
    let trips: Vec<Trip> = serde_json::from_str(&text)
        .with_context(|| format!("parsing trips {}", path.display()))?;
    info!(count = trips.len(), "trips loaded");
    Ok(trips)
}

fn run_frames<D: RenderDevice>(engine: &mut Engine<D>, n: usize) -> Result<()> {
    for _ in 0..n {
        let Some(id) = engine.scheduler_mut().fire() else {
            bail!("no frame pending");
        };
        engine.on_frame(id);
        for event in engine.drain_events() {
            println!(
                "{}",
                serde_json::json!({ "frame": event.frame_index, "event": event.payload })
            );
        }
    }
    Ok(())
}
