//! Avatar Compositor - Headless humanoid avatar pose driver
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use avatar_compositor::{
    avatar::spawn_rig_load,
    clock::FrameClock,
    config::{Config, OutputFormat, TrackingSourceKind},
    output::{FrameSink, JsonLinesSink, LogSink, Viewport},
    tracking::TrackingHandle,
    Session,
};

/// Avatar Compositor - drive a humanoid avatar from clips and face tracking
#[derive(Parser, Debug)]
#[command(name = "avatar-compositor", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rig description path (overrides config)
    #[arg(short, long)]
    rig: Option<PathBuf>,

    /// Tracking source: none, synthetic or udp (overrides config)
    #[arg(short, long)]
    tracking: Option<TrackingSourceKind>,

    /// Target frames per second (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many frames
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Disable the scripted clip
    #[arg(long)]
    no_clip: bool,

    /// Write one JSON object per frame to stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so JSON frames own stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!(
        "Starting {} v{}",
        avatar_compositor::NAME,
        avatar_compositor::VERSION
    );

    let config = load_config(&args)?;

    // Everything runs on one thread; the rig loader is the only spawned task
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))?;

    info!("Avatar Compositor stopped");
    Ok(())
}

/// Load config and apply CLI overrides
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if let Some(ref rig) = args.rig {
        config.avatar.rig_path = rig.clone();
    }
    if let Some(source) = args.tracking {
        config.tracking.source = source;
    }
    if let Some(fps) = args.fps {
        config.frame.fps = fps;
    }
    if let Some(frames) = args.frames {
        config.frame.max_frames = frames;
    }
    if args.no_clip {
        config.animation.enabled = false;
    }
    if args.json {
        config.output.format = OutputFormat::Json;
    }

    config.validate()?;

    info!("Rig: {}", config.avatar.rig_path.display());
    info!("Tracking source: {:?}", config.tracking.source);
    info!("Scripted clip: {}", config.animation.enabled);
    info!("Frame rate: {} fps", config.frame.fps);

    Ok(config)
}

async fn run(config: Config) -> anyhow::Result<()> {
    let avatar = spawn_rig_load(config.avatar.rig_path.clone());
    let tracking = TrackingHandle::from_config(&config.tracking);
    let mut session = Session::new(&config, avatar, tracking)?;

    let mut sink: Box<dyn FrameSink> = match config.output.format {
        OutputFormat::Json => Box::new(JsonLinesSink::stdout()),
        OutputFormat::Log => Box::new(LogSink::new(config.output.log_every)),
    };
    sink.resize(Viewport::new(
        config.camera.viewport_width,
        config.camera.viewport_height,
    ));

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.frame.fps),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut clock = FrameClock::start();
    let mut ticks: u64 = 0;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                if let Some(frame) = session.frame(clock.delta()) {
                    if let Err(e) = sink.present(&frame) {
                        error!("Frame output failed: {}", e);
                        return Err(e.into());
                    }
                }

                ticks += 1;
                if config.frame.max_frames > 0 && ticks >= config.frame.max_frames {
                    info!("Reached {} frames", ticks);
                    break;
                }
            }
        }
    }

    info!(
        "Ran {} frames over {:.2}s",
        ticks,
        clock.elapsed().as_secs_f32()
    );
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
