use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use photo_slide::config::{Configuration, OrientationSource};
use photo_slide::events::{LoadPhoto, LoaderOutput, PowerEvent};
use photo_slide::library::PhotoLibrary;
use photo_slide::mode::{DeviceSignals, Orientation, ViewMode};
use photo_slide::platform::power::PowerMonitor;
use photo_slide::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "photo-slide",
    version,
    about = "photo grid that turns into a slideshow while docked"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Print the first N shuffled photos and the selected view without opening a window
    #[arg(long = "list", value_name = "COUNT")]
    list: Option<usize>,
    /// Override slideshow.interval (e.g. "5s", "1m")
    #[arg(long = "interval", value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("photo_slide={level}").parse()?)
        .add_directive("wgpu_core=warn".parse()?)
        .add_directive("wgpu_hal=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        verbose,
        list,
        interval,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?;
    if let Some(interval) = interval {
        cfg.slideshow.interval = interval;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let library = match PhotoLibrary::load(&cfg) {
        Ok(library) => library,
        Err(err) => {
            tracing::error!("{err}");
            return Err(err).context("cannot open the photo library");
        }
    };

    if let Some(count) = list {
        return print_listing(&cfg, &library, count);
    }

    let (to_load_tx, to_load_rx) = mpsc::channel::<LoadPhoto>(64); // Viewer -> Loader
    let (loaded_tx, loaded_rx) = mpsc::channel::<LoaderOutput>(cfg.loader_max_concurrent_decodes); // Loader -> Viewer
    let (power_tx, power_rx) = mpsc::channel::<PowerEvent>(8); // Power -> Viewer

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Power
    tasks.spawn({
        let monitor = PowerMonitor::from_source(&cfg.power.source);
        let poll_interval = cfg.power.poll_interval;
        let cancel = cancel.clone();
        async move {
            tasks::power::run(monitor, poll_interval, power_tx, cancel)
                .await
                .context("power task failed")
        }
    });

    // PhotoLoader
    tasks.spawn({
        let cancel = cancel.clone();
        let max_in_flight = cfg.loader_max_concurrent_decodes;
        async move {
            tasks::loader::run(to_load_rx, loaded_tx, cancel, max_in_flight)
                .await
                .context("loader task failed")
        }
    });

    // The window must live on the main thread; this returns once it closes.
    if let Err(e) = tasks::viewer::run_windowed(
        library,
        cfg.clone(),
        to_load_tx,
        loaded_rx,
        power_rx,
        cancel.clone(),
    )
    .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

fn print_listing(cfg: &Configuration, library: &PhotoLibrary, count: usize) -> Result<()> {
    let status = PowerMonitor::from_source(&cfg.power.source)
        .read()
        .context("failed to read power status")?;
    let charging = status.is_charging();

    println!(
        "# library: {} photos under {}\n# power: {:?} (charging: {})\n# seed: {}",
        library.len(),
        cfg.photo_library_path.display(),
        status,
        charging,
        cfg.startup_shuffle_seed
            .map_or_else(|| "(random)".to_string(), |s| s.to_string())
    );

    let mode_for = |orientation| ViewMode::select(DeviceSignals { orientation, charging });
    match cfg.orientation {
        OrientationSource::Auto => println!(
            "# view: {:?} when landscape, {:?} when portrait",
            mode_for(Orientation::Landscape),
            mode_for(Orientation::Portrait)
        ),
        OrientationSource::Landscape => {
            println!("# view: {:?}", mode_for(Orientation::Landscape))
        }
        OrientationSource::Portrait => println!("# view: {:?}", mode_for(Orientation::Portrait)),
    }

    if library.is_empty() {
        println!("(no photos found)");
        return Ok(());
    }
    println!("\n# shuffled order:");
    for (idx, image) in library.iter().take(count).enumerate() {
        println!("  {:>4}: {}", idx + 1, image.path.display());
    }
    Ok(())
}
