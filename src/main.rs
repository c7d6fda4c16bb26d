// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Thermowatch - temperature and surveillance telemetry server
//!
//! Subscribes to `/surveillance/#`, ingests sensor registrations, readings
//! and camera captures, raises threshold notifications and keeps the charts
//! and timelapse videos up to date.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use thermowatch::alerts::AlertEngine;
use thermowatch::core::Scheduler;
use thermowatch::graph::GraphJob;
use thermowatch::streaming::MqttTransport;
use thermowatch::surveillance::SurveillanceIngest;
use thermowatch::timelapse::{Mencoder, TimelapseJob};
use thermowatch::timeseries::RrdTool;
use thermowatch::{Catalog, Config, Dispatcher, Layout, NAME, VERSION};

/// Thermowatch - temperature and surveillance telemetry server
#[derive(Parser, Debug)]
#[command(name = "thermowatch")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Telemetry ingestion and alerting server for temperature and surveillance nodes")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// MQTT broker port
    #[arg(short, long)]
    port: Option<u16>,

    /// Storage prefix for database, series, images and logs
    #[arg(short = 'P', long)]
    prefix: Option<PathBuf>,

    /// Alert when a watched sensor drops below this value
    #[arg(short = 'm', long, allow_negative_numbers = true)]
    alertmin: Option<i32>,

    /// Alert when a watched sensor rises above this value
    #[arg(short = 'M', long, allow_negative_numbers = true)]
    alertmax: Option<i32>,

    /// Display names of the sensors to watch
    #[arg(short = 's', long, num_args = 1..)]
    alertsensor: Vec<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.mqtt.host = host.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
        if let Some(prefix) = &self.prefix {
            config.storage.prefix = prefix.clone();
        }
        if let Some(min) = self.alertmin {
            config.alerts.min = Some(f64::from(min));
        }
        if let Some(max) = self.alertmax {
            config.alerts.max = Some(f64::from(max));
        }
        if !self.alertsensor.is_empty() {
            config.alerts.sensors = self.alertsensor.clone();
        }
    }

    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 | 1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn init_logging(level: &str, layout: &Layout) -> Result<()> {
    let log_file = layout.log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("opening log file {:?}", log_file))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(true))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let (mut config, config_warning) = match &args.config {
        Some(path) => (Config::load(path)?, None),
        None => {
            let path = Config::default_path();
            match Config::load_or_create(&path) {
                Ok(config) => (config, None),
                Err(e) => (Config::default(), Some(format!("using defaults, {:?} unusable: {}", path, e))),
            }
        }
    };
    args.apply(&mut config);

    let layout = config.layout();
    std::fs::create_dir_all(&layout.prefix)
        .with_context(|| format!("creating storage prefix {:?}", layout.prefix))?;
    init_logging(args.log_level(), &layout)?;

    info!("{} v{} starting", NAME, VERSION);
    if let Some(warning) = config_warning {
        warn!("{}", warning);
    }
    info!("Configuration: {:?}", config);
    layout.ensure()?;

    let catalog = match Catalog::open_or_fatal(&layout.database_file()) {
        Ok(catalog) => catalog,
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(config, layout, catalog))?;

    info!("{} shutdown complete", NAME);
    Ok(())
}

async fn run(config: Config, layout: Layout, catalog: Catalog) -> Result<()> {
    let cancel = CancellationToken::new();
    let transport = MqttTransport::new(&config.mqtt);
    let rrdtool = RrdTool::new(&config.graph.rrdtool, &layout.rrd_dir);

    let mut scheduler = Scheduler::with_token(cancel.clone());
    scheduler.spawn(
        GraphJob::new(
            Catalog::open_or_fatal(&layout.database_file())?,
            rrdtool.clone(),
            transport.notifier(),
            &config.graph,
            &layout,
        ),
        config.graph.interval(),
    );
    scheduler.spawn(
        TimelapseJob::new(
            Catalog::open_or_fatal(&layout.database_file())?,
            Mencoder::new(&config.timelapse.mencoder, config.timelapse.fps),
            &config.timelapse,
            &layout,
        ),
        config.timelapse.interval(),
    );

    let mut dispatcher = Dispatcher::new(
        catalog,
        rrdtool,
        AlertEngine::new(&config.alerts),
        SurveillanceIngest::new(&layout.surveillance_dir),
        transport.notifier(),
    );

    let signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, cleaning up...");
                signal.cancel();
            }
            Err(e) => error!("cannot listen for shutdown signal: {}", e),
        }
    });

    info!("Running, press Ctrl+C to shutdown");
    transport
        .run(|topic, payload| dispatcher.handle(topic, payload), cancel)
        .await;

    scheduler.shutdown().await;
    Ok(())
}
