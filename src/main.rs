mod app;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tenant_atlas::engine::{Engine, PassSummary};
use tenant_atlas::lod::LodEvaluation;
use tenant_atlas::settings::Settings;

use crate::app::SnapshotSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Topology snapshot JSON. A synthetic topology is generated when omitted.
    snapshot: Option<PathBuf>,

    /// Settings JSON; individual flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    node_spacing: Option<f64>,

    #[arg(long)]
    cluster_spacing: Option<f64>,

    #[arg(long)]
    cluster_spacing_y: Option<f64>,

    #[arg(long)]
    brightness: Option<f32>,

    #[arg(long)]
    hide_labels: bool,

    #[arg(long)]
    hide_arrows: bool,

    /// Tenants in the synthetic topology.
    #[arg(long, default_value_t = 8)]
    demo_tenants: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Run one update pass and print a JSON summary instead of opening a window.
    #[arg(long)]
    summary: bool,
}

impl Args {
    fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(value) = self.node_spacing {
            settings.node_spacing = value;
        }
        if let Some(value) = self.cluster_spacing {
            settings.cluster_spacing = value;
        }
        if let Some(value) = self.cluster_spacing_y {
            settings.cluster_spacing_y = value;
        }
        if let Some(value) = self.brightness {
            settings.brightness = value;
        }
        settings.show_labels &= !self.hide_labels;
        settings.show_arrows &= !self.hide_arrows;

        Ok(settings.sanitized())
    }

    fn source(&self) -> SnapshotSource {
        match &self.snapshot {
            Some(path) => SnapshotSource::File(path.clone()),
            None => SnapshotSource::Synthetic {
                tenants: self.demo_tenants,
                seed: self.seed,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryReport {
    #[serde(flatten)]
    pass: PassSummary,
    lod: LodEvaluation,
}

fn print_summary(source: &SnapshotSource, settings: &Settings) -> Result<()> {
    let snapshot = source.load()?;
    let mut engine = Engine::new();
    engine.update(&snapshot, settings);

    let report = SummaryReport {
        pass: engine.summary(),
        lod: engine.frame(engine.default_camera(), 0.0).lod,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = args.resolve_settings()?;
    let source = args.source();

    if args.summary {
        return print_summary(&source, &settings);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "tenant-atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::AtlasApp::new(cc, source, settings)))),
    )
    .map_err(|error| anyhow!("preview window failed: {error}"))
}
