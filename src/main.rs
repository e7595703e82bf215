mod app;
mod config;
mod driver;
mod logging;
mod scan;
mod util;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use crate::config::{DriverSource, Settings};
use crate::driver::DriverLink;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Address of a scan driver speaking JSON lines over TCP.
    #[arg(long, value_name = "HOST:PORT", conflicts_with = "replay")]
    driver: Option<String>,
    /// Replay a recorded JSON-lines event file instead of a live driver.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,
    #[arg(long, default_value_t = 100)]
    replay_interval_ms: u64,
    /// Initial scan target shown in the form.
    #[arg(long, default_value = "127.0.0.1")]
    target: String,
    /// Initial port specification shown in the form.
    #[arg(long, default_value = "1-1000")]
    ports: String,
    /// Render full vulnerability detail regardless of the driver's tier flag.
    #[arg(long)]
    pro: bool,
    /// Ignore host/port data that arrives outside an active scan.
    #[arg(long)]
    drop_stale: bool,
    #[arg(long, default_value_t = 1.0)]
    physics_intensity: f32,
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_settings(self) -> Settings {
        let driver = match (self.driver, self.replay) {
            (Some(address), _) => DriverSource::Tcp(address),
            (None, Some(path)) => DriverSource::Replay {
                path,
                interval: Duration::from_millis(self.replay_interval_ms),
            },
            (None, None) => DriverSource::Detached,
        };

        Settings {
            driver,
            target: self.target,
            ports: self.ports,
            pro: self.pro,
            drop_stale: self.drop_stale,
            physics_intensity: self.physics_intensity,
        }
    }
}

fn open_driver(source: &DriverSource) -> DriverLink {
    let link = match source {
        DriverSource::Detached => return DriverLink::detached(),
        DriverSource::Tcp(address) => DriverLink::connect_tcp(address),
        DriverSource::Replay { path, interval } => DriverLink::replay(path, *interval),
    };

    link.unwrap_or_else(|error| {
        error!("{error:#}; continuing without a driver");
        DriverLink::detached()
    })
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    if let Err(error) = logging::init_logging(&args.log_level) {
        eprintln!("{error:#}");
    }

    let settings = args.into_settings();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "scan-topology",
        options,
        Box::new(move |cc| {
            let link = open_driver(&settings.driver);
            Ok(Box::new(app::ScanTopologyApp::new(cc, settings, link)))
        }),
    )
}
