use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::scan::InboundEvent;

use super::{DriverLink, decode_line};

/// Parses a recorded JSON-lines session. Malformed lines are logged and
/// skipped so one bad record does not hide the rest.
pub(super) fn read_replay_file(path: &Path) -> Result<Vec<InboundEvent>> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;

    let events = raw
        .split(|byte| *byte == b'\n')
        .enumerate()
        .filter_map(|(index, line)| decode_line(line, "replay", index + 1))
        .collect();
    Ok(events)
}

impl DriverLink {
    /// Feeds a recorded session with a fixed delay between events.
    pub(crate) fn replay(path: &Path, interval: Duration) -> Result<Self> {
        let events = read_replay_file(path)?;
        let description = format!("replay {}", path.display());
        debug!(events = events.len(), %description, "starting replay");

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("driver-replay".to_owned())
            .spawn(move || {
                for event in events {
                    if tx.send(event).is_err() {
                        break;
                    }
                    if !interval.is_zero() {
                        thread::sleep(interval);
                    }
                }
            })
            .context("failed to spawn replay thread")?;

        Ok(Self {
            description,
            inbound: rx,
            outbound: None,
            disconnected: false,
        })
    }
}
