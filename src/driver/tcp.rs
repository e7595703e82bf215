use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::scan::{InboundEvent, OutboundEvent};

use super::{DriverLink, decode_line};

impl DriverLink {
    /// Connects to a driver speaking JSON lines over TCP.
    pub(crate) fn connect_tcp(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .with_context(|| format!("failed to connect to scan driver at {address}"))?;
        stream
            .set_nodelay(true)
            .context("failed to configure driver socket")?;
        let writer = stream
            .try_clone()
            .context("failed to clone driver socket")?;
        info!(%address, "connected to scan driver");

        let (inbound_tx, inbound_rx) = mpsc::channel();
        let (outbound_tx, outbound_rx) = mpsc::channel();

        thread::Builder::new()
            .name("driver-reader".to_owned())
            .spawn(move || read_events(stream, inbound_tx))
            .context("failed to spawn driver reader")?;
        thread::Builder::new()
            .name("driver-writer".to_owned())
            .spawn(move || write_requests(writer, outbound_rx))
            .context("failed to spawn driver writer")?;

        Ok(Self {
            description: format!("tcp {address}"),
            inbound: inbound_rx,
            outbound: Some(outbound_tx),
            disconnected: false,
        })
    }
}

/// Forwards decoded events until EOF, a read error, or the session going
/// away. Lines that fail to decode are skipped.
fn read_events(stream: TcpStream, events: Sender<InboundEvent>) {
    // The transport handshake is done; tell the session like the driver would.
    if events.send(InboundEvent::Connect).is_err() {
        return;
    }

    let mut reader = BufReader::new(stream);
    let mut raw = Vec::new();
    let mut line_number = 0;
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(%error, "driver stream read failed");
                break;
            }
        }
        line_number += 1;

        if let Some(event) = decode_line(&raw, "tcp", line_number)
            && events.send(event).is_err()
        {
            break;
        }
    }
    debug!("driver reader finished");
}

fn write_requests(mut stream: TcpStream, requests: Receiver<OutboundEvent>) {
    for request in requests {
        let line = match request.to_line() {
            Ok(line) => line,
            Err(error) => {
                warn!("{error:#}");
                continue;
            }
        };

        if let Err(error) = writeln!(stream, "{line}").and_then(|()| stream.flush()) {
            warn!(%error, "failed to send request to driver");
            break;
        }
        debug!(%line, "request sent to driver");
    }
}
