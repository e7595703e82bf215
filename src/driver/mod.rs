//! Bridges the external scan driver onto a single-consumer channel.
//!
//! Reader and writer threads only own channel endpoints; every event is
//! applied later on the UI thread, one at a time.

mod replay;
mod tcp;

use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use tracing::{info, warn};

use crate::scan::{InboundEvent, OutboundEvent, parse_line};

pub(crate) struct DriverLink {
    description: String,
    inbound: Receiver<InboundEvent>,
    outbound: Option<Sender<OutboundEvent>>,
    disconnected: bool,
}

impl DriverLink {
    /// A link with no driver behind it. Outbound requests are only logged.
    pub(crate) fn detached() -> Self {
        let (_tx, rx) = std::sync::mpsc::channel();
        Self {
            description: "no driver".to_owned(),
            inbound: rx,
            outbound: None,
            disconnected: true,
        }
    }

    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn is_connected(&self) -> bool {
        !self.disconnected
    }

    pub(crate) fn send(&mut self, event: OutboundEvent) {
        let Some(outbound) = &self.outbound else {
            info!(?event, link = %self.description, "no driver attached; request not forwarded");
            return;
        };

        if outbound.send(event).is_err() {
            warn!(link = %self.description, "driver writer is gone; dropping request");
            self.outbound = None;
        }
    }

    /// Takes up to `limit` pending events without blocking.
    pub(crate) fn drain(&mut self, limit: usize) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        while events.len() < limit {
            match self.inbound.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        info!(link = %self.description, "driver stream ended");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        events
    }
}

/// Decodes one raw line of driver output. Undecodable lines are logged and
/// yield `None`; the caller keeps reading.
fn decode_line(raw: &[u8], source: &str, line_number: usize) -> Option<InboundEvent> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(error) => {
            warn!(%source, line = line_number, %error, "skipping driver line that is not UTF-8");
            return None;
        }
    };

    match parse_line(text) {
        Ok(event) => event,
        Err(error) => {
            warn!(%source, line = line_number, "skipping driver line: {error:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::{Duration, Instant};

    use super::*;

    fn drain_until(link: &mut DriverLink, count: usize) -> Vec<InboundEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < count && Instant::now() < deadline {
            events.extend(link.drain(64));
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn detached_link_accepts_requests_and_yields_nothing() {
        let mut link = DriverLink::detached();
        link.send(OutboundEvent::StopScan);
        assert!(link.drain(16).is_empty());
        assert!(!link.is_connected());
    }

    #[test]
    fn replay_streams_every_valid_line_in_order() {
        let path = std::env::temp_dir().join(format!(
            "scan-topology-replay-{}.jsonl",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"event":"scan_status","data":{{"status":"starting"}}}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"event":"host_data","data":{{"host":"10.0.0.5","status":"up","ports":[]}}}}"#
        )
        .unwrap();
        drop(file);

        let mut link = DriverLink::replay(&path, Duration::ZERO).unwrap();
        let events = drain_until(&mut link, 2);
        std::fs::remove_file(&path).ok();

        let names = events.iter().map(InboundEvent::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["scan_status", "host_data"]);
    }

    #[test]
    fn replay_skips_lines_that_are_not_utf8() {
        let path = std::env::temp_dir().join(format!(
            "scan-topology-replay-bytes-{}.jsonl",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        writeln!(
            file,
            r#"{{"event":"host_data","data":{{"host":"10.0.0.7","status":"up","ports":[]}}}}"#
        )
        .unwrap();
        drop(file);

        let mut link = DriverLink::replay(&path, Duration::ZERO).unwrap();
        let events = drain_until(&mut link, 1);
        std::fs::remove_file(&path).ok();

        let names = events.iter().map(InboundEvent::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["host_data"]);
    }

    #[test]
    fn tcp_stream_survives_lines_that_are_not_utf8() {
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let driver = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"\xff\xfe garbage\n").unwrap();
            writeln!(
                stream,
                r#"{{"event":"host_data","data":{{"host":"10.0.0.7","status":"up","ports":[]}}}}"#
            )
            .unwrap();
            writeln!(
                stream,
                r#"{{"event":"scan_status","data":{{"status":"completed"}}}}"#
            )
            .unwrap();
        });

        let mut link = DriverLink::connect_tcp(&address).unwrap();
        let events = drain_until(&mut link, 3);
        driver.join().unwrap();

        let names = events.iter().map(InboundEvent::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["connect", "host_data", "scan_status"]);
    }

    #[test]
    fn tcp_link_round_trips_events() {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let driver = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            writeln!(
                writer,
                r#"{{"event":"scan_status","data":{{"status":"starting"}}}}"#
            )
            .unwrap();
            let mut request = String::new();
            BufReader::new(stream).read_line(&mut request).unwrap();
            request
        });

        let mut link = DriverLink::connect_tcp(&address).unwrap();
        let events = drain_until(&mut link, 2);
        assert_eq!(events.first(), Some(&InboundEvent::Connect));
        assert_eq!(events.get(1).map(InboundEvent::name), Some("scan_status"));

        link.send(OutboundEvent::StopScan);
        let request = driver.join().unwrap();
        let value: serde_json::Value = serde_json::from_str(&request).unwrap();
        assert_eq!(value["event"], "stop_scan");
    }
}
