use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use super::model::{HostPort, HostStatus, OsGuess, PortState, Vulnerability, VulnerabilityTier};

/// Events produced by the external scan driver.
///
/// Framed as one JSON object per line: `{"event": "...", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    Connect,
    ScanStatus(ScanStatusPayload),
    ScanError(ScanErrorPayload),
    HostData(HostDataPayload),
    PortData(PortDataPayload),
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ScanStatus(_) => "scan_status",
            Self::ScanError(_) => "scan_error",
            Self::HostData(_) => "host_data",
            Self::PortData(_) => "port_data",
        }
    }
}

/// Requests sent back to the driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    StartScan { target: String, ports: String },
    StopScan,
}

impl OutboundEvent {
    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to encode outbound event")
    }
}

/// Reads an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Starting,
    Completed,
    #[serde(other)]
    Unrecognized,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ScanStatusPayload {
    pub status: DriverStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ScanErrorPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RawVulnerability {
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: VulnerabilityTier,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

impl RawVulnerability {
    /// `description` wins over the older `details` key when both are sent.
    pub fn normalize(self) -> Vulnerability {
        let description = self
            .description
            .filter(|text| !text.trim().is_empty())
            .or(self.details)
            .unwrap_or_default();

        Vulnerability {
            tier: self.level,
            description,
            recommendations: self.recommendations,
        }
    }
}

/// nmap reports accuracy as a number or a numeric string depending on the
/// library in front of it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAccuracy {
    Number(f32),
    Text(String),
    Other(serde_json::Value),
}

impl RawAccuracy {
    fn value(&self) -> Option<f32> {
        let accuracy = match self {
            Self::Number(accuracy) => *accuracy,
            Self::Text(text) => text.trim().trim_end_matches('%').parse().ok()?,
            Self::Other(_) => return None,
        };
        accuracy.is_finite().then_some(accuracy)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RawOsGuess {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub accuracy: Option<RawAccuracy>,
}

impl RawOsGuess {
    /// Guesses without a name or with an unreadable accuracy are dropped.
    fn normalize(self) -> Option<OsGuess> {
        let name = self.name.map(|name| name.trim().to_owned())?;
        if name.is_empty() {
            return None;
        }
        let accuracy = match &self.accuracy {
            Some(accuracy) => accuracy.value()?,
            None => 0.0,
        };
        Some(OsGuess { name, accuracy })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RawHostPort {
    pub port: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: PortState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub vulnerabilities: Option<RawVulnerability>,
}

impl RawHostPort {
    fn normalize(self) -> HostPort {
        HostPort {
            port: self.port,
            state: self.state,
            service: self.service,
            version: self.version.filter(|version| !version.is_empty()),
            vulnerability: self.vulnerabilities.map(RawVulnerability::normalize),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HostDataPayload {
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: HostStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<RawHostPort>,
    #[serde(default)]
    pub os: Option<Vec<RawOsGuess>>,
    /// Upstream hop this host was reached through, linked when known.
    #[serde(default)]
    pub via: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HostObservation {
    pub host: String,
    pub status: HostStatus,
    pub ports: Vec<HostPort>,
    pub os: Option<Vec<OsGuess>>,
    pub via: Option<String>,
}

impl HostDataPayload {
    pub fn normalize(self) -> HostObservation {
        HostObservation {
            host: self.host.trim().to_owned(),
            status: self.status,
            ports: self.ports.into_iter().map(RawHostPort::normalize).collect(),
            os: self
                .os
                .map(|guesses| {
                    guesses
                        .into_iter()
                        .filter_map(RawOsGuess::normalize)
                        .collect::<Vec<_>>()
                })
                .filter(|guesses| !guesses.is_empty()),
            via: self
                .via
                .map(|via| via.trim().to_owned())
                .filter(|via| !via.is_empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PortDataPayload {
    pub host: String,
    pub port: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: PortState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_pro: bool,
    #[serde(default)]
    pub vulnerabilities: Option<RawVulnerability>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortObservation {
    pub host: String,
    pub port: u16,
    pub state: PortState,
    pub service: String,
    pub version: Option<String>,
    pub is_pro: bool,
    pub vulnerability: Option<Vulnerability>,
}

impl PortDataPayload {
    pub fn normalize(self) -> PortObservation {
        PortObservation {
            host: self.host.trim().to_owned(),
            port: self.port,
            state: self.state,
            service: self.service,
            version: self.version.filter(|version| !version.is_empty()),
            is_pro: self.is_pro,
            vulnerability: self.vulnerabilities.map(RawVulnerability::normalize),
        }
    }
}

/// Parses one line of the driver stream. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<InboundEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let event = serde_json::from_str(line)
        .with_context(|| format!("invalid driver event line: {line}"))?;
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_without_data() {
        let event = parse_line(r#"{"event":"connect"}"#).unwrap();
        assert_eq!(event, Some(InboundEvent::Connect));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"event":"teleport","data":{}}"#).is_err());
    }

    #[test]
    fn unknown_scan_status_is_kept_as_unrecognized() {
        let event = parse_line(r#"{"event":"scan_status","data":{"status":"paused"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            InboundEvent::ScanStatus(ScanStatusPayload {
                status: DriverStatus::Unrecognized
            })
        );
    }

    #[test]
    fn port_data_falls_back_to_details_text() {
        let line = r#"{"event":"port_data","data":{
            "host":"10.0.0.7","port":21,"state":"open","service":"ftp","is_pro":true,
            "vulnerabilities":{"level":"advanced","details":"Anonymous login enabled",
                "recommendations":["Disable anonymous access","Use SFTP"]}}}"#;
        let Some(InboundEvent::PortData(payload)) = parse_line(line).unwrap() else {
            panic!("expected port_data");
        };

        let observation = payload.normalize();
        let vulnerability = observation.vulnerability.expect("vulnerability parsed");
        assert_eq!(vulnerability.tier, VulnerabilityTier::Advanced);
        assert_eq!(vulnerability.description, "Anonymous login enabled");
        assert_eq!(
            vulnerability.recommendations,
            vec!["Disable anonymous access", "Use SFTP"]
        );
        assert!(observation.is_pro);
    }

    #[test]
    fn host_data_normalizes_ports_and_via() {
        let line = r#"{"event":"host_data","data":{
            "host":" 10.0.0.5 ","status":"up","via":"",
            "ports":[{"port":22,"state":"open","service":"ssh","version":""}],
            "os":[{"name":"Linux 5.x","accuracy":96}]}}"#;
        let Some(InboundEvent::HostData(payload)) = parse_line(line).unwrap() else {
            panic!("expected host_data");
        };

        let observation = payload.normalize();
        assert_eq!(observation.host, "10.0.0.5");
        assert_eq!(observation.status, HostStatus::Up);
        assert_eq!(observation.via, None);
        assert_eq!(observation.ports.len(), 1);
        assert_eq!(observation.ports[0].version, None);
        assert_eq!(observation.os.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn explicit_nulls_read_like_missing_keys() {
        let line = r#"{"event":"port_data","data":{
            "host":"10.0.0.7","port":21,"state":"open","service":null,"is_pro":null,
            "vulnerabilities":{"level":null,"description":"Anonymous login enabled",
                "recommendations":null}}}"#;
        let Some(InboundEvent::PortData(payload)) = parse_line(line).unwrap() else {
            panic!("expected port_data");
        };

        let observation = payload.normalize();
        assert_eq!(observation.service, "");
        assert!(!observation.is_pro);
        let vulnerability = observation.vulnerability.expect("vulnerability parsed");
        assert_eq!(vulnerability.tier, VulnerabilityTier::Unspecified);
        assert!(vulnerability.recommendations.is_empty());

        let host = parse_line(
            r#"{"event":"host_data","data":{"host":"10.0.0.7","status":null,"ports":null}}"#,
        )
        .unwrap();
        assert!(matches!(host, Some(InboundEvent::HostData(payload)) if payload.ports.is_empty()));

        let error = parse_line(r#"{"event":"scan_error","data":{"error":null}}"#).unwrap();
        assert_eq!(
            error,
            Some(InboundEvent::ScanError(ScanErrorPayload {
                error: String::new()
            }))
        );
    }

    #[test]
    fn os_accuracy_accepts_numeric_strings_and_drops_unreadable_guesses() {
        let line = r#"{"event":"host_data","data":{
            "host":"10.0.0.5","status":"up","ports":[],
            "os":[{"name":"Linux 5.x","accuracy":"96"},
                  {"name":"FreeBSD","accuracy":"high"},
                  {"name":"OpenBSD","accuracy":{"value":3}},
                  {"name":"Windows","accuracy":87.5}]}}"#;
        let Some(InboundEvent::HostData(payload)) = parse_line(line).unwrap() else {
            panic!("expected host_data");
        };

        let observation = payload.normalize();
        assert_eq!(observation.host, "10.0.0.5");
        assert_eq!(
            observation.os,
            Some(vec![
                OsGuess {
                    name: "Linux 5.x".to_owned(),
                    accuracy: 96.0
                },
                OsGuess {
                    name: "Windows".to_owned(),
                    accuracy: 87.5
                },
            ])
        );
    }

    #[test]
    fn host_survives_when_no_os_guess_is_readable() {
        let line = r#"{"event":"host_data","data":{
            "host":"10.0.0.5","status":"up","ports":[],
            "os":[{"name":"Linux","accuracy":"unknown"}]}}"#;
        let Some(InboundEvent::HostData(payload)) = parse_line(line).unwrap() else {
            panic!("expected host_data");
        };

        let observation = payload.normalize();
        assert_eq!(observation.status, HostStatus::Up);
        assert_eq!(observation.os, None);
    }

    #[test]
    fn outbound_events_use_the_same_framing() {
        let start = OutboundEvent::StartScan {
            target: "10.0.0.0/24".to_owned(),
            ports: "22,80".to_owned(),
        };
        let value: serde_json::Value = serde_json::from_str(&start.to_line().unwrap()).unwrap();
        assert_eq!(value["event"], "start_scan");
        assert_eq!(value["data"]["target"], "10.0.0.0/24");
        assert_eq!(value["data"]["ports"], "22,80");

        let stop: serde_json::Value =
            serde_json::from_str(&OutboundEvent::StopScan.to_line().unwrap()).unwrap();
        assert_eq!(stop["event"], "stop_scan");
    }
}
