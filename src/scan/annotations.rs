use std::collections::{BTreeMap, HashMap};

use super::events::PortObservation;
use super::graph::GraphStore;
use super::model::{AccessTier, PortState, Vulnerability};

/// Latest known state of one (host, port) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortAnnotation {
    pub port: u16,
    pub state: PortState,
    pub service: String,
    pub version: Option<String>,
    pub vulnerability: Option<Vulnerability>,
    /// Tier the driver attached to this observation. Rendering still goes
    /// through a `TierPolicy`.
    pub record_tier: AccessTier,
}

/// Per-host port annotations. Entries may exist for hosts the graph has
/// not seen yet; they show up once the host does.
#[derive(Debug, Default)]
pub struct AnnotationIndex {
    hosts: HashMap<String, BTreeMap<u16, PortAnnotation>>,
}

impl AnnotationIndex {
    pub fn record(&mut self, observation: PortObservation) {
        let annotation = PortAnnotation {
            port: observation.port,
            state: observation.state,
            service: observation.service,
            version: observation.version,
            vulnerability: observation.vulnerability,
            record_tier: AccessTier::from_pro_flag(observation.is_pro),
        };

        self.hosts
            .entry(observation.host)
            .or_default()
            .insert(annotation.port, annotation);
    }

    pub fn get(&self, host: &str, port: u16) -> Option<&PortAnnotation> {
        self.hosts.get(host).and_then(|ports| ports.get(&port))
    }

    /// Annotations of one host in ascending port order.
    pub fn ports_for(&self, host: &str) -> impl Iterator<Item = &PortAnnotation> {
        self.hosts.get(host).into_iter().flat_map(BTreeMap::values)
    }

    pub fn host_has_vulnerability(&self, host: &str) -> bool {
        self.ports_for(host)
            .any(|annotation| annotation.vulnerability.is_some())
    }

    /// Number of annotated hosts the graph does not contain yet.
    pub fn orphan_hosts(&self, graph: &GraphStore) -> usize {
        self.hosts
            .keys()
            .filter(|host| !graph.contains(host))
            .count()
    }

    /// Total number of annotated (host, port) pairs.
    pub fn len(&self) -> usize {
        self.hosts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::model::{HostStatus, VulnerabilityTier};

    fn observation(host: &str, port: u16, state: PortState, service: &str) -> PortObservation {
        PortObservation {
            host: host.to_owned(),
            port,
            state,
            service: service.to_owned(),
            version: None,
            is_pro: false,
            vulnerability: None,
        }
    }

    #[test]
    fn latest_observation_wins() {
        let mut index = AnnotationIndex::default();
        index.record(observation("10.0.0.5", 80, PortState::Filtered, "http"));
        index.record(observation("10.0.0.5", 80, PortState::Closed, "http"));

        let mut last = observation("10.0.0.5", 80, PortState::Open, "http-proxy");
        last.is_pro = true;
        last.vulnerability = Some(Vulnerability {
            tier: VulnerabilityTier::Basic,
            description: "Cleartext HTTP".to_owned(),
            recommendations: vec!["Redirect to HTTPS".to_owned()],
        });
        index.record(last.clone());

        let stored = index.get("10.0.0.5", 80).unwrap();
        assert_eq!(stored.state, PortState::Open);
        assert_eq!(stored.service, "http-proxy");
        assert_eq!(stored.vulnerability, last.vulnerability);
        assert_eq!(stored.record_tier, AccessTier::Full);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn a_later_observation_can_drop_the_vulnerability() {
        let mut index = AnnotationIndex::default();
        let mut first = observation("10.0.0.5", 21, PortState::Open, "ftp");
        first.vulnerability = Some(Vulnerability::default());
        index.record(first);
        assert!(index.host_has_vulnerability("10.0.0.5"));

        index.record(observation("10.0.0.5", 21, PortState::Closed, "ftp"));
        assert!(!index.host_has_vulnerability("10.0.0.5"));
    }

    #[test]
    fn ports_are_listed_in_ascending_order() {
        let mut index = AnnotationIndex::default();
        index.record(observation("10.0.0.5", 443, PortState::Open, "https"));
        index.record(observation("10.0.0.5", 22, PortState::Open, "ssh"));
        index.record(observation("10.0.0.6", 80, PortState::Open, "http"));

        let ports = index
            .ports_for("10.0.0.5")
            .map(|annotation| annotation.port)
            .collect::<Vec<_>>();
        assert_eq!(ports, vec![22, 443]);
        assert_eq!(index.ports_for("10.0.0.7").count(), 0);
    }

    #[test]
    fn annotations_ahead_of_their_host_are_orphans_until_it_appears() {
        let mut index = AnnotationIndex::default();
        let mut graph = GraphStore::default();
        index.record(observation("10.0.0.9", 22, PortState::Open, "ssh"));
        assert_eq!(index.orphan_hosts(&graph), 1);

        graph.upsert_node("10.0.0.9", HostStatus::Up, Vec::new(), None);
        assert_eq!(index.orphan_hosts(&graph), 0);
    }
}
