use std::collections::{HashMap, HashSet};

use super::error::ScanError;
use super::model::{HostPort, HostStatus, OsGuess};

#[derive(Clone, Debug, PartialEq)]
pub struct HostNode {
    pub id: String,
    pub status: HostStatus,
    pub ports: Vec<HostPort>,
    /// Sorted by accuracy, best guess first.
    pub os_guesses: Vec<OsGuess>,
}

impl HostNode {
    pub fn best_os_guess(&self) -> Option<&OsGuess> {
        self.os_guesses.first()
    }

    pub fn has_vulnerable_port(&self) -> bool {
        self.ports.iter().any(|port| port.vulnerability.is_some())
    }
}

/// Undirected relation between two hosts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: String,
    pub to: String,
}

impl Link {
    fn key(&self) -> (String, String) {
        if self.from <= self.to {
            (self.from.clone(), self.to.clone())
        } else {
            (self.to.clone(), self.from.clone())
        }
    }
}

/// Authoritative set of discovered hosts and the links between them.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<HostNode>,
    index_by_id: HashMap<String, usize>,
    links: Vec<Link>,
    link_keys: HashSet<(String, String)>,
    dirty: bool,
}

impl GraphStore {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&HostNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    /// Hosts in first-observation order.
    pub fn nodes(&self) -> &[HostNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns whether the store changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn touch(&mut self) {
        self.dirty = true;
    }

    /// Inserts or updates a host. Guesses are only replaced when the
    /// observation carries some.
    pub fn upsert_node(
        &mut self,
        id: &str,
        status: HostStatus,
        ports: Vec<HostPort>,
        os: Option<Vec<OsGuess>>,
    ) -> &HostNode {
        let os_guesses = os.map(|mut guesses| {
            guesses.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
            guesses
        });

        let index = match self.index_by_id.get(id) {
            Some(&index) => {
                let node = &mut self.nodes[index];
                node.status = status;
                node.ports = ports;
                if let Some(guesses) = os_guesses {
                    node.os_guesses = guesses;
                }
                index
            }
            None => {
                let index = self.nodes.len();
                self.nodes.push(HostNode {
                    id: id.to_owned(),
                    status,
                    ports,
                    os_guesses: os_guesses.unwrap_or_default(),
                });
                self.index_by_id.insert(id.to_owned(), index);
                index
            }
        };

        self.touch();
        &self.nodes[index]
    }

    /// Adds a link between two known hosts. `Ok(false)` means an equivalent
    /// link already existed.
    pub fn upsert_link(&mut self, from: &str, to: &str) -> Result<bool, ScanError> {
        for endpoint in [from, to] {
            if !self.contains(endpoint) {
                return Err(ScanError::OrphanReference {
                    kind: "link",
                    identity: endpoint.to_owned(),
                });
            }
        }
        if from == to {
            return Err(ScanError::OrphanReference {
                kind: "self link",
                identity: from.to_owned(),
            });
        }

        let link = Link {
            from: from.to_owned(),
            to: to.to_owned(),
        };
        if !self.link_keys.insert(link.key()) {
            return Ok(false);
        }

        self.links.push(link);
        self.touch();
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index_by_id.clear();
        self.links.clear();
        self.link_keys.clear();
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::model::PortState;

    fn ssh_port() -> HostPort {
        HostPort {
            port: 22,
            state: PortState::Open,
            service: "ssh".to_owned(),
            version: None,
            vulnerability: None,
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = GraphStore::default();
        store.upsert_node("10.0.0.5", HostStatus::Up, vec![ssh_port()], None);
        let first = store.nodes().to_vec();

        store.upsert_node("10.0.0.5", HostStatus::Up, vec![ssh_port()], None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.nodes(), first.as_slice());
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut store = GraphStore::default();
        store.upsert_node("10.0.0.1", HostStatus::Unknown, Vec::new(), None);
        store.upsert_node("10.0.0.2", HostStatus::Up, Vec::new(), None);

        let updated = store.upsert_node("10.0.0.1", HostStatus::Down, vec![ssh_port()], None);
        assert_eq!(updated.status, HostStatus::Down);
        assert_eq!(updated.ports.len(), 1);
        assert_eq!(store.index_of("10.0.0.1"), Some(0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn os_guesses_are_sorted_and_kept_when_absent() {
        let mut store = GraphStore::default();
        let guesses = vec![
            OsGuess {
                name: "Windows 10".to_owned(),
                accuracy: 71.0,
            },
            OsGuess {
                name: "Linux 5.x".to_owned(),
                accuracy: 96.0,
            },
        ];
        store.upsert_node("10.0.0.9", HostStatus::Up, Vec::new(), Some(guesses));
        store.upsert_node("10.0.0.9", HostStatus::Up, Vec::new(), None);

        let node = store.get("10.0.0.9").unwrap();
        assert_eq!(node.best_os_guess().map(|guess| guess.name.as_str()), Some("Linux 5.x"));
        assert_eq!(node.os_guesses.len(), 2);
    }

    #[test]
    fn links_are_undirected_and_idempotent() {
        let mut store = GraphStore::default();
        store.upsert_node("10.0.0.1", HostStatus::Up, Vec::new(), None);
        store.upsert_node("10.0.0.2", HostStatus::Up, Vec::new(), None);

        assert_eq!(store.upsert_link("10.0.0.1", "10.0.0.2"), Ok(true));
        assert_eq!(store.upsert_link("10.0.0.1", "10.0.0.2"), Ok(false));
        assert_eq!(store.upsert_link("10.0.0.2", "10.0.0.1"), Ok(false));
        assert_eq!(store.links().len(), 1);
    }

    #[test]
    fn links_to_unknown_hosts_are_rejected() {
        let mut store = GraphStore::default();
        store.upsert_node("10.0.0.1", HostStatus::Up, Vec::new(), None);

        assert!(matches!(
            store.upsert_link("10.0.0.1", "10.0.0.99"),
            Err(ScanError::OrphanReference { .. })
        ));
        assert!(store.upsert_link("10.0.0.1", "10.0.0.1").is_err());
        assert!(store.links().is_empty());
    }

    #[test]
    fn clear_drops_everything_and_marks_dirty() {
        let mut store = GraphStore::default();
        store.upsert_node("10.0.0.1", HostStatus::Up, Vec::new(), None);
        store.upsert_node("10.0.0.2", HostStatus::Up, Vec::new(), None);
        store.upsert_link("10.0.0.1", "10.0.0.2").unwrap();
        assert!(store.take_dirty());
        assert!(!store.take_dirty());

        store.clear();
        assert!(store.is_empty());
        assert!(store.links().is_empty());
        assert!(!store.contains("10.0.0.1"));
        assert!(store.take_dirty());
    }
}
