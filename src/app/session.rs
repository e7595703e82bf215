use tracing::{debug, error, info, warn};

use crate::scan::{
    AnnotationIndex, GraphStore, HostObservation, InboundEvent, OutboundEvent, PortObservation,
    ScanError, ScanLifecycle, ScanPhase, StalePolicy, TierPolicy, Transition,
};

use super::physics::{LayoutConfig, LayoutEngine};
use super::projector::{SessionView, project};

/// Port list the driver scans when none is given.
pub(crate) const DEFAULT_PORT_SPEC: &str = "1-1000";

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SessionOptions {
    pub tier_policy: TierPolicy,
    pub stale_policy: StalePolicy,
    pub layout: LayoutConfig,
}

/// Everything one scan view owns: lifecycle, graph, annotations and the
/// layout handle. Events are applied one at a time, in arrival order.
pub(crate) struct ScanSession {
    lifecycle: ScanLifecycle,
    graph: GraphStore,
    annotations: AnnotationIndex,
    layout: LayoutEngine,
    tier_policy: TierPolicy,
    target: Option<String>,
    revision: u64,
}

impl ScanSession {
    pub(crate) fn new(options: SessionOptions) -> Self {
        Self {
            lifecycle: ScanLifecycle::new(options.stale_policy),
            graph: GraphStore::default(),
            annotations: AnnotationIndex::default(),
            layout: LayoutEngine::new(options.layout),
            tier_policy: options.tier_policy,
            target: None,
            revision: 0,
        }
    }

    pub(crate) fn phase(&self) -> &ScanPhase {
        self.lifecycle.phase()
    }

    pub(crate) fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub(crate) fn annotations(&self) -> &AnnotationIndex {
        &self.annotations
    }

    pub(crate) fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub(crate) fn layout_mut(&mut self) -> &mut LayoutEngine {
        &mut self.layout
    }

    pub(crate) fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub(crate) fn tier_policy(&self) -> TierPolicy {
        self.tier_policy
    }

    pub(crate) fn set_tier_policy(&mut self, tier_policy: TierPolicy) {
        if self.tier_policy != tier_policy {
            info!(?tier_policy, "access tier policy changed");
            self.tier_policy = tier_policy;
            self.bump();
        }
    }

    /// Changes whenever a projection of this session could change.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn project(&self) -> SessionView {
        project(
            &self.graph,
            &self.annotations,
            self.lifecycle.phase(),
            self.tier_policy,
        )
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Applies one driver event, logging anything that had to be dropped.
    pub(crate) fn handle(&mut self, event: InboundEvent) {
        let name = event.name();
        match self.dispatch(event) {
            Ok(()) => {}
            Err(error @ ScanError::InvalidTransition { .. }) => {
                warn!(event = name, %error, "dropping driver event");
            }
            Err(error @ ScanError::OrphanReference { .. }) => {
                warn!(event = name, %error, "ignoring orphan reference");
            }
            Err(error @ ScanError::DriverReported(_)) => {
                error!(event = name, %error, "scan failed");
            }
        }
    }

    pub(crate) fn dispatch(&mut self, event: InboundEvent) -> Result<(), ScanError> {
        match event {
            InboundEvent::Connect => {
                info!("scan driver connected");
                Ok(())
            }
            InboundEvent::ScanStatus(payload) => {
                let transition = self.lifecycle.driver_status(payload.status)?;
                self.after_transition(transition);
                Ok(())
            }
            InboundEvent::ScanError(payload) => {
                let transition = self.lifecycle.driver_error(&payload.error)?;
                self.after_transition(transition);
                Err(ScanError::DriverReported(payload.error))
            }
            InboundEvent::HostData(payload) => {
                if !self.lifecycle.admits_data("host_data") {
                    return Ok(());
                }
                self.apply_host(payload.normalize())
            }
            InboundEvent::PortData(payload) => {
                if !self.lifecycle.admits_data("port_data") {
                    return Ok(());
                }
                self.apply_port(payload.normalize());
                Ok(())
            }
        }
    }

    /// Starts a new scan and returns the request for the driver. Rejected
    /// while a scan is starting or running.
    pub(crate) fn request_start(
        &mut self,
        target: &str,
        ports: &str,
    ) -> Result<OutboundEvent, ScanError> {
        let transition = self.lifecycle.request_start()?;
        let target = target.trim().to_owned();
        let ports = match ports.trim() {
            "" => DEFAULT_PORT_SPEC.to_owned(),
            ports => ports.to_owned(),
        };

        info!(%target, %ports, "scan requested");
        self.target = Some(target.clone());
        self.after_transition(transition);
        Ok(OutboundEvent::StartScan { target, ports })
    }

    /// Stops locally right away; the driver is told but not waited for.
    pub(crate) fn request_stop(&mut self) -> Result<OutboundEvent, ScanError> {
        let transition = self.lifecycle.request_stop()?;
        self.after_transition(transition);
        Ok(OutboundEvent::StopScan)
    }

    fn after_transition(&mut self, transition: Transition) {
        if transition == Transition::FreshSession {
            debug!(
                hosts = self.graph.len(),
                annotations = self.annotations.len(),
                "clearing previous session"
            );
            self.graph.clear();
            self.annotations.clear();
            self.sync_layout();
        }
        self.bump();
    }

    fn apply_host(&mut self, observation: HostObservation) -> Result<(), ScanError> {
        let HostObservation {
            host,
            status,
            ports,
            os,
            via,
        } = observation;

        let created = !self.graph.contains(&host);
        let node = self.graph.upsert_node(&host, status, ports, os);
        debug!(
            host = %node.id,
            status = node.status.label(),
            ports = node.ports.len(),
            created,
            "host observed"
        );

        let linked = match via {
            Some(via) => self.graph.upsert_link(&via, &host).map(|_| ()),
            None => Ok(()),
        };

        self.sync_layout();
        self.bump();
        linked
    }

    fn apply_port(&mut self, observation: PortObservation) {
        if !self.graph.contains(&observation.host) {
            debug!(
                host = %observation.host,
                port = observation.port,
                "port annotation ahead of its host"
            );
        }
        let superseded = self
            .annotations
            .get(&observation.host, observation.port)
            .is_some();
        debug!(
            host = %observation.host,
            port = observation.port,
            state = %observation.state,
            service = %observation.service,
            superseded,
            "port observed"
        );
        self.annotations.record(observation);
        self.bump();
    }

    fn sync_layout(&mut self) {
        if !self.graph.take_dirty() {
            return;
        }

        let node_ids = self
            .graph
            .nodes()
            .iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        let links = self
            .graph
            .links()
            .iter()
            .map(|link| (link.from.as_str(), link.to.as_str()))
            .collect::<Vec<_>>();
        self.layout.add_or_update_node_set(&node_ids, &links);
    }
}
