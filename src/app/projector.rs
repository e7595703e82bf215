//! Pure derivation of what the UI shows from the current session state.
//!
//! Nothing here is cached or stored back; the same inputs always produce an
//! equal [`SessionView`], so projecting once per incoming event is safe.

use crate::scan::{
    AccessTier, AnnotationIndex, GraphStore, HostNode, HostStatus, PortAnnotation, ScanPhase,
    TierPolicy, VulnerabilityTier,
};
use crate::util::format_accuracy;

pub(crate) const GENERIC_RISK_NOTICE: &str = "Potential security risk detected";
pub(crate) const UPSELL_NOTICE: &str = "Upgrade to Pro for detailed vulnerability analysis";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeTone {
    Alert,
    Positive,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BadgeTone {
    Success,
    Danger,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BannerTone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Badge {
    pub text: String,
    pub tone: BadgeTone,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum VulnerabilityPanel {
    Full {
        heading: String,
        description: String,
        recommendations: Vec<String>,
    },
    /// Restricted tier: only says that something was found.
    Teaser { heading: String, notice: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PortCard {
    pub port: u16,
    pub title: String,
    pub state_badge: Badge,
    pub service_badge: Option<Badge>,
    pub vulnerability: Option<VulnerabilityPanel>,
    pub upsell: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct HostView {
    pub id: String,
    pub label: String,
    pub tone: NodeTone,
    pub status: HostStatus,
    pub os_label: Option<String>,
    pub cards: Vec<PortCard>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StatusBanner {
    pub tone: BannerTone,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ControlState {
    pub can_start: bool,
    pub can_stop: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SessionView {
    pub banner: StatusBanner,
    pub controls: ControlState,
    /// Same order as the graph store.
    pub hosts: Vec<HostView>,
    /// Index pairs into `hosts`.
    pub links: Vec<(usize, usize)>,
    pub orphan_annotations: usize,
}

impl SessionView {
    pub(crate) fn host(&self, id: &str) -> Option<&HostView> {
        self.hosts.iter().find(|host| host.id == id)
    }
}

pub(crate) fn project(
    graph: &GraphStore,
    annotations: &AnnotationIndex,
    phase: &ScanPhase,
    tier_policy: TierPolicy,
) -> SessionView {
    let hosts = graph
        .nodes()
        .iter()
        .map(|node| project_host(node, annotations, tier_policy))
        .collect();

    let links = graph
        .links()
        .iter()
        .filter_map(|link| Some((graph.index_of(&link.from)?, graph.index_of(&link.to)?)))
        .collect();

    SessionView {
        banner: banner_for(phase),
        controls: ControlState {
            can_start: !phase.is_active(),
            can_stop: phase.is_active(),
        },
        hosts,
        links,
        orphan_annotations: annotations.orphan_hosts(graph),
    }
}

fn project_host(node: &HostNode, annotations: &AnnotationIndex, tier_policy: TierPolicy) -> HostView {
    let tone = if node.has_vulnerable_port() || annotations.host_has_vulnerability(&node.id) {
        NodeTone::Alert
    } else if node.status == HostStatus::Up {
        NodeTone::Positive
    } else {
        NodeTone::Neutral
    };

    let os_label = node
        .best_os_guess()
        .map(|guess| format!("{} ({})", guess.name, format_accuracy(guess.accuracy)));

    HostView {
        id: node.id.clone(),
        label: node.id.clone(),
        tone,
        status: node.status,
        os_label,
        cards: annotations
            .ports_for(&node.id)
            .map(|annotation| port_card(annotation, tier_policy.effective(annotation.record_tier)))
            .collect(),
    }
}

pub(crate) fn port_card(annotation: &PortAnnotation, tier: AccessTier) -> PortCard {
    let open = annotation.state.is_open();
    let service_badge = open.then(|| Badge {
        text: match &annotation.version {
            Some(version) => format!("{} {version}", annotation.service),
            None => annotation.service.clone(),
        },
        tone: BadgeTone::Secondary,
    });

    let vulnerability = annotation.vulnerability.as_ref().map(|vulnerability| {
        let heading = if vulnerability.tier == VulnerabilityTier::Advanced {
            "Security Warning (Pro)".to_owned()
        } else {
            "Security Warning".to_owned()
        };

        match tier {
            AccessTier::Full => VulnerabilityPanel::Full {
                heading,
                description: if vulnerability.description.trim().is_empty() {
                    GENERIC_RISK_NOTICE.to_owned()
                } else {
                    vulnerability.description.clone()
                },
                recommendations: vulnerability.recommendations.clone(),
            },
            AccessTier::Restricted => VulnerabilityPanel::Teaser {
                heading,
                notice: GENERIC_RISK_NOTICE.to_owned(),
            },
        }
    });

    PortCard {
        port: annotation.port,
        title: format!("Port {} - {}", annotation.port, annotation.service),
        state_badge: Badge {
            text: annotation.state.to_string(),
            tone: if open {
                BadgeTone::Success
            } else {
                BadgeTone::Danger
            },
        },
        service_badge,
        upsell: tier == AccessTier::Restricted && (open || vulnerability.is_some()),
        vulnerability,
    }
}

fn banner_for(phase: &ScanPhase) -> StatusBanner {
    let (tone, text) = match phase {
        ScanPhase::Idle => (BannerTone::Neutral, "Ready to scan".to_owned()),
        ScanPhase::Starting => (BannerTone::Info, "Starting scan...".to_owned()),
        ScanPhase::Running => (BannerTone::Info, "Scan in progress...".to_owned()),
        ScanPhase::Completed => (BannerTone::Success, "Scan completed".to_owned()),
        ScanPhase::Error(message) => (BannerTone::Danger, format!("Error: {message}")),
        ScanPhase::Stopped => (BannerTone::Warning, "Scan stopped by user".to_owned()),
    };
    StatusBanner { tone, text }
}
