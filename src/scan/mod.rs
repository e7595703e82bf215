mod annotations;
mod error;
mod events;
mod graph;
mod lifecycle;
mod model;

pub use annotations::{AnnotationIndex, PortAnnotation};
pub use error::ScanError;
pub use events::{HostObservation, InboundEvent, OutboundEvent, PortObservation, parse_line};
pub use graph::{GraphStore, HostNode};
pub use lifecycle::{ScanLifecycle, ScanPhase, StalePolicy, Transition};
pub use model::{
    AccessTier, HostPort, HostStatus, PortState, TierPolicy, Vulnerability, VulnerabilityTier,
};
