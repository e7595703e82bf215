use thiserror::Error;

use super::lifecycle::ScanPhase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("`{event}` is not valid while the scan is {phase}")]
    InvalidTransition { event: &'static str, phase: ScanPhase },
    #[error("{kind} references unknown host '{identity}'")]
    OrphanReference {
        kind: &'static str,
        identity: String,
    },
    #[error("scan driver reported: {0}")]
    DriverReported(String),
}
