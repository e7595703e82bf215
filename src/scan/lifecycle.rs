use std::fmt;

use tracing::{debug, info};

use super::error::ScanError;
use super::events::DriverStatus;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ScanPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Completed,
    Error(String),
    Stopped,
}

impl ScanPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error(_) => "error",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the caller must do after a transition was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Phase changed; existing graph data stays.
    Advanced,
    /// A fresh session began; graph, annotations and layout must be cleared.
    FreshSession,
}

/// Whether host/port data arriving outside an active scan is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StalePolicy {
    #[default]
    Accept,
    Drop,
}

#[derive(Debug, Default)]
pub struct ScanLifecycle {
    phase: ScanPhase,
    stale_policy: StalePolicy,
}

impl ScanLifecycle {
    pub fn new(stale_policy: StalePolicy) -> Self {
        Self {
            phase: ScanPhase::Idle,
            stale_policy,
        }
    }

    pub fn phase(&self) -> &ScanPhase {
        &self.phase
    }

    pub fn can_start(&self) -> bool {
        !self.phase.is_active()
    }

    pub fn can_stop(&self) -> bool {
        self.phase.is_active()
    }

    fn enter(&mut self, next: ScanPhase) {
        info!(from = %self.phase, to = %next, "scan phase changed");
        self.phase = next;
    }

    fn reject(&self, event: &'static str) -> ScanError {
        ScanError::InvalidTransition {
            event,
            phase: self.phase.clone(),
        }
    }

    pub fn request_start(&mut self) -> Result<Transition, ScanError> {
        if !self.can_start() {
            return Err(self.reject("start_scan"));
        }

        self.enter(ScanPhase::Starting);
        Ok(Transition::FreshSession)
    }

    pub fn request_stop(&mut self) -> Result<Transition, ScanError> {
        if !self.can_stop() {
            return Err(self.reject("stop_scan"));
        }

        self.enter(ScanPhase::Stopped);
        Ok(Transition::Advanced)
    }

    pub fn driver_status(&mut self, status: DriverStatus) -> Result<Transition, ScanError> {
        match (status, &self.phase) {
            (DriverStatus::Starting, ScanPhase::Starting) => {
                self.enter(ScanPhase::Running);
                Ok(Transition::Advanced)
            }
            (DriverStatus::Starting, _) => {
                self.enter(ScanPhase::Running);
                Ok(Transition::FreshSession)
            }
            (
                DriverStatus::Completed,
                ScanPhase::Starting | ScanPhase::Running | ScanPhase::Stopped,
            ) => {
                self.enter(ScanPhase::Completed);
                Ok(Transition::Advanced)
            }
            (DriverStatus::Completed, _) => Err(self.reject("scan_status(completed)")),
            (DriverStatus::Unrecognized, _) => Err(self.reject("scan_status(unrecognized)")),
        }
    }

    pub fn driver_error(&mut self, message: &str) -> Result<Transition, ScanError> {
        match self.phase {
            ScanPhase::Starting | ScanPhase::Running | ScanPhase::Stopped => {
                self.enter(ScanPhase::Error(message.to_owned()));
                Ok(Transition::Advanced)
            }
            _ => Err(self.reject("scan_error")),
        }
    }

    /// Returns whether a host/port data event should be applied now.
    pub fn admits_data(&self, event: &'static str) -> bool {
        if self.phase.is_active() {
            return true;
        }

        match self.stale_policy {
            StalePolicy::Accept => {
                debug!(event, phase = %self.phase, "applying stale data event");
                true
            }
            StalePolicy::Drop => {
                debug!(event, phase = %self.phase, "dropping stale data event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> ScanLifecycle {
        let mut lifecycle = ScanLifecycle::default();
        lifecycle.request_start().unwrap();
        lifecycle.driver_status(DriverStatus::Starting).unwrap();
        lifecycle
    }

    #[test]
    fn start_is_rejected_while_active() {
        let mut lifecycle = ScanLifecycle::default();
        assert_eq!(lifecycle.request_start(), Ok(Transition::FreshSession));
        assert!(matches!(
            lifecycle.request_start(),
            Err(ScanError::InvalidTransition { .. })
        ));

        lifecycle.driver_status(DriverStatus::Starting).unwrap();
        assert_eq!(lifecycle.phase(), &ScanPhase::Running);
        assert!(lifecycle.request_start().is_err());
    }

    #[test]
    fn start_is_allowed_from_every_terminal_phase() {
        let mut completed = running();
        completed.driver_status(DriverStatus::Completed).unwrap();
        assert_eq!(completed.request_start(), Ok(Transition::FreshSession));

        let mut failed = running();
        failed.driver_error("nmap not found").unwrap();
        assert_eq!(failed.phase(), &ScanPhase::Error("nmap not found".to_owned()));
        assert_eq!(failed.request_start(), Ok(Transition::FreshSession));

        let mut stopped = running();
        stopped.request_stop().unwrap();
        assert_eq!(stopped.request_start(), Ok(Transition::FreshSession));
    }

    #[test]
    fn confirmation_of_a_local_start_keeps_data() {
        let mut lifecycle = ScanLifecycle::default();
        lifecycle.request_start().unwrap();
        assert_eq!(
            lifecycle.driver_status(DriverStatus::Starting),
            Ok(Transition::Advanced)
        );
    }

    #[test]
    fn driver_start_from_idle_or_running_is_a_fresh_session() {
        let mut lifecycle = ScanLifecycle::default();
        assert_eq!(
            lifecycle.driver_status(DriverStatus::Starting),
            Ok(Transition::FreshSession)
        );
        assert_eq!(
            lifecycle.driver_status(DriverStatus::Starting),
            Ok(Transition::FreshSession)
        );
        assert_eq!(lifecycle.phase(), &ScanPhase::Running);
    }

    #[test]
    fn stop_is_optimistic_and_driver_wins_afterwards() {
        let mut lifecycle = running();
        lifecycle.request_stop().unwrap();
        assert_eq!(lifecycle.phase(), &ScanPhase::Stopped);
        assert!(lifecycle.can_start());
        assert!(lifecycle.request_stop().is_err());

        lifecycle.driver_status(DriverStatus::Completed).unwrap();
        assert_eq!(lifecycle.phase(), &ScanPhase::Completed);
    }

    #[test]
    fn driver_error_after_a_local_stop_still_wins() {
        let mut lifecycle = running();
        lifecycle.request_stop().unwrap();

        assert_eq!(
            lifecycle.driver_error("nmap exited with status 1"),
            Ok(Transition::Advanced)
        );
        assert_eq!(
            lifecycle.phase(),
            &ScanPhase::Error("nmap exited with status 1".to_owned())
        );
        assert!(lifecycle.can_start());
        assert!(!lifecycle.can_stop());
    }

    #[test]
    fn completion_without_a_scan_is_rejected() {
        let mut lifecycle = ScanLifecycle::default();
        assert!(lifecycle.driver_status(DriverStatus::Completed).is_err());
        assert!(lifecycle.driver_error("late").is_err());
        assert!(lifecycle.driver_status(DriverStatus::Unrecognized).is_err());
        assert_eq!(lifecycle.phase(), &ScanPhase::Idle);
    }

    #[test]
    fn stale_policy_controls_late_data() {
        let lenient = ScanLifecycle::new(StalePolicy::Accept);
        assert!(lenient.admits_data("host_data"));

        let strict = ScanLifecycle::new(StalePolicy::Drop);
        assert!(!strict.admits_data("host_data"));

        let mut strict_running = ScanLifecycle::new(StalePolicy::Drop);
        strict_running.request_start().unwrap();
        assert!(strict_running.admits_data("port_data"));
    }
}
