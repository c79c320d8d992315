//! Enabled/disabled lifecycle shared by the core components.

use crate::observability::events;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug)]
pub struct CoreComponent {
    name: &'static str,
    enabled: AtomicBool,
}

impl CoreComponent {
    /// Components start disabled; the owner enables them on startup.
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns `true` if the component was disabled before the call.
    pub fn enable(&self) -> bool {
        let changed = !self.enabled.swap(true, Ordering::AcqRel);
        if changed {
            info!(
                event = events::COMPONENT_ENABLED,
                component = self.name,
                "component up"
            );
        }
        changed
    }

    /// Returns `true` if the component was enabled before the call.
    pub fn disable(&self) -> bool {
        let changed = self.enabled.swap(false, Ordering::AcqRel);
        if changed {
            info!(
                event = events::COMPONENT_DISABLED,
                component = self.name,
                "component down"
            );
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::CoreComponent;

    #[test]
    fn starts_disabled_and_reports_transitions_once() {
        let component = CoreComponent::new("test");
        assert!(!component.is_enabled());

        assert!(component.enable());
        assert!(!component.enable());
        assert!(component.is_enabled());

        assert!(component.disable());
        assert!(!component.disable());
        assert!(!component.is_enabled());
    }
}
