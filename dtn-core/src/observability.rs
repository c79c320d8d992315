//! Shared vocabulary for structured `tracing` events.
//!
//! Every event emitted by the crate carries `event = events::<NAME>` and
//! `component = "<module>"` so log pipelines can filter without parsing messages.

pub mod events {
    pub const COMPONENT_ENABLED: &str = "component_enabled";
    pub const COMPONENT_DISABLED: &str = "component_disabled";

    pub const SINK_REGISTERED: &str = "sink_registered";
    pub const SINK_REGISTER_REJECTED: &str = "sink_register_rejected";
    pub const SINK_UNREGISTERED: &str = "sink_unregistered";
    pub const REGISTRATION_ACTIVE: &str = "registration_active";
    pub const REGISTRATION_PASSIVE: &str = "registration_passive";
    pub const BUNDLE_SENT: &str = "bundle_sent";
    pub const BUNDLE_REWRITE_FAILED: &str = "bundle_rewrite_failed";
    pub const BUNDLE_PULLED: &str = "bundle_pulled";

    pub const DELIVERY_MATCHED: &str = "delivery_matched";
    pub const DELIVERY_UNMATCHED: &str = "delivery_unmatched";
    pub const DELIVERY_DEFERRED: &str = "delivery_deferred";
    pub const DELIVERY_RETRY_START: &str = "delivery_retry_start";
    pub const DELIVERY_RETRY_OK: &str = "delivery_retry_ok";
    pub const DELIVERY_RETRY_FAILED: &str = "delivery_retry_failed";
    pub const DELIVERY_RETRY_FETCH_FAILED: &str = "delivery_retry_fetch_failed";
    pub const DELIVERY_LISTENER_STOPPED: &str = "delivery_listener_stopped";

    pub const LINK_LOCAL_ENTRY_UP: &str = "link_local_entry_up";
    pub const LINK_LOCAL_ENTRY_DOWN: &str = "link_local_entry_down";
    pub const CHANNEL_ALREADY_OPEN: &str = "channel_already_open";
    pub const CHANNEL_BUNDLE_RECEIVED: &str = "channel_bundle_received";
    pub const CHANNEL_STREAM_FAILED: &str = "channel_stream_failed";
    pub const CHANNEL_STREAM_ENDED: &str = "channel_stream_ended";
    pub const CHANNEL_EVENT_LOOP_STOPPED: &str = "channel_event_loop_stopped";
    pub const CHANNEL_EVENT_IGNORED: &str = "channel_event_ignored";

    pub const LOOP_SPAWNED: &str = "loop_spawned";
    pub const LOOP_STOPPED: &str = "loop_stopped";

    pub const EVENT_PUBLISHED: &str = "event_published";
    pub const CORE_STARTED: &str = "core_started";
    pub const CORE_STOPPED: &str = "core_stopped";
}

pub mod fields {
    use crate::bundle::{Bundle, BundleId};
    use crate::eid::Eid;

    pub fn format_eid(eid: &Eid) -> String {
        eid.as_str().to_string()
    }

    pub fn format_bundle_id(bid: &BundleId) -> String {
        bid.to_string()
    }

    pub fn format_source(bundle: &Bundle) -> String {
        format_eid(&bundle.source)
    }

    pub fn format_destination(bundle: &Bundle) -> String {
        format_eid(&bundle.destination)
    }

    /// Cookies are credentials; only a short prefix ever reaches the logs.
    pub fn redact_cookie(cookie: &str) -> String {
        let prefix: String = cookie.chars().take(8).collect();
        format!("{prefix}…")
    }
}

#[cfg(test)]
mod tests {
    use super::fields;

    #[test]
    fn redact_cookie_keeps_short_prefix() {
        let redacted = fields::redact_cookie("0123456789abcdef");
        assert_eq!(redacted, "01234567…");
    }

    #[test]
    fn redact_cookie_handles_short_input() {
        assert_eq!(fields::redact_cookie("abc"), "abc…");
    }
}
