//! Registrar: application-agent registrations, cookie authorization and local delivery.

use crate::api::delivery::{ActiveRegistrationCallback, DeliveryError, DeliveryMode};
use crate::api::pipeline::BundleDispatch;
use crate::api::storage::StorageError;
use crate::bundle::{Bundle, BundleId};
use crate::component::CoreComponent;
use crate::control_plane::error::RegistrarError;
use crate::control_plane::registration_table::{Registration, RegistrationTable};
use crate::control_plane::rewrite::rewrite_api_me;
use crate::data_plane::delivery_listener::DeliveryListener;
use crate::eid::{Eid, EidFactory};
use crate::events::{EventBus, RegistrationActive};
use crate::observability::{events, fields};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

const COMPONENT: &str = "registrar";

/// One row of [`Registrar::dump_registrations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRow {
    pub sink: String,
    pub active: bool,
}

/// Diagnostic view of the registration table; `None` rows when disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDump {
    pub rows: Option<Vec<RegistrationRow>>,
}

impl Display for RegistrationDump {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "current registration table:")?;
        writeln!(f, "---------------------------")?;
        match &self.rows {
            None => writeln!(f, "disabled"),
            Some(rows) => {
                for row in rows {
                    let mode = if row.active { "ACTIVE" } else { "PASSIVE" };
                    writeln!(f, "{} {}", row.sink, mode)?;
                }
                Ok(())
            }
        }
    }
}

fn non_empty(value: &str, name: &'static str) -> Result<(), RegistrarError> {
    if value.is_empty() {
        Err(RegistrarError::NullArgument(name))
    } else {
        Ok(())
    }
}

fn log_passive(registration: &Registration) {
    info!(
        event = events::REGISTRATION_PASSIVE,
        component = COMPONENT,
        sink = registration.sink(),
        "registration passive"
    );
}

pub struct Registrar {
    component: CoreComponent,
    table: RegistrationTable,
    listener: Arc<DeliveryListener>,
    activations: UnboundedSender<RegistrationActive>,
    local_eid: Eid,
    eid_factory: Arc<dyn EidFactory>,
    dispatch: Arc<dyn BundleDispatch>,
    events: EventBus,
}

impl Registrar {
    /// `activations` feeds the delivery listener; the owner of the receiving end runs
    /// [`DeliveryListener::run`].
    pub fn new(
        local_eid: Eid,
        eid_factory: Arc<dyn EidFactory>,
        dispatch: Arc<dyn BundleDispatch>,
        listener: Arc<DeliveryListener>,
        activations: UnboundedSender<RegistrationActive>,
        events: EventBus,
    ) -> Self {
        Self {
            component: CoreComponent::new(COMPONENT),
            table: RegistrationTable::new(),
            listener,
            activations,
            local_eid,
            eid_factory,
            dispatch,
            events,
        }
    }

    pub fn component(&self) -> &CoreComponent {
        &self.component
    }

    pub fn enable(&self) -> bool {
        self.component.enable()
    }

    pub fn disable(&self) -> bool {
        self.component.disable()
    }

    pub fn is_enabled(&self) -> bool {
        self.component.is_enabled()
    }

    pub fn delivery_listener(&self) -> &Arc<DeliveryListener> {
        &self.listener
    }

    fn check_enabled(&self) -> Result<(), RegistrarError> {
        if self.component.is_enabled() {
            Ok(())
        } else {
            Err(RegistrarError::RegistrarDisabled)
        }
    }

    async fn registered_sink(&self, sink: &str) -> Result<Arc<Registration>, RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        self.table
            .get(sink)
            .await
            .ok_or_else(|| RegistrarError::SinkNotRegistered(sink.to_string()))
    }

    async fn authorized_sink(
        &self,
        sink: &str,
        cookie: &str,
    ) -> Result<Arc<Registration>, RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        non_empty(cookie, "cookie")?;
        let registration = self
            .table
            .get(sink)
            .await
            .ok_or_else(|| RegistrarError::SinkNotRegistered(sink.to_string()))?;
        registration.check_cookie(cookie)?;
        Ok(registration)
    }

    fn announce_active(&self, sink: &str, callback: Arc<dyn ActiveRegistrationCallback>) {
        let event = RegistrationActive {
            sink: sink.to_string(),
            callback,
        };
        if self.activations.send(event.clone()).is_err() {
            warn!(
                event = events::REGISTRATION_ACTIVE,
                component = COMPONENT,
                sink,
                "delivery listener is not running, watched bundles will wait"
            );
        }
        self.events.publish(event);
    }

    fn rewrite(&self, bundle: &mut Bundle) -> Result<(), RegistrarError> {
        rewrite_api_me(bundle, &self.local_eid, self.eid_factory.as_ref()).map_err(|err| {
            warn!(
                event = events::BUNDLE_REWRITE_FAILED,
                component = COMPONENT,
                bid = %fields::format_bundle_id(&bundle.bid),
                err = %err,
                "unable to rewrite api:me identifiers"
            );
            RegistrarError::BundleMalformed(err.to_string())
        })
    }

    pub async fn is_registered(&self, sink: &str) -> Result<bool, RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        Ok(self.table.contains(sink).await)
    }

    /// Registers a passive sink and returns its cookie.
    pub async fn register(&self, sink: &str) -> Result<String, RegistrarError> {
        self.register_with_mode(sink, DeliveryMode::Passive).await
    }

    /// Registers a sink that accepts pushed bundles through `callback`.
    pub async fn register_active(
        &self,
        sink: &str,
        callback: Arc<dyn ActiveRegistrationCallback>,
    ) -> Result<String, RegistrarError> {
        self.register_with_mode(sink, DeliveryMode::Active(callback))
            .await
    }

    async fn register_with_mode(
        &self,
        sink: &str,
        mode: DeliveryMode,
    ) -> Result<String, RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;

        let callback = match &mode {
            DeliveryMode::Active(callback) => Some(callback.clone()),
            DeliveryMode::Passive => None,
        };
        let mode_label = format!("{mode:?}");

        let Some(registration) = self.table.insert_if_absent(sink, mode).await else {
            debug!(
                event = events::SINK_REGISTER_REJECTED,
                component = COMPONENT,
                sink,
                "sink already registered"
            );
            return Err(RegistrarError::SinkAlreadyRegistered(sink.to_string()));
        };

        info!(
            event = events::SINK_REGISTERED,
            component = COMPONENT,
            sink,
            cookie = %fields::redact_cookie(registration.cookie()),
            mode = %mode_label,
            "sink registered"
        );

        if let Some(callback) = callback {
            self.announce_active(sink, callback);
        }
        Ok(registration.cookie().to_string())
    }

    pub async fn unregister(&self, sink: &str, cookie: &str) -> Result<(), RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        non_empty(cookie, "cookie")?;
        self.table.remove_authorized(sink, cookie).await?;
        info!(
            event = events::SINK_UNREGISTERED,
            component = COMPONENT,
            sink,
            "sink unregistered"
        );
        Ok(())
    }

    /// Sends a bundle on behalf of an unauthenticated local agent.
    pub async fn send(&self, mut bundle: Bundle) -> Result<(), RegistrarError> {
        self.check_enabled()?;
        self.rewrite(&mut bundle)?;
        self.hand_to_dispatch(bundle).await;
        Ok(())
    }

    /// Sends a bundle on behalf of a registered sink.
    pub async fn send_as(
        &self,
        sink: &str,
        cookie: &str,
        mut bundle: Bundle,
    ) -> Result<(), RegistrarError> {
        self.authorized_sink(sink, cookie).await?;
        self.rewrite(&mut bundle)?;
        self.hand_to_dispatch(bundle).await;
        Ok(())
    }

    async fn hand_to_dispatch(&self, bundle: Bundle) {
        debug!(
            event = events::BUNDLE_SENT,
            component = COMPONENT,
            bid = %fields::format_bundle_id(&bundle.bid),
            src = %fields::format_source(&bundle),
            dst = %fields::format_destination(&bundle),
            "handing bundle to dispatch"
        );
        self.dispatch.dispatch(bundle).await;
    }

    pub async fn set_active(
        &self,
        sink: &str,
        cookie: &str,
        callback: Arc<dyn ActiveRegistrationCallback>,
    ) -> Result<(), RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        non_empty(cookie, "cookie")?;
        let mode = DeliveryMode::Active(callback.clone());
        self.table
            .set_mode_authorized(sink, cookie, mode, |_| {
                info!(
                    event = events::REGISTRATION_ACTIVE,
                    component = COMPONENT,
                    sink,
                    "registration active"
                );
                self.announce_active(sink, callback);
            })
            .await?;
        Ok(())
    }

    pub async fn set_passive(&self, sink: &str, cookie: &str) -> Result<(), RegistrarError> {
        self.check_enabled()?;
        non_empty(sink, "sink")?;
        non_empty(cookie, "cookie")?;
        self.table
            .set_mode_authorized(sink, cookie, DeliveryMode::Passive, log_passive)
            .await?;
        Ok(())
    }

    /// Administrative override that turns a sink passive without its cookie.
    ///
    /// Not authenticated: only the node itself may call this, never an agent-facing
    /// interface.
    pub async fn set_passive_unauthenticated(&self, sink: &str) -> Result<(), RegistrarError> {
        let registration = self.registered_sink(sink).await?;
        self.make_passive(&registration);
        Ok(())
    }

    fn make_passive(&self, registration: &Registration) {
        registration.set_mode(DeliveryMode::Passive);
        log_passive(registration);
    }

    /// Bundle ids waiting for `sink`.
    pub async fn check_inbox(
        &self,
        sink: &str,
        cookie: &str,
    ) -> Result<Vec<BundleId>, RegistrarError> {
        self.authorized_sink(sink, cookie).await?;
        Ok(self.listener.watched(sink).await)
    }

    /// Reads a waiting bundle without consuming it.
    pub async fn get(
        &self,
        sink: &str,
        cookie: &str,
        bid: &BundleId,
    ) -> Result<Bundle, RegistrarError> {
        self.authorized_sink(sink, cookie).await?;
        if !self.listener.is_watched(sink, bid).await {
            return Err(RegistrarError::BundleNotFound(bid.clone()));
        }
        self.load(bid).await
    }

    /// Pulls a waiting bundle: it is removed from the inbox and reported delivered.
    pub async fn fetch(
        &self,
        sink: &str,
        cookie: &str,
        bid: &BundleId,
    ) -> Result<Bundle, RegistrarError> {
        self.authorized_sink(sink, cookie).await?;
        self.pull(sink, bid).await
    }

    /// Pulls every waiting bundle that storage can produce right now.
    pub async fn fetch_all(&self, sink: &str, cookie: &str) -> Result<Vec<Bundle>, RegistrarError> {
        self.authorized_sink(sink, cookie).await?;
        let mut bundles = Vec::new();
        for bid in self.listener.watched(sink).await {
            match self.pull(sink, &bid).await {
                Ok(bundle) => bundles.push(bundle),
                Err(err) => debug!(
                    event = events::BUNDLE_PULLED,
                    component = COMPONENT,
                    sink,
                    bid = %fields::format_bundle_id(&bid),
                    err = %err,
                    "skipping bundle during fetch_all"
                ),
            }
        }
        Ok(bundles)
    }

    async fn pull(&self, sink: &str, bid: &BundleId) -> Result<Bundle, RegistrarError> {
        if !self.listener.claim(sink, bid).await {
            return Err(RegistrarError::BundleNotFound(bid.clone()));
        }
        let bundle = match self.load(bid).await {
            Ok(bundle) => bundle,
            Err(err) => {
                self.listener.release(sink, bid).await;
                return Err(err);
            }
        };
        self.listener.unwatch(sink, bid).await;
        self.dispatch.local_delivery_successful(&bundle).await;
        info!(
            event = events::BUNDLE_PULLED,
            component = COMPONENT,
            sink,
            bid = %fields::format_bundle_id(bid),
            "bundle pulled by agent"
        );
        Ok(bundle)
    }

    async fn load(&self, bid: &BundleId) -> Result<Bundle, RegistrarError> {
        self.listener
            .storage()
            .get(bid)
            .await
            .map_err(|err| match err {
                StorageError::NotFound(bid) => RegistrarError::BundleNotFound(bid),
                StorageError::Unavailable(reason) => RegistrarError::StorageUnavailable(reason),
            })
    }

    /// Pushes a bundle to the registration whose sink is the longest prefix of `sink`.
    ///
    /// Fails with [`DeliveryError::PassiveRegistration`] for a passive match; the caller
    /// then decides whether to [`deliver_later`](Self::deliver_later).
    pub async fn deliver(&self, sink: &str, bundle: &Bundle) -> Result<(), DeliveryError> {
        if !self.component.is_enabled() {
            return Err(DeliveryError::DeliveryDisabled);
        }

        let Some(registration) = self.table.longest_prefix_match(sink).await else {
            debug!(
                event = events::DELIVERY_UNMATCHED,
                component = COMPONENT,
                sink,
                bid = %fields::format_bundle_id(&bundle.bid),
                "no registration matches sink"
            );
            return Err(DeliveryError::UnregisteredSink);
        };

        debug!(
            event = events::DELIVERY_MATCHED,
            component = COMPONENT,
            sink,
            registered_sink = registration.sink(),
            bid = %fields::format_bundle_id(&bundle.bid),
            "delivering bundle"
        );
        registration.mode().push(bundle).await
    }

    /// Queues a bundle for delivery once a registration for `sink` becomes active.
    pub async fn deliver_later(&self, sink: &str, bundle: &Bundle) {
        let added = self.listener.watch(sink, bundle.bid.clone()).await;
        debug!(
            event = events::DELIVERY_DEFERRED,
            component = COMPONENT,
            sink,
            bid = %fields::format_bundle_id(&bundle.bid),
            added,
            "bundle watched for later delivery"
        );
    }

    pub async fn registration_count(&self) -> usize {
        self.table.len().await
    }

    pub async fn dump_registrations(&self) -> RegistrationDump {
        if !self.component.is_enabled() {
            return RegistrationDump { rows: None };
        }
        let rows = self
            .table
            .snapshot()
            .await
            .into_iter()
            .map(|(sink, mode)| RegistrationRow {
                sink,
                active: mode.is_active(),
            })
            .collect();
        RegistrationDump { rows: Some(rows) }
    }
}
