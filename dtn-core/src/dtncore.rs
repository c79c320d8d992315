/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Wiring of the core components around one event bus.

use crate::api::pipeline::BundleDispatch;
use crate::api::storage::BundleStorage;
use crate::config::{ConfigError, CoreConfig};
use crate::control_plane::registrar::Registrar;
use crate::data_plane::delivery_listener::DeliveryListener;
use crate::eid::{Eid, EidFactory};
use crate::events::{ChannelEvent, EventBus, RegistrationActive};
use crate::observability::{events, fields};
use crate::routing::link_local_table::LinkLocalTable;
use crate::runtime::task_runtime::{spawn_loop, LoopHandle};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::info;

const COMPONENT: &str = "dtn_core";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("core was already started")]
    AlreadyStarted,
    #[error("unable to spawn the {loop_name} loop: {source}")]
    Spawn {
        loop_name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The parts of the node the core calls into.
#[derive(Clone)]
pub struct CoreCollaborators {
    pub dispatch: Arc<dyn BundleDispatch>,
    pub storage: Arc<dyn BundleStorage>,
    pub eid_factory: Arc<dyn EidFactory>,
}

struct PendingLoops {
    activations: mpsc::UnboundedReceiver<RegistrationActive>,
    channel_events: mpsc::Receiver<ChannelEvent>,
}

pub struct DtnCore {
    config: CoreConfig,
    local_eid: Eid,
    events: EventBus,
    registrar: Arc<Registrar>,
    listener: Arc<DeliveryListener>,
    link_local: Arc<LinkLocalTable>,
    channel_events: mpsc::Sender<ChannelEvent>,
    pending: Mutex<Option<PendingLoops>>,
    loops: Mutex<Vec<LoopHandle>>,
}

impl DtnCore {
    /// Builds every component. Nothing runs and every component stays disabled until
    /// [`start`](Self::start).
    pub fn new(
        config: CoreConfig,
        collaborators: CoreCollaborators,
    ) -> Result<Self, ConfigError> {
        let local_eid = config.validate(collaborators.eid_factory.as_ref())?;
        let events = EventBus::new(config.event_bus_capacity);

        let (activation_tx, activation_rx) = mpsc::unbounded_channel();
        let (channel_tx, channel_rx) = mpsc::channel(config.channel_event_queue_size);

        let listener = Arc::new(DeliveryListener::new(
            collaborators.storage,
            collaborators.dispatch.clone(),
        ));
        let registrar = Arc::new(Registrar::new(
            local_eid.clone(),
            collaborators.eid_factory,
            collaborators.dispatch.clone(),
            listener.clone(),
            activation_tx,
            events.clone(),
        ));
        let link_local = LinkLocalTable::new(collaborators.dispatch, events.clone());

        Ok(Self {
            config,
            local_eid,
            events,
            registrar,
            listener,
            link_local,
            channel_events: channel_tx,
            pending: Mutex::new(Some(PendingLoops {
                activations: activation_rx,
                channel_events: channel_rx,
            })),
            loops: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the delivery-listener and channel-event loops, then enables the
    /// components the configuration asks for. A core starts at most once.
    pub fn start(&self) -> Result<(), CoreError> {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CoreError::AlreadyStarted)?;

        let listener_loop = spawn_loop(
            "delivery-listener",
            self.listener.clone().run(pending.activations),
        )
        .map_err(|source| CoreError::Spawn {
            loop_name: "delivery-listener",
            source,
        })?;
        let channel_loop = match spawn_loop(
            "channel-events",
            self.link_local
                .clone()
                .run_channel_events(pending.channel_events),
        ) {
            Ok(handle) => handle,
            Err(source) => {
                listener_loop.stop();
                return Err(CoreError::Spawn {
                    loop_name: "channel-events",
                    source,
                });
            }
        };
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([listener_loop, channel_loop]);

        if self.config.components.registrar {
            self.registrar.enable();
        }
        if self.config.components.link_local {
            self.link_local.enable();
        }

        info!(
            event = events::CORE_STARTED,
            component = COMPONENT,
            local_eid = %fields::format_eid(&self.local_eid),
            registrar = self.registrar.is_enabled(),
            link_local = self.link_local.is_enabled(),
            "core started"
        );
        Ok(())
    }

    /// Disables every component, stops the loops and closes all open channels.
    pub async fn shutdown(&self) {
        self.registrar.disable();
        self.link_local.disable();

        let loops: Vec<LoopHandle> = self
            .loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in &loops {
            handle.stop();
        }

        let closed = self.link_local.close_all().await;
        let loop_names: Vec<&'static str> = loops.iter().map(LoopHandle::name).collect();
        info!(
            event = events::CORE_STOPPED,
            component = COMPONENT,
            loops = ?loop_names,
            closed_channels = closed,
            "core stopped"
        );
    }

    /// Number of spawned loops that are still running.
    pub fn running_loops(&self) -> usize {
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn local_eid(&self) -> &Eid {
        &self.local_eid
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn registrar(&self) -> &Arc<Registrar> {
        &self.registrar
    }

    pub fn delivery_listener(&self) -> &Arc<DeliveryListener> {
        &self.listener
    }

    pub fn link_local_table(&self) -> &Arc<LinkLocalTable> {
        &self.link_local
    }

    /// Sender transports use to report channels opening and closing.
    pub fn channel_events(&self) -> mpsc::Sender<ChannelEvent> {
        self.channel_events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreCollaborators, CoreError, DtnCore};
    use crate::api::pipeline::BundleDispatch;
    use crate::api::storage::{BundleStorage, StorageError};
    use crate::bundle::{Bundle, BundleId};
    use crate::config::{ComponentsConfig, ConfigError, CoreConfig};
    use crate::eid::BaseEidFactory;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EmptyStorage;

    #[async_trait]
    impl BundleStorage for EmptyStorage {
        async fn get(&self, bid: &BundleId) -> Result<Bundle, StorageError> {
            Err(StorageError::NotFound(bid.clone()))
        }
    }

    struct NoopDispatch;

    #[async_trait]
    impl BundleDispatch for NoopDispatch {
        async fn dispatch(&self, _bundle: Bundle) {}
        async fn bundle_reception(&self, _bundle: Bundle) {}
        async fn local_delivery_successful(&self, _bundle: &Bundle) {}
        async fn local_delivery_failure(&self, _sink: &str, _bundle: &Bundle) {}
    }

    fn collaborators() -> CoreCollaborators {
        CoreCollaborators {
            dispatch: Arc::new(NoopDispatch),
            storage: Arc::new(EmptyStorage),
            eid_factory: Arc::new(BaseEidFactory),
        }
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = CoreConfig {
            local_eid: "nonsense".to_string(),
            ..CoreConfig::default()
        };
        assert!(matches!(
            DtnCore::new(config, collaborators()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn oversized_queues_are_rejected_at_construction() {
        let config = CoreConfig {
            event_bus_capacity: usize::MAX,
            ..CoreConfig::default()
        };
        assert!(matches!(
            DtnCore::new(config, collaborators()),
            Err(ConfigError::Invalid(_))
        ));

        let config = CoreConfig {
            channel_event_queue_size: usize::MAX,
            ..CoreConfig::default()
        };
        assert!(matches!(
            DtnCore::new(config, collaborators()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn start_enables_configured_components_once() {
        let config = CoreConfig {
            components: ComponentsConfig {
                registrar: true,
                link_local: false,
            },
            ..CoreConfig::default()
        };
        let core = DtnCore::new(config, collaborators()).expect("core");
        assert!(!core.registrar().is_enabled());

        core.start().expect("start");
        assert_eq!(core.running_loops(), 2);
        assert!(core.registrar().is_enabled());
        assert!(!core.link_local_table().is_enabled());
        assert!(matches!(core.start(), Err(CoreError::AlreadyStarted)));

        core.shutdown().await;
        assert!(!core.registrar().is_enabled());
        assert_eq!(core.running_loops(), 0);
    }
}
