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

//! # dtn-core
//!
//! `dtn-core` is the local-delivery and link-local routing core of a DTN node. It
//! decides whether a bundle addressed to a local endpoint can be pushed to an
//! application agent now, must wait for the agent to come back, or has nowhere to go;
//! and it keeps track of the channels attached to the node, ingesting every bundle
//! they receive.
//!
//! Everything else a node needs (storage, the routing pipeline, transports) is
//! injected through the traits in [`api`].
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dtn_core::api::delivery::{ActiveRegistrationCallback, DeliveryError};
//! use dtn_core::{BaseEidFactory, Bundle, CoreCollaborators, CoreConfig, DtnCore, Eid};
//!
//! # use dtn_core::api::pipeline::BundleDispatch;
//! # use dtn_core::api::storage::{BundleStorage, StorageError};
//! # use dtn_core::BundleId;
//! #
//! # struct Discard;
//! #
//! # #[async_trait]
//! # impl BundleDispatch for Discard {
//! #     async fn dispatch(&self, _bundle: Bundle) {}
//! #     async fn bundle_reception(&self, _bundle: Bundle) {}
//! #     async fn local_delivery_successful(&self, _bundle: &Bundle) {}
//! #     async fn local_delivery_failure(&self, _sink: &str, _bundle: &Bundle) {}
//! # }
//! #
//! # struct NoStorage;
//! #
//! # #[async_trait]
//! # impl BundleStorage for NoStorage {
//! #     async fn get(&self, bid: &BundleId) -> Result<Bundle, StorageError> {
//! #         Err(StorageError::NotFound(bid.clone()))
//! #     }
//! # }
//! #
//! struct PrintingAgent;
//!
//! #[async_trait]
//! impl ActiveRegistrationCallback for PrintingAgent {
//!     async fn recv(&self, bundle: &Bundle) -> Result<(), DeliveryError> {
//!         println!("got {} bytes", bundle.payload.len());
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let core = DtnCore::new(
//!     CoreConfig::default(),
//!     CoreCollaborators {
//!         dispatch: Arc::new(Discard),
//!         storage: Arc::new(NoStorage),
//!         eid_factory: Arc::new(BaseEidFactory),
//!     },
//! )
//! .unwrap();
//! core.start().unwrap();
//!
//! let registrar = core.registrar();
//! registrar.register_active("app", Arc::new(PrintingAgent)).await.unwrap();
//!
//! let from: Eid = "dtn://elsewhere/app".parse().unwrap();
//! let bundle = Bundle::new(from, core.local_eid().clone(), b"hello".to_vec());
//! // Sinks are matched by prefix, so "app/inbox" reaches the "app" registration.
//! registrar.deliver("app/inbox", &bundle).await.unwrap();
//!
//! core.shutdown().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API: collaborator contracts (pipeline, storage, channel, agent callback)
//! - Control plane: registration table, cookie authorization, push and pull delivery
//! - Data plane: delivery retry listener and per-channel inbound ingestion
//! - Routing: link-local table of open channels
//! - Runtime: spawning of the long-running loops
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events.
//! Library code emits events/spans and never initializes a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

pub mod api;
pub mod bundle;
pub mod component;
pub mod config;
mod control_plane;
mod data_plane;
mod dtncore;
pub mod eid;
pub mod events;
#[doc(hidden)]
pub mod observability;
mod routing;
mod runtime;

pub use bundle::{Bundle, BundleId, CLA_ORIGIN_TAG};
pub use config::{ComponentsConfig, ConfigError, CoreConfig};
pub use control_plane::error::RegistrarError;
pub use control_plane::registrar::{Registrar, RegistrationDump, RegistrationRow};
pub use data_plane::delivery_listener::{DeliveryListener, RetryOutcome};
pub use dtncore::{CoreCollaborators, CoreError, DtnCore};
pub use eid::{BaseEidFactory, Eid, EidError, EidFactory};
pub use events::{ChannelEvent, CoreEvent, EventBus};
pub use routing::error::LinkLocalError;
pub use routing::link_local_table::{LinkLocalDump, LinkLocalRow, LinkLocalTable};
