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

//! Control-plane layer.
//!
//! Owns the registration table of application agents: cookie-authorized register and
//! unregister transitions, delivery-mode switches, `api:me` rewriting on send and the
//! longest-prefix lookup used for local delivery.
//!
//! ```
//! # use async_trait::async_trait;
//! # use dtn_core::api::pipeline::BundleDispatch;
//! # use dtn_core::api::storage::{BundleStorage, StorageError};
//! # use dtn_core::{Bundle, BundleId};
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
//! use std::sync::Arc;
//! use dtn_core::{BaseEidFactory, DeliveryListener, EventBus, Registrar, RegistrarError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let dispatch = Arc::new(Discard);
//! let listener = Arc::new(DeliveryListener::new(Arc::new(NoStorage), dispatch.clone()));
//! let (activations, _activation_rx) = tokio::sync::mpsc::unbounded_channel();
//! let registrar = Registrar::new(
//!     "dtn://node-1".parse().unwrap(),
//!     Arc::new(BaseEidFactory),
//!     dispatch,
//!     listener,
//!     activations,
//!     EventBus::new(16),
//! );
//! registrar.enable();
//!
//! // A sink is registered once; only its cookie can remove it again.
//! let cookie = registrar.register("app").await.unwrap();
//! assert_eq!(
//!     registrar.register("app").await,
//!     Err(RegistrarError::SinkAlreadyRegistered("app".to_string()))
//! );
//! assert_eq!(
//!     registrar.unregister("app", "not-the-cookie").await,
//!     Err(RegistrarError::BadCookie)
//! );
//! registrar.unregister("app", &cookie).await.unwrap();
//! # });
//! ```

pub(crate) mod error;
pub(crate) mod registrar;
pub(crate) mod registration_table;
pub(crate) mod rewrite;
