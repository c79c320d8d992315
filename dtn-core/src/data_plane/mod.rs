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

//! Data-plane layer.
//!
//! Moves bundles: the delivery listener retries watched bundles when their sink turns
//! active, and the ingestion loop feeds every bundle received on an open channel into
//! the processing pipeline.

pub(crate) mod delivery_listener;
pub(crate) mod ingestion;
