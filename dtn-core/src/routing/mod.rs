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

//! Link-local routing layer.
//!
//! Tracks which channels are currently open, keyed by channel object identity, and
//! answers the two link-local questions of the node: does an identifier belong to this
//! node on some link, and which channel reaches a destination directly.

pub(crate) mod channel_identity;
pub(crate) mod error;
pub(crate) mod link_local_table;
