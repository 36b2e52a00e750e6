// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for docshelf.
//!
//! Every outbound request (feed catalog, feed XML, mirror downloads) goes
//! through a client built here so the User-Agent and timeout handling stay
//! consistent.

mod client;

pub use client::{
	builder, builder_with_user_agent, new_client_with_timeout, new_streaming_client, user_agent,
};
