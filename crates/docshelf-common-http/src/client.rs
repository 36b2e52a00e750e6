// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a new HTTP client builder with the standard docshelf User-Agent header.
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = docshelf_common_http::builder()
///     .connect_timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Creates a new HTTP client with a request timeout and the standard User-Agent.
///
/// The timeout covers the whole request including the body, so it is only
/// suitable for small payloads such as the catalog listing and feed XML.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	let client = builder().timeout(timeout).build()?;
	tracing::trace!(timeout_secs = timeout.as_secs(), "http client created");
	Ok(client)
}

/// Creates a client for large streamed downloads. Only connecting is bounded;
/// callers cancel slow transfers themselves.
pub fn new_streaming_client(connect_timeout: Duration) -> reqwest::Result<Client> {
	let client = builder().connect_timeout(connect_timeout).build()?;
	tracing::trace!(
		connect_timeout_secs = connect_timeout.as_secs(),
		"streaming http client created"
	);
	Ok(client)
}

/// Returns the standard docshelf User-Agent string.
///
/// Format: `docshelf/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"docshelf/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
