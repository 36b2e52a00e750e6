// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Docset storage and feed catalog configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Directory listing of the official Dash feeds.
pub const DEFAULT_CATALOG_URL: &str = "https://api.github.com/repos/Kapeli/feeds/contents";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LIMIT: u32 = 50;

/// Docset configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DocsetsConfig {
	/// Directory holding the unpacked `*.docset` bundles.
	pub root_dir: PathBuf,
	pub catalog_url: String,
	/// Timeout for catalog and feed requests. Mirror downloads are not bounded
	/// by it; they are cancelled explicitly.
	pub request_timeout_secs: u64,
	pub default_limit: u32,
	pub mirror_failover: bool,
}

impl DocsetsConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

impl Default for DocsetsConfig {
	fn default() -> Self {
		DocsetsConfigLayer::default().finalize()
	}
}

fn default_root_dir() -> PathBuf {
	dirs::data_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join("docshelf")
		.join("docsets")
}

/// Docset configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocsetsConfigLayer {
	#[serde(default)]
	pub root_dir: Option<String>,
	#[serde(default)]
	pub catalog_url: Option<String>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub default_limit: Option<u32>,
	#[serde(default)]
	pub mirror_failover: Option<bool>,
}

impl DocsetsConfigLayer {
	pub fn merge(&mut self, other: DocsetsConfigLayer) {
		if other.root_dir.is_some() {
			self.root_dir = other.root_dir;
		}
		if other.catalog_url.is_some() {
			self.catalog_url = other.catalog_url;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.default_limit.is_some() {
			self.default_limit = other.default_limit;
		}
		if other.mirror_failover.is_some() {
			self.mirror_failover = other.mirror_failover;
		}
	}

	pub fn finalize(self) -> DocsetsConfig {
		DocsetsConfig {
			root_dir: self
				.root_dir
				.map(PathBuf::from)
				.unwrap_or_else(default_root_dir),
			catalog_url: self
				.catalog_url
				.unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
			request_timeout_secs: self
				.request_timeout_secs
				.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			default_limit: self.default_limit.unwrap_or(DEFAULT_LIMIT),
			mirror_failover: self.mirror_failover.unwrap_or(false),
		}
	}
}
