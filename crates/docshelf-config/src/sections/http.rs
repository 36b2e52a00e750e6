// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

/// Public-facing URL settings.
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
	/// Prefix for document links in search results, e.g. `http://localhost:3000`.
	/// Links are relative when unset.
	pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			base_url: self
				.base_url
				.map(|url| url.trim_end_matches('/').to_string())
				.filter(|url| !url.is_empty()),
		}
	}
}
