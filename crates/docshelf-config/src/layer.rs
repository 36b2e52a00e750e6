// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration, merged source by source.

use serde::Deserialize;

use crate::sections::{DocsetsConfigLayer, HttpConfigLayer, LoggingConfigLayer};

/// One source's view of the configuration. Every section is optional so a
/// TOML file may set only what it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocshelfConfigLayer {
	#[serde(default)]
	pub docsets: Option<DocsetsConfigLayer>,
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl DocshelfConfigLayer {
	/// Overlay `other` on top of `self`; values present in `other` win.
	pub fn merge(&mut self, other: DocshelfConfigLayer) {
		if let Some(other_docsets) = other.docsets {
			self.docsets
				.get_or_insert_with(Default::default)
				.merge(other_docsets);
		}
		if let Some(other_http) = other.http {
			self.http.get_or_insert_with(Default::default).merge(other_http);
		}
		if let Some(other_logging) = other.logging {
			self.logging
				.get_or_insert_with(Default::default)
				.merge(other_logging);
		}
	}
}
