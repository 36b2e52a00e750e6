// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feed metadata: the small XML document that describes a docset's current
//! version and where to download it.
//!
//! ```xml
//! <entry>
//!   <version>1.63.0</version>
//!   <ios_version>1</ios_version>
//!   <url>http://sanfrancisco.kapeli.com/feeds/Boost.tgz</url>
//!   <url>http://london.kapeli.com/feeds/Boost.tgz</url>
//!   <other-versions>
//!     <version><name>1.63.0</name></version>
//!   </other-versions>
//! </entry>
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocsetError, Result};
use crate::xml::{path_ends_with, walk_elements};

/// One entry of the feed catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
	/// File name, e.g. `Chai.xml`.
	pub name: String,
	pub download_url: String,
}

impl FeedDescriptor {
	/// Feed name without the `.xml` suffix, e.g. `Chai`.
	pub fn stem(&self) -> &str {
		self.name.strip_suffix(".xml").unwrap_or(&self.name)
	}
}

/// Parsed feed document. Absent elements are `None`/empty; the format is
/// loosely structured and none of its fields are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMetadata {
	#[serde(default)]
	pub version: Option<String>,
	#[serde(default)]
	pub ios_version: Option<String>,
	/// Mirror download URLs in document order; the first is preferred.
	#[serde(rename = "urls", default)]
	pub mirror_urls: Vec<String>,
	#[serde(default)]
	pub other_versions: Vec<String>,
}

impl FeedMetadata {
	pub fn preferred_mirror(&self) -> Option<&str> {
		self.mirror_urls.first().map(String::as_str)
	}
}

/// Feed metadata plus the URL it came from, stored as `feed.json` at the root
/// of every downloaded docset so it can later be checked for updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFeedRecord {
	#[serde(flatten)]
	pub metadata: FeedMetadata,
	pub feed_url: String,
}

impl PersistedFeedRecord {
	pub fn new(metadata: FeedMetadata, feed_url: impl Into<String>) -> Self {
		Self {
			metadata,
			feed_url: feed_url.into(),
		}
	}

	/// Reads the record at `path`; `Ok(None)` when the file does not exist.
	pub async fn load(path: &Path) -> Result<Option<Self>> {
		let bytes = match tokio::fs::read(path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		Ok(Some(serde_json::from_slice(&bytes)?))
	}

	pub async fn write(&self, path: &Path) -> Result<()> {
		let json = serde_json::to_vec_pretty(self)?;
		tokio::fs::write(path, json).await?;
		Ok(())
	}
}

/// Parse a feed XML document.
///
/// `version` and `ios_version` come from direct children of `<entry>`; every
/// direct `<url>` child becomes a mirror; every `<name>` under
/// `other-versions > version` becomes a prior version. Only malformed XML is
/// an error.
pub fn parse_feed(xml: &str) -> Result<FeedMetadata> {
	let mut feed = FeedMetadata::default();

	walk_elements(xml, |path, text| {
		if path_ends_with(path, &["other-versions", "version", "name"]) {
			if !text.is_empty() {
				feed.other_versions.push(text);
			}
		} else if path_ends_with(path, &["entry", "url"]) {
			if !text.is_empty() {
				feed.mirror_urls.push(text);
			}
		} else if path_ends_with(path, &["entry", "version"]) {
			if feed.version.is_none() && !text.is_empty() {
				feed.version = Some(text);
			}
		} else if path_ends_with(path, &["entry", "ios_version"])
			&& feed.ios_version.is_none()
			&& !text.is_empty()
		{
			feed.ios_version = Some(text);
		}
	})
	.map_err(|e| DocsetError::Format(format!("malformed feed XML: {e}")))?;

	Ok(feed)
}
