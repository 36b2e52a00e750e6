// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote feed catalog and feed XML loading.

use std::time::Duration;

use reqwest::{header, Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{DocsetError, Result};
use crate::feed::{parse_feed, FeedDescriptor, FeedMetadata};

/// Shape of one item in the catalog's JSON directory listing. Only the two
/// fields we use are required; GitHub's contents API returns many more.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
	name: String,
	#[serde(default)]
	download_url: Option<String>,
}

/// Client for the feed catalog.
#[derive(Debug, Clone)]
pub struct FeedCatalog {
	client: Client,
	catalog_url: String,
}

impl FeedCatalog {
	/// Catalog client whose requests are bounded by `timeout`.
	pub fn new(catalog_url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let client = docshelf_common_http::new_client_with_timeout(timeout)?;
		Ok(Self::with_client(client, catalog_url))
	}

	pub fn with_client(client: Client, catalog_url: impl Into<String>) -> Self {
		Self {
			client,
			catalog_url: catalog_url.into(),
		}
	}

	pub fn catalog_url(&self) -> &str {
		&self.catalog_url
	}

	/// List every `.xml` feed in the catalog.
	#[instrument(skip(self), fields(catalog = %self.catalog_url))]
	pub async fn list_feeds(&self) -> Result<Vec<FeedDescriptor>> {
		let response = self
			.client
			.get(&self.catalog_url)
			.header(header::ACCEPT, "application/json")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(DocsetError::Network(format!(
				"catalog {} returned HTTP {}",
				self.catalog_url, status
			)));
		}

		let body = response.bytes().await?;
		let entries: Vec<CatalogEntry> = serde_json::from_slice(&body).map_err(|e| {
			DocsetError::Format(format!("unexpected catalog listing shape: {e}"))
		})?;

		let feeds: Vec<FeedDescriptor> = entries
			.into_iter()
			.filter(|entry| entry.name.ends_with(".xml"))
			.filter_map(|entry| {
				entry.download_url.map(|download_url| FeedDescriptor {
					name: entry.name,
					download_url,
				})
			})
			.collect();

		debug!(count = feeds.len(), "catalog listed");
		Ok(feeds)
	}

	/// Find a catalog feed by name, with or without the `.xml` suffix,
	/// ignoring case.
	pub async fn find_feed(&self, name: &str) -> Result<FeedDescriptor> {
		let wanted = name.strip_suffix(".xml").unwrap_or(name);
		self.list_feeds()
			.await?
			.into_iter()
			.find(|feed| feed.stem().eq_ignore_ascii_case(wanted))
			.ok_or_else(|| DocsetError::NotFound(format!("no feed named '{name}' in catalog")))
	}

	/// Load feed XML from an `http`/`https` URL or, failing that, a local path.
	#[instrument(skip(self))]
	pub async fn load_feed_xml(&self, path_or_url: &str) -> Result<String> {
		match remote_url(path_or_url) {
			Some(url) => {
				let response = self.client.get(url.clone()).send().await?;
				let status = response.status();
				if !status.is_success() {
					return Err(DocsetError::Network(format!(
						"feed {url} returned HTTP {status}"
					)));
				}
				Ok(response.text().await?)
			}
			None => Ok(tokio::fs::read_to_string(path_or_url).await?),
		}
	}

	/// Load and parse a feed.
	pub async fn fetch_metadata(&self, path_or_url: &str) -> Result<FeedMetadata> {
		let xml = self.load_feed_xml(path_or_url).await?;
		parse_feed(&xml)
	}
}

/// `Some` when the argument parses as an `http`/`https` URL.
fn remote_url(path_or_url: &str) -> Option<Url> {
	Url::parse(path_or_url)
		.ok()
		.filter(|url| matches!(url.scheme(), "http" | "https"))
}
