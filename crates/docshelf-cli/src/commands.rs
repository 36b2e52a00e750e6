// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use docshelf_config::DocshelfConfig;
use docshelf_docset::{
	ArchiveFetcher, DocsetRegistry, FeedCatalog, FetchOptions, SearchOptions,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Command;

pub async fn run(command: Command, config: &DocshelfConfig) -> Result<()> {
	let catalog = FeedCatalog::new(
		config.docsets.catalog_url.clone(),
		config.docsets.request_timeout(),
	)
	.context("failed to build HTTP client")?;
	let registry = DocsetRegistry::with_base_url(
		&config.docsets.root_dir,
		config.http.base_url.clone(),
	);

	let result = match command {
		Command::Feeds => feeds(&catalog).await,
		Command::Feed { source } => feed(&catalog, &source).await,
		Command::Install { feed, no_replace } => {
			let options = FetchOptions {
				replace_existing: !no_replace,
				mirror_failover: config.docsets.mirror_failover,
			};
			install(&registry, catalog, &feed, &options, config.docsets.request_timeout()).await
		}
		Command::List => list(&registry).await,
		Command::Search {
			query,
			keyword,
			fuzzy,
			limit,
			offset,
			json,
		} => {
			let options = SearchOptions {
				keyword,
				fuzzy,
				limit: limit.unwrap_or(config.docsets.default_limit),
				offset,
			};
			search(&registry, &query, &options, json).await
		}
		Command::Remove { keyword } => remove(&registry, &keyword).await,
		Command::Outdated => outdated(&registry, &catalog).await,
		Command::Version => {
			println!("{}", crate::version::format_version_info());
			Ok(())
		}
	};

	registry.close().await;
	result
}

async fn feeds(catalog: &FeedCatalog) -> Result<()> {
	let feeds = catalog.list_feeds().await?;
	for feed in &feeds {
		println!("{}\t{}", feed.stem(), feed.download_url);
	}
	Ok(())
}

async fn feed(catalog: &FeedCatalog, source: &str) -> Result<()> {
	let metadata = catalog.fetch_metadata(source).await?;
	println!("{}", serde_json::to_string_pretty(&metadata)?);
	Ok(())
}

/// Feed URLs and existing files are used as given; anything else is looked up
/// in the catalog by name.
async fn resolve_feed(catalog: &FeedCatalog, feed: &str) -> Result<String> {
	if is_explicit_feed(feed) {
		return Ok(feed.to_string());
	}
	let descriptor = catalog.find_feed(feed).await?;
	Ok(descriptor.download_url)
}

fn is_explicit_feed(feed: &str) -> bool {
	feed.starts_with("http://") || feed.starts_with("https://") || Path::new(feed).is_file()
}

async fn install(
	registry: &DocsetRegistry,
	catalog: FeedCatalog,
	feed: &str,
	options: &FetchOptions,
	connect_timeout: Duration,
) -> Result<()> {
	let feed_url = resolve_feed(&catalog, feed).await?;
	let fetcher =
		ArchiveFetcher::new(catalog, connect_timeout).context("failed to build HTTP client")?;

	let cancel = CancellationToken::new();
	let on_interrupt = cancel.clone();
	let watcher = tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupted, cancelling download");
			on_interrupt.cancel();
		}
	});

	let installed = registry.install(&feed_url, &fetcher, options, &cancel).await;
	watcher.abort();
	let installed = installed.with_context(|| format!("failed to install {feed}"))?;

	info!(keyword = %installed.keyword, path = %installed.docset.path().display(), "installed");
	println!(
		"installed {} as '{}' in {}",
		installed.name(),
		installed.keyword,
		installed.docset.path().display()
	);
	Ok(())
}

async fn list(registry: &DocsetRegistry) -> Result<()> {
	for entry in registry.list().await? {
		let version = entry
			.docset
			.feed()
			.and_then(|record| record.metadata.version.as_deref())
			.unwrap_or("-");
		println!("{}\t{}\t{}", entry.keyword, entry.name(), version);
	}
	Ok(())
}

async fn search(
	registry: &DocsetRegistry,
	query: &str,
	options: &SearchOptions,
	json: bool,
) -> Result<()> {
	let results = registry.search(query, options).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&results.hits)?);
	} else {
		for hit in &results.hits {
			println!("{}\t{}\t{}\t{}", hit.keyword, hit.row.kind, hit.row.name, hit.url);
		}
	}
	for failure in &results.failures {
		eprintln!("search failed in {}: {}", failure.keyword, failure.error);
	}
	Ok(())
}

async fn remove(registry: &DocsetRegistry, keyword: &str) -> Result<()> {
	registry.delete(keyword).await?;
	println!("removed {keyword}");
	Ok(())
}

async fn outdated(registry: &DocsetRegistry, catalog: &FeedCatalog) -> Result<()> {
	let report = registry.check_updates(catalog).await?;
	for status in report.statuses.iter().filter(|status| status.update_available) {
		println!(
			"{}\t{} -> {}",
			status.keyword,
			status.installed.as_deref().unwrap_or("-"),
			status.latest.as_deref().unwrap_or("-")
		);
	}
	for failure in &report.failures {
		eprintln!("could not check {}: {}", failure.keyword, failure.error);
	}
	Ok(())
}
