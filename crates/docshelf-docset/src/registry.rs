// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The set of docsets installed under one root directory.
//!
//! The registry caches loaded docsets in insertion order and assigns each a
//! unique keyword. Every read-modify-write of the cache happens under one
//! async mutex, so `list`, `install` and `delete` never interleave.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::catalog::FeedCatalog;
use crate::docset::{Docset, FindOptions, DEFAULT_LIMIT};
use crate::error::{DocsetError, Result};
use crate::fetch::{ArchiveFetcher, FetchOptions};
use crate::index::SearchIndexRow;
use crate::info::DocsetInfo;
use crate::keyword::assign_keywords;
use crate::layout::is_docset_dir_name;

/// A cached docset together with the keyword currently assigned to it.
#[derive(Debug, Clone)]
pub struct RegisteredDocset {
	pub keyword: String,
	pub docset: Arc<Docset>,
}

impl RegisteredDocset {
	pub fn name(&self) -> &str {
		self.docset.name()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
	/// Restrict the search to one docset.
	pub keyword: Option<String>,
	pub fuzzy: bool,
	/// Applied per docset.
	pub limit: u32,
	pub offset: u32,
}

impl Default for SearchOptions {
	fn default() -> Self {
		Self {
			keyword: None,
			fuzzy: false,
			limit: DEFAULT_LIMIT,
			offset: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
	pub keyword: String,
	pub docset: String,
	#[serde(flatten)]
	pub row: SearchIndexRow,
	/// `{base_url}/docsets/{keyword}/{path}`.
	pub url: String,
}

/// A docset whose search failed during an aggregate query.
#[derive(Debug)]
pub struct SearchFailure {
	pub keyword: String,
	pub docset: String,
	pub error: DocsetError,
}

#[derive(Debug, Default)]
pub struct SearchResults {
	pub hits: Vec<SearchHit>,
	pub failures: Vec<SearchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
	pub keyword: String,
	pub docset: String,
	pub installed: Option<String>,
	pub latest: Option<String>,
	pub update_available: bool,
}

#[derive(Debug)]
pub struct UpdateFailure {
	pub keyword: String,
	pub error: DocsetError,
}

#[derive(Debug, Default)]
pub struct UpdateReport {
	pub statuses: Vec<UpdateStatus>,
	pub failures: Vec<UpdateFailure>,
}

#[derive(Debug, Default)]
struct RegistryState {
	entries: Vec<RegisteredDocset>,
	scanned: bool,
}

#[derive(Debug)]
struct Inner {
	root: PathBuf,
	base_url: String,
	state: Mutex<RegistryState>,
}

/// Cheap to clone; clones share one cache.
#[derive(Debug, Clone)]
pub struct DocsetRegistry {
	inner: Arc<Inner>,
}

impl DocsetRegistry {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self::with_base_url(root, None)
	}

	/// Registry whose search hits link to documents under `base_url`.
	pub fn with_base_url(root: impl Into<PathBuf>, base_url: Option<String>) -> Self {
		let base_url = base_url
			.map(|url| url.trim_end_matches('/').to_string())
			.unwrap_or_default();
		Self {
			inner: Arc::new(Inner {
				root: root.into(),
				base_url,
				state: Mutex::new(RegistryState::default()),
			}),
		}
	}

	pub fn root(&self) -> &Path {
		&self.inner.root
	}

	/// Rescan the root and return every registered docset in insertion order.
	#[instrument(skip(self), fields(root = %self.inner.root.display()))]
	pub async fn list(&self) -> Result<Vec<RegisteredDocset>> {
		let mut state = self.inner.state.lock().await;
		self.scan(&mut state).await?;
		Ok(state.entries.clone())
	}

	/// Look a docset up by bundle name. Only the first call on a fresh
	/// registry touches the disk.
	pub async fn get(&self, name: &str) -> Result<RegisteredDocset> {
		let mut state = self.inner.state.lock().await;
		self.ensure_scanned(&mut state).await?;
		state
			.entries
			.iter()
			.find(|entry| entry.name() == name)
			.cloned()
			.ok_or_else(|| DocsetError::NotFound(format!("no docset named '{name}'")))
	}

	pub async fn get_by_keyword(&self, keyword: &str) -> Result<RegisteredDocset> {
		let mut state = self.inner.state.lock().await;
		self.ensure_scanned(&mut state).await?;
		let position = find_keyword(&state.entries, keyword)?;
		Ok(state.entries[position].clone())
	}

	/// Remove the docset with `keyword` from disk and from the registry.
	///
	/// The directory is first renamed aside, which is the point of no return;
	/// removing the renamed tree afterwards is best effort.
	#[instrument(skip(self))]
	pub async fn delete(&self, keyword: &str) -> Result<()> {
		let mut state = self.inner.state.lock().await;
		self.ensure_scanned(&mut state).await?;
		let position = find_keyword(&state.entries, keyword)?;

		let path = state.entries[position].docset.path().to_path_buf();
		let aside = pending_deletion_path(&path);
		if tokio::fs::try_exists(&aside).await? {
			tokio::fs::remove_dir_all(&aside).await?;
		}
		tokio::fs::rename(&path, &aside).await?;

		let removed = state.entries.remove(position);
		removed.docset.close().await;
		reassign_keywords(&mut state.entries);
		drop(state);

		if let Err(e) = tokio::fs::remove_dir_all(&aside).await {
			warn!(path = %aside.display(), error = %e, "failed to remove deleted docset");
		}
		info!(name = %removed.name(), keyword = %removed.keyword, "docset deleted");
		Ok(())
	}

	/// Download, validate and register the docset described by `feed_url`.
	///
	/// Nothing under the root changes until the download has been extracted
	/// and its index opened successfully.
	#[instrument(skip(self, fetcher, options, cancel))]
	pub async fn install(
		&self,
		feed_url: &str,
		fetcher: &ArchiveFetcher,
		options: &FetchOptions,
		cancel: &CancellationToken,
	) -> Result<RegisteredDocset> {
		let staged = fetcher
			.stage(feed_url, &self.inner.root, options, cancel)
			.await?;
		let probe = Docset::load(staged.path()).await?;
		probe.close().await;

		let mut state = self.inner.state.lock().await;
		self.ensure_scanned(&mut state).await?;
		if cancel.is_cancelled() {
			return Err(DocsetError::Cancelled);
		}

		let target = staged.target_path().to_path_buf();
		let previous = match state
			.entries
			.iter()
			.position(|entry| entry.docset.path() == target)
		{
			Some(position) if options.replace_existing => {
				let old = state.entries.remove(position);
				old.docset.close().await;
				Some(position)
			}
			_ => None,
		};

		let installed_path = match staged.commit(options.replace_existing).await {
			Ok(path) => path,
			Err(e) => {
				if previous.is_some() {
					self.reload(&mut state, &target, previous).await;
				}
				return Err(e);
			}
		};

		let docset = match Docset::load(&installed_path).await {
			Ok(docset) => Arc::new(docset),
			Err(e) => {
				reassign_keywords(&mut state.entries);
				return Err(e);
			}
		};
		let entry = RegisteredDocset {
			keyword: String::new(),
			docset,
		};
		let position = match previous {
			Some(position) => {
				state.entries.insert(position, entry);
				position
			}
			None => {
				state.entries.push(entry);
				state.entries.len() - 1
			}
		};
		reassign_keywords(&mut state.entries);

		let registered = state.entries[position].clone();
		info!(name = %registered.name(), keyword = %registered.keyword, "docset registered");
		Ok(registered)
	}

	/// Search one docset (`options.keyword`) or all of them concurrently.
	///
	/// In the all-docsets case a failing docset does not abort the query; its
	/// error is reported in [`SearchResults::failures`].
	#[instrument(skip(self, options), fields(keyword = ?options.keyword, fuzzy = options.fuzzy))]
	pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
		let find = FindOptions {
			fuzzy: options.fuzzy,
			limit: options.limit,
			offset: options.offset,
		};

		if let Some(keyword) = &options.keyword {
			let target = self.get_by_keyword(keyword).await?;
			let rows = target.docset.find(query, &find).await?;
			return Ok(SearchResults {
				hits: self.hits(&target, rows),
				failures: Vec::new(),
			});
		}

		let targets = {
			let mut state = self.inner.state.lock().await;
			self.ensure_scanned(&mut state).await?;
			state.entries.clone()
		};

		let outcomes = join_all(targets.iter().map(|target| target.docset.find(query, &find))).await;

		let mut results = SearchResults::default();
		for (target, outcome) in targets.iter().zip(outcomes) {
			match outcome {
				Ok(rows) => results.hits.extend(self.hits(target, rows)),
				Err(error) => {
					warn!(keyword = %target.keyword, error = %error, "docset search failed");
					results.failures.push(SearchFailure {
						keyword: target.keyword.clone(),
						docset: target.name().to_string(),
						error,
					});
				}
			}
		}

		debug!(
			hits = results.hits.len(),
			failures = results.failures.len(),
			"search completed"
		);
		Ok(results)
	}

	/// Compare an installed docset's feed version with the feed's current one.
	#[instrument(skip(self, catalog))]
	pub async fn check_update(&self, keyword: &str, catalog: &FeedCatalog) -> Result<UpdateStatus> {
		let target = self.get_by_keyword(keyword).await?;
		update_status(&target, catalog).await
	}

	pub async fn check_updates(&self, catalog: &FeedCatalog) -> Result<UpdateReport> {
		let targets = self.list().await?;
		let outcomes = join_all(targets.iter().map(|target| update_status(target, catalog))).await;

		let mut report = UpdateReport::default();
		for (target, outcome) in targets.iter().zip(outcomes) {
			match outcome {
				Ok(status) => report.statuses.push(status),
				Err(error) => report.failures.push(UpdateFailure {
					keyword: target.keyword.clone(),
					error,
				}),
			}
		}
		Ok(report)
	}

	/// Close every index handle and forget all cached docsets.
	pub async fn close(&self) {
		let mut state = self.inner.state.lock().await;
		for entry in state.entries.drain(..) {
			entry.docset.close().await;
		}
		state.scanned = false;
	}

	fn hits(&self, target: &RegisteredDocset, rows: Vec<SearchIndexRow>) -> Vec<SearchHit> {
		rows.into_iter()
			.map(|row| SearchHit {
				url: format!(
					"{}/docsets/{}/{}",
					self.inner.base_url, target.keyword, row.path
				),
				keyword: target.keyword.clone(),
				docset: target.name().to_string(),
				row,
			})
			.collect()
	}

	async fn ensure_scanned(&self, state: &mut RegistryState) -> Result<()> {
		if state.scanned {
			return Ok(());
		}
		self.scan(state).await
	}

	async fn scan(&self, state: &mut RegistryState) -> Result<()> {
		let on_disk = docset_dirs(&self.inner.root).await?;
		let mut changed = false;

		let mut kept = Vec::with_capacity(state.entries.len());
		for entry in state.entries.drain(..) {
			if on_disk.iter().any(|path| path == entry.docset.path()) {
				kept.push(entry);
			} else {
				info!(name = %entry.name(), "docset directory vanished, evicting");
				entry.docset.close().await;
				changed = true;
			}
		}
		state.entries = kept;

		for path in on_disk {
			if state.entries.iter().any(|entry| entry.docset.path() == path) {
				continue;
			}
			match Docset::load(&path).await {
				Ok(docset) => {
					state.entries.push(RegisteredDocset {
						keyword: String::new(),
						docset: Arc::new(docset),
					});
					changed = true;
				}
				Err(e) => warn!(path = %path.display(), error = %e, "skipping unloadable docset"),
			}
		}

		if changed {
			reassign_keywords(&mut state.entries);
		}
		state.scanned = true;
		debug!(count = state.entries.len(), changed, "docset root scanned");
		Ok(())
	}

	/// Re-register a docset evicted by a failed install.
	async fn reload(&self, state: &mut RegistryState, path: &Path, position: Option<usize>) {
		match Docset::load(path).await {
			Ok(docset) => {
				let entry = RegisteredDocset {
					keyword: String::new(),
					docset: Arc::new(docset),
				};
				let position = position.unwrap_or(state.entries.len()).min(state.entries.len());
				state.entries.insert(position, entry);
			}
			Err(e) => warn!(path = %path.display(), error = %e, "failed to reload previous docset"),
		}
		reassign_keywords(&mut state.entries);
	}
}

async fn update_status(target: &RegisteredDocset, catalog: &FeedCatalog) -> Result<UpdateStatus> {
	let record = target.docset.feed().ok_or_else(|| {
		DocsetError::NotFound(format!("{} has no feed record", target.keyword))
	})?;
	let latest = catalog.fetch_metadata(&record.feed_url).await?.version;
	let installed = record.metadata.version.clone();
	let update_available = latest.is_some() && latest != installed;

	Ok(UpdateStatus {
		keyword: target.keyword.clone(),
		docset: target.name().to_string(),
		installed,
		latest,
		update_available,
	})
}

fn find_keyword(entries: &[RegisteredDocset], keyword: &str) -> Result<usize> {
	let wanted = keyword.to_lowercase();
	entries
		.iter()
		.position(|entry| entry.keyword == wanted)
		.ok_or_else(|| DocsetError::NotFound(format!("no docset with keyword '{keyword}'")))
}

fn reassign_keywords(entries: &mut [RegisteredDocset]) {
	let keywords = {
		let infos: Vec<&DocsetInfo> = entries.iter().map(|entry| entry.docset.info()).collect();
		assign_keywords(&infos)
	};
	for (entry, keyword) in entries.iter_mut().zip(keywords) {
		entry.keyword = keyword;
	}
}

/// Hidden sibling that a docset is renamed to while it is being deleted.
fn pending_deletion_path(path: &Path) -> PathBuf {
	let name = path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
	path.with_file_name(format!(".{name}.deleting"))
}

/// Docset directories directly under `root`, sorted by path. A missing root
/// has none.
async fn docset_dirs(root: &Path) -> Result<Vec<PathBuf>> {
	let mut dir = match tokio::fs::read_dir(root).await {
		Ok(dir) => dir,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(e.into()),
	};

	let mut paths = Vec::new();
	while let Some(entry) = dir.next_entry().await? {
		let is_docset = entry
			.file_name()
			.to_str()
			.is_some_and(is_docset_dir_name);
		if is_docset && entry.file_type().await?.is_dir() {
			paths.push(entry.path());
		}
	}
	paths.sort();
	Ok(paths)
}
