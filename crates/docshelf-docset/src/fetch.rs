// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Docset archive download and extraction.
//!
//! Everything happens inside a hidden staging directory under the docset root
//! and only the final rename makes the docset visible, so an interrupted or
//! failed download never leaves a half-written `*.docset` directory behind.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Client;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::catalog::FeedCatalog;
use crate::error::{DocsetError, Result};
use crate::feed::PersistedFeedRecord;
use crate::layout::{is_docset_dir_name, FEED_RECORD};

const STAGING_PREFIX: &str = ".staging-";
const ARCHIVE_FILE: &str = "archive.tgz";
const EXTRACT_DIR: &str = "extracted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
	/// Replace a docset already installed under the same directory name.
	/// When false, an existing target is a `Conflict`.
	pub replace_existing: bool,
	/// Try the remaining mirrors in order when the preferred one fails.
	pub mirror_failover: bool,
}

impl Default for FetchOptions {
	fn default() -> Self {
		Self {
			replace_existing: true,
			mirror_failover: false,
		}
	}
}

/// Downloads docset archives described by feeds.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
	catalog: FeedCatalog,
	client: Client,
}

impl ArchiveFetcher {
	/// Fetcher whose archive downloads give up if a mirror cannot be reached
	/// within `connect_timeout`. Transfers themselves are bounded only by
	/// cancellation.
	pub fn new(catalog: FeedCatalog, connect_timeout: Duration) -> Result<Self> {
		let client = docshelf_common_http::new_streaming_client(connect_timeout)?;
		Ok(Self::with_client(catalog, client))
	}

	pub fn with_client(catalog: FeedCatalog, client: Client) -> Self {
		Self { catalog, client }
	}

	pub fn catalog(&self) -> &FeedCatalog {
		&self.catalog
	}

	/// Download the docset described by `feed_url` into `destination_root`
	/// with default options, returning the installed docset directory.
	pub async fn download(
		&self,
		feed_url: &str,
		destination_root: &Path,
		cancel: &CancellationToken,
	) -> Result<PathBuf> {
		self.download_with(feed_url, destination_root, &FetchOptions::default(), cancel)
			.await
	}

	pub async fn download_with(
		&self,
		feed_url: &str,
		destination_root: &Path,
		options: &FetchOptions,
		cancel: &CancellationToken,
	) -> Result<PathBuf> {
		let staged = self.stage(feed_url, destination_root, options, cancel).await?;
		staged.commit(options.replace_existing).await
	}

	/// Download and extract into a staging directory without touching any
	/// installed docset. Dropping the result discards the download.
	#[instrument(skip(self, options, cancel), fields(root = %destination_root.display()))]
	pub async fn stage(
		&self,
		feed_url: &str,
		destination_root: &Path,
		options: &FetchOptions,
		cancel: &CancellationToken,
	) -> Result<StagedDocset> {
		let metadata = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(DocsetError::Cancelled),
			metadata = self.catalog.fetch_metadata(feed_url) => metadata?,
		};
		if metadata.mirror_urls.is_empty() {
			return Err(DocsetError::Format(format!(
				"feed {feed_url} lists no download mirrors"
			)));
		}

		tokio::fs::create_dir_all(destination_root).await?;
		let staging = tempfile::Builder::new()
			.prefix(STAGING_PREFIX)
			.tempdir_in(destination_root)?;
		let archive_path = staging.path().join(ARCHIVE_FILE);

		let mirrors: &[String] = if options.mirror_failover {
			&metadata.mirror_urls
		} else {
			&metadata.mirror_urls[..1]
		};
		self.fetch_from_mirrors(mirrors, &archive_path, cancel).await?;

		let extract_dir = staging.path().join(EXTRACT_DIR);
		let docset_path = {
			let archive_path = archive_path.clone();
			let extract_dir = extract_dir.clone();
			tokio::task::spawn_blocking(move || {
				extract_archive(&archive_path, &extract_dir)?;
				locate_docset(&extract_dir)
			})
			.await
			.map_err(|e| DocsetError::Extraction(format!("extraction task failed: {e}")))??
		};
		if cancel.is_cancelled() {
			return Err(DocsetError::Cancelled);
		}
		tokio::fs::remove_file(&archive_path).await?;

		let record = PersistedFeedRecord::new(metadata, feed_url);
		record.write(&docset_path.join(FEED_RECORD)).await?;

		let file_name = docset_path
			.file_name()
			.and_then(|name| name.to_str())
			.map(str::to_string)
			.ok_or_else(|| DocsetError::Extraction("docset directory name is not UTF-8".to_string()))?;

		info!(docset = %file_name, "docset staged");
		Ok(StagedDocset {
			staging,
			path: docset_path,
			target_path: destination_root.join(&file_name),
			file_name,
			record,
		})
	}

	async fn fetch_from_mirrors(
		&self,
		mirrors: &[String],
		dest: &Path,
		cancel: &CancellationToken,
	) -> Result<()> {
		let mut last_error = None;
		for (attempt, url) in mirrors.iter().enumerate() {
			match self.fetch_archive(url, dest, cancel).await {
				Ok(bytes) => {
					debug!(%url, bytes, "archive downloaded");
					return Ok(());
				}
				Err(DocsetError::Cancelled) => return Err(DocsetError::Cancelled),
				Err(e) => {
					if attempt + 1 < mirrors.len() {
						warn!(%url, error = %e, "mirror failed, trying next");
					}
					last_error = Some(e);
				}
			}
		}
		Err(last_error.unwrap_or_else(|| DocsetError::Format("no download mirrors".to_string())))
	}

	/// Stream one mirror's archive to `dest`, returning the byte count.
	#[instrument(skip(self, dest, cancel))]
	async fn fetch_archive(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<u64> {
		let mut response = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(DocsetError::Cancelled),
			response = self.client.get(url).send() => response.map_err(transfer_error)?,
		};

		let status = response.status();
		if !status.is_success() {
			return Err(DocsetError::Download {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}

		let mut file = tokio::fs::File::create(dest).await?;
		let mut written = 0u64;
		loop {
			let chunk = tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(DocsetError::Cancelled),
				chunk = response.chunk() => chunk.map_err(transfer_error)?,
			};
			let Some(chunk) = chunk else { break };
			file.write_all(&chunk).await?;
			written += chunk.len() as u64;
		}

		// The extractor reads through a separate handle.
		file.flush().await?;
		file.sync_all().await?;
		Ok(written)
	}
}

fn transfer_error(e: reqwest::Error) -> DocsetError {
	if e.is_timeout() {
		DocsetError::Cancelled
	} else {
		DocsetError::Network(e.to_string())
	}
}

fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
	std::fs::create_dir_all(dest)?;
	let file = File::open(archive_path)?;
	let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
	archive
		.unpack(dest)
		.map_err(|e| DocsetError::Extraction(format!("failed to unpack archive: {e}")))
}

/// The single `*.docset` directory at the top of an extracted archive.
fn locate_docset(extract_dir: &Path) -> Result<PathBuf> {
	let mut found = Vec::new();
	for entry in std::fs::read_dir(extract_dir)? {
		let entry = entry?;
		let name = entry.file_name();
		if entry.file_type()?.is_dir() && name.to_str().is_some_and(is_docset_dir_name) {
			found.push(entry.path());
		}
	}

	match found.len() {
		1 => Ok(found.remove(0)),
		0 => Err(DocsetError::Extraction(
			"archive contains no .docset directory".to_string(),
		)),
		n => Err(DocsetError::Extraction(format!(
			"archive contains {n} .docset directories, expected one"
		))),
	}
}

/// A downloaded and extracted docset waiting in its staging directory.
#[derive(Debug)]
pub struct StagedDocset {
	staging: TempDir,
	path: PathBuf,
	file_name: String,
	target_path: PathBuf,
	record: PersistedFeedRecord,
}

impl StagedDocset {
	/// Where the docset currently sits, inside staging.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Directory name, e.g. `Chai.docset`.
	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	/// Where [`commit`](Self::commit) will move it.
	pub fn target_path(&self) -> &Path {
		&self.target_path
	}

	pub fn record(&self) -> &PersistedFeedRecord {
		&self.record
	}

	/// Move the docset into place and discard the staging directory.
	///
	/// An existing docset at the target is moved aside first and only removed
	/// once the new one is in place; if the final rename fails it is restored.
	#[instrument(skip(self), fields(target = %self.target_path.display()))]
	pub async fn commit(self, replace_existing: bool) -> Result<PathBuf> {
		let target = self.target_path.clone();
		let root = target.parent().map(Path::to_path_buf).unwrap_or_default();

		let mut backup = None;
		if tokio::fs::try_exists(&target).await? {
			if !replace_existing {
				return Err(DocsetError::Conflict(format!(
					"{} is already installed",
					self.file_name
				)));
			}
			let aside = root.join(format!(".{}.replaced", self.file_name));
			if tokio::fs::try_exists(&aside).await? {
				tokio::fs::remove_dir_all(&aside).await?;
			}
			tokio::fs::rename(&target, &aside).await?;
			backup = Some(aside);
		}

		if let Err(e) = tokio::fs::rename(&self.path, &target).await {
			if let Some(aside) = &backup {
				if let Err(restore) = tokio::fs::rename(aside, &target).await {
					warn!(error = %restore, "failed to restore previous docset");
				}
			}
			return Err(e.into());
		}

		if let Some(aside) = backup {
			if let Err(e) = tokio::fs::remove_dir_all(&aside).await {
				warn!(path = %aside.display(), error = %e, "failed to remove replaced docset");
			}
		}

		let staging = self.staging.path().to_path_buf();
		if let Err(e) = self.staging.close() {
			warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
		}

		info!(docset = %self.file_name, "docset installed");
		Ok(target)
	}
}
