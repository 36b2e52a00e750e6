// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::{DocsetError, Result};
use crate::feed::PersistedFeedRecord;
use crate::index::{DocsetIndex, SearchIndexRow};
use crate::info::DocsetInfo;
use crate::layout::DocsetLayout;

pub const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
	/// Match the query's characters in order with anything in between.
	pub fuzzy: bool,
	pub limit: u32,
	pub offset: u32,
}

impl Default for FindOptions {
	fn default() -> Self {
		Self {
			fuzzy: false,
			limit: DEFAULT_LIMIT,
			offset: 0,
		}
	}
}

/// Case-insensitive `LIKE` pattern for `query`, escaped with `\`.
///
/// Only ASCII letters are folded, matching SQLite's `lower()` on the indexed
/// side; non-ASCII letters must match exactly.
///
/// `"equal"` becomes `%equal%`; fuzzy `"adeq"` becomes `%a%d%e%q%`. An empty
/// query matches every row.
pub fn like_pattern(query: &str, fuzzy: bool) -> String {
	let query = query.to_ascii_lowercase();
	let mut pattern = String::with_capacity(query.len() * 2 + 2);
	pattern.push('%');
	for c in query.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(c);
		if fuzzy {
			pattern.push('%');
		}
	}
	if !fuzzy || query.is_empty() {
		pattern.push('%');
	}
	pattern
}

/// An installed docset: manifest, optional feed record and open search index.
#[derive(Debug)]
pub struct Docset {
	layout: DocsetLayout,
	info: DocsetInfo,
	feed: Option<PersistedFeedRecord>,
	index: DocsetIndex,
}

impl Docset {
	/// Load the docset directory at `path`, building its search index if needed.
	#[instrument(skip_all, fields(docset = %path.display()))]
	pub async fn load(path: &Path) -> Result<Self> {
		let layout = DocsetLayout::new(path);
		let info = DocsetInfo::load(&layout).await?;
		let feed = PersistedFeedRecord::load(&layout.feed_record())
			.await
			.map_err(|e| DocsetError::corrupt(path, format!("unreadable feed record: {e}")))?;
		let index = DocsetIndex::open(path).await?;

		debug!(name = %info.bundle_name, has_feed = feed.is_some(), "docset loaded");
		Ok(Self {
			layout,
			info,
			feed,
			index,
		})
	}

	/// Bundle name, e.g. `Python 3`.
	pub fn name(&self) -> &str {
		&self.info.bundle_name
	}

	pub fn path(&self) -> &Path {
		self.layout.root()
	}

	pub fn layout(&self) -> &DocsetLayout {
		&self.layout
	}

	pub fn info(&self) -> &DocsetInfo {
		&self.info
	}

	pub fn feed(&self) -> Option<&PersistedFeedRecord> {
		self.feed.as_ref()
	}

	pub fn index(&self) -> &DocsetIndex {
		&self.index
	}

	/// Search index rows whose name contains `query`, ignoring case.
	pub async fn find(&self, query: &str, options: &FindOptions) -> Result<Vec<SearchIndexRow>> {
		let pattern = like_pattern(query, options.fuzzy);
		self.index.find(&pattern, options.limit, options.offset).await
	}

	/// Resolve a page path from a search row to a file under the documents root.
	///
	/// Any `#anchor` is dropped. Absolute paths and paths that climb out of the
	/// documents root are rejected with `NotFound`. Existence is not checked.
	pub fn document_path(&self, relative: &str) -> Result<PathBuf> {
		let page = relative.split('#').next().unwrap_or_default();
		let page = Path::new(page);

		let escapes = page
			.components()
			.any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
		if page.as_os_str().is_empty() || escapes {
			return Err(DocsetError::NotFound(format!(
				"{relative} is not a document of {}",
				self.name()
			)));
		}

		Ok(self.layout.documents_dir().join(page))
	}

	pub async fn close(&self) {
		self.index.close().await;
	}
}
