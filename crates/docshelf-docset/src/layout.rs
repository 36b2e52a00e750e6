// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed locations inside a docset bundle.
//!
//! These paths are shared by the fetcher (which writes `feed.json`), the index
//! (which reads the token XML and owns the database file) and anything serving
//! pages out of the documents root, so they live in one place.

use std::path::{Path, PathBuf};

pub const DOCSET_SUFFIX: &str = ".docset";
pub const DOCUMENTS_DIR: &str = "Contents/Resources/Documents";
pub const INDEX_DB: &str = "Contents/Resources/docSet.dsidx";
pub const FEED_RECORD: &str = "feed.json";

/// Dash writes `Tokens.xml`; some generators emit the lowercase name.
const TOKENS_XML: [&str; 2] = ["Contents/Resources/Tokens.xml", "Contents/Resources/tokens.xml"];
const INFO_PLIST: [&str; 2] = ["Contents/Info.plist", "Contents/info.plist"];

/// Whether a directory entry under the docset root names a docset bundle.
///
/// Hidden entries are skipped; the fetcher and registry use dot-prefixed names
/// for staging and pending deletions.
pub fn is_docset_dir_name(name: &str) -> bool {
	!name.starts_with('.') && name.len() > DOCSET_SUFFIX.len() && name.ends_with(DOCSET_SUFFIX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsetLayout {
	root: PathBuf,
}

impl DocsetLayout {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn documents_dir(&self) -> PathBuf {
		self.root.join(DOCUMENTS_DIR)
	}

	pub fn index_db(&self) -> PathBuf {
		self.root.join(INDEX_DB)
	}

	pub fn feed_record(&self) -> PathBuf {
		self.root.join(FEED_RECORD)
	}

	pub fn tokens_xml(&self) -> PathBuf {
		self.first_existing(&TOKENS_XML)
	}

	pub fn info_plist(&self) -> PathBuf {
		self.first_existing(&INFO_PLIST)
	}

	fn first_existing(&self, candidates: &[&str]) -> PathBuf {
		candidates
			.iter()
			.map(|rel| self.root.join(rel))
			.find(|path| path.exists())
			.unwrap_or_else(|| self.root.join(candidates[0]))
	}
}
