// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dash docset acquisition and search.
//!
//! - [`FeedCatalog`] lists the published feeds and loads feed XML.
//! - [`parse_feed`] turns feed XML into [`FeedMetadata`].
//! - [`ArchiveFetcher`] downloads and extracts a docset archive.
//! - [`DocsetIndex`] opens a docset's SQLite search index, building it from
//!   the token index on first use.
//! - [`DocsetRegistry`] tracks the docsets installed under one directory and
//!   searches them.
//!
//! ```ignore
//! let registry = DocsetRegistry::new(&config.docsets.root_dir);
//! let results = registry.search("equal", &SearchOptions::default()).await?;
//! ```

pub mod catalog;
pub mod docset;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod index;
pub mod info;
pub mod keyword;
pub mod layout;
pub mod registry;
pub mod tokens;
mod xml;

pub use catalog::FeedCatalog;
pub use docset::{like_pattern, Docset, FindOptions, DEFAULT_LIMIT};
pub use error::{DocsetError, Result};
pub use feed::{parse_feed, FeedDescriptor, FeedMetadata, PersistedFeedRecord};
pub use fetch::{ArchiveFetcher, FetchOptions, StagedDocset};
pub use index::{DocsetIndex, SearchIndexRow};
pub use info::DocsetInfo;
pub use layout::DocsetLayout;
pub use registry::{
	DocsetRegistry, RegisteredDocset, SearchFailure, SearchHit, SearchOptions, SearchResults,
	UpdateFailure, UpdateReport, UpdateStatus,
};
