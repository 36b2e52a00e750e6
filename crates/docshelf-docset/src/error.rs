// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocsetError>;

#[derive(Error, Debug)]
pub enum DocsetError {
	/// Catalog, feed or mirror unreachable, or a non-success catalog/feed response.
	#[error("network error: {0}")]
	Network(String),

	#[error("operation cancelled")]
	Cancelled,

	/// Feed XML or catalog listing could not be understood.
	#[error("format error: {0}")]
	Format(String),

	#[error("corrupt docset at {path}: {message}")]
	CorruptDocset { path: PathBuf, message: String },

	#[error("download of {url} failed with HTTP {status}")]
	Download { url: String, status: u16 },

	#[error("extraction failed: {0}")]
	Extraction(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Json(#[from] serde_json::Error),
}

impl DocsetError {
	pub(crate) fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
		DocsetError::CorruptDocset {
			path: path.into(),
			message: message.into(),
		}
	}
}

impl From<reqwest::Error> for DocsetError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			DocsetError::Network(format!("request timed out: {e}"))
		} else {
			DocsetError::Network(e.to_string())
		}
	}
}
