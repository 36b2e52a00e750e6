// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-docset search index stored in `Contents/Resources/docSet.dsidx`.
//!
//! Docsets shipped by Dash usually carry a populated `searchIndex` table. For
//! those that only ship a token index, the table is built from `Tokens.xml`
//! the first time the docset is opened and reused afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{FromRow, Sqlite};
use tracing::{debug, info, instrument};

use crate::error::{DocsetError, Result};
use crate::layout::DocsetLayout;
use crate::tokens::{parse_tokens, TokenEntry};

const MAX_CONNECTIONS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SearchIndexRow {
	pub id: i64,
	pub name: String,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub kind: String,
	/// Page path relative to the documents root, optionally with `#anchor`.
	pub path: String,
}

/// Handle to one docset's search database.
#[derive(Debug, Clone)]
pub struct DocsetIndex {
	pool: SqlitePool,
	db_path: PathBuf,
}

type BuildLocks = Mutex<HashMap<PathBuf, Weak<tokio::sync::Mutex<()>>>>;

/// Lock serializing first-open table creation for one docset directory.
fn build_lock(docset_path: &Path) -> Arc<tokio::sync::Mutex<()>> {
	static LOCKS: OnceLock<BuildLocks> = OnceLock::new();

	let key = std::fs::canonicalize(docset_path).unwrap_or_else(|_| docset_path.to_path_buf());
	let mut locks = LOCKS
		.get_or_init(Default::default)
		.lock()
		.unwrap_or_else(PoisonError::into_inner);
	locks.retain(|_, lock| lock.strong_count() > 0);

	if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
		return lock;
	}
	let lock = Arc::new(tokio::sync::Mutex::new(()));
	locks.insert(key, Arc::downgrade(&lock));
	lock
}

async fn connect(db_path: &Path) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::new()
		.filename(db_path)
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(MAX_CONNECTIONS)
		.connect_with(options)
		.await?;
	Ok(pool)
}

async fn table_exists<'e, E>(executor: E) -> Result<bool>
where
	E: sqlx::Executor<'e, Database = Sqlite>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'searchIndex'",
	)
	.fetch_one(executor)
	.await?;
	Ok(count > 0)
}

impl DocsetIndex {
	/// Open (creating if needed) the index of the docset at `docset_path`,
	/// building the `searchIndex` table from the token index when absent.
	///
	/// # Errors
	/// `CorruptDocset` when the table must be built and the token index is
	/// missing or unparsable.
	#[instrument(skip_all, fields(docset = %docset_path.display()))]
	pub async fn open(docset_path: &Path) -> Result<Self> {
		let layout = DocsetLayout::new(docset_path);
		let db_path = layout.index_db();

		let lock = build_lock(docset_path);
		let _guard = lock.lock().await;

		if let Some(parent) = db_path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		let pool = connect(&db_path).await?;

		if let Err(e) = ensure_search_table(&pool, &layout).await {
			pool.close().await;
			return Err(e);
		}

		debug!(db = %db_path.display(), "docset index opened");
		Ok(Self { pool, db_path })
	}

	pub fn db_path(&self) -> &Path {
		&self.db_path
	}

	pub async fn row_count(&self) -> Result<i64> {
		let count = sqlx::query_scalar("SELECT COUNT(*) FROM searchIndex")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	/// Rows whose lowercased name matches `pattern`, a `LIKE` pattern using
	/// `\` as its escape character.
	#[instrument(skip(self), fields(db = %self.db_path.display()))]
	pub async fn find(&self, pattern: &str, limit: u32, offset: u32) -> Result<Vec<SearchIndexRow>> {
		let rows: Vec<SearchIndexRow> = sqlx::query_as(
			r#"
			SELECT
				id,
				COALESCE(name, '') AS name,
				COALESCE(type, '') AS type,
				COALESCE(path, '') AS path
			FROM searchIndex
			WHERE lower(name) LIKE ?1 ESCAPE '\'
			LIMIT ?2 OFFSET ?3
			"#,
		)
		.bind(pattern)
		.bind(i64::from(limit))
		.bind(i64::from(offset))
		.fetch_all(&self.pool)
		.await?;

		debug!(count = rows.len(), "index query completed");
		Ok(rows)
	}

	/// Release the database handle. Queries after this fail.
	pub async fn close(&self) {
		self.pool.close().await;
		debug!(db = %self.db_path.display(), "docset index closed");
	}

	pub fn is_closed(&self) -> bool {
		self.pool.is_closed()
	}
}

/// Returns whether the table had to be built.
async fn ensure_search_table(pool: &SqlitePool, layout: &DocsetLayout) -> Result<bool> {
	if table_exists(pool).await? {
		return Ok(false);
	}

	let tokens_path = layout.tokens_xml();
	let xml = match tokio::fs::read_to_string(&tokens_path).await {
		Ok(xml) => xml,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			return Err(DocsetError::corrupt(
				layout.root(),
				"no search index and no token index to build one from",
			));
		}
		Err(e) => return Err(e.into()),
	};

	let entries = tokio::task::spawn_blocking(move || parse_tokens(&xml))
		.await
		.map_err(|e| DocsetError::corrupt(layout.root(), format!("token parser panicked: {e}")))?
		.map_err(|e| DocsetError::corrupt(layout.root(), format!("unparsable token index: {e}")))?;

	build_search_table(pool, &entries).await
}

async fn build_search_table(pool: &SqlitePool, entries: &[TokenEntry]) -> Result<bool> {
	let mut tx = pool.begin().await?;

	// Another process may have built it since the check outside the transaction.
	if table_exists(&mut *tx).await? {
		tx.rollback().await?;
		return Ok(false);
	}

	sqlx::query(
		r#"
		CREATE TABLE searchIndex (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT,
			type TEXT,
			path TEXT
		)
		"#,
	)
	.execute(&mut *tx)
	.await?;

	for entry in entries {
		sqlx::query("INSERT INTO searchIndex (name, type, path) VALUES (?1, ?2, ?3)")
			.bind(&entry.name)
			.bind(&entry.kind)
			.bind(&entry.path)
			.execute(&mut *tx)
			.await?;
	}

	tx.commit().await?;
	info!(count = entries.len(), "built search index from token index");
	Ok(true)
}
