// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for docshelf.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`DOCSHELF_*`)
//!
//! # Usage
//!
//! ```ignore
//! use docshelf_config::load_config;
//!
//! let config = load_config()?;
//! println!("docsets live in {}", config.docsets.root_dir.display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::DocshelfConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct DocshelfConfig {
	pub docsets: DocsetsConfig,
	pub http: HttpConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`DOCSHELF_*`)
/// 2. Config file (`~/.config/docshelf/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<DocshelfConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::user()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<DocshelfConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<DocshelfConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = DocshelfConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: DocshelfConfigLayer) -> Result<DocshelfConfig, ConfigError> {
	let docsets = layer.docsets.unwrap_or_default().finalize();
	let http = layer.http.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&docsets, &http)?;

	info!(
		root_dir = %docsets.root_dir.display(),
		catalog_url = %docsets.catalog_url,
		request_timeout_secs = docsets.request_timeout_secs,
		base_url = ?http.base_url,
		"configuration loaded"
	);

	Ok(DocshelfConfig {
		docsets,
		http,
		logging,
	})
}

fn is_http_url(url: &str) -> bool {
	url.starts_with("http://") || url.starts_with("https://")
}

/// Validate cross-field configuration rules.
fn validate_config(docsets: &DocsetsConfig, http: &HttpConfig) -> Result<(), ConfigError> {
	if docsets.default_limit == 0 {
		return Err(ConfigError::Validation(
			"DOCSHELF_DOCSETS_DEFAULT_LIMIT must be greater than zero".to_string(),
		));
	}
	if docsets.request_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"DOCSHELF_DOCSETS_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
		));
	}
	if !is_http_url(&docsets.catalog_url) {
		return Err(ConfigError::Validation(format!(
			"catalog URL '{}' must use http or https",
			docsets.catalog_url
		)));
	}
	if let Some(base_url) = &http.base_url {
		if !is_http_url(base_url) {
			return Err(ConfigError::Validation(format!(
				"base URL '{base_url}' must use http or https"
			)));
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults_validate() {
		let config = finalize(DocshelfConfigLayer::default()).unwrap();
		assert_eq!(config.docsets.catalog_url, DEFAULT_CATALOG_URL);
		assert!(config.http.base_url.is_none());
	}

	#[test]
	fn test_zero_limit_rejected() {
		let layer = DocshelfConfigLayer {
			docsets: Some(DocsetsConfigLayer {
				default_limit: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("DEFAULT_LIMIT"));
	}

	#[test]
	fn test_non_http_catalog_rejected() {
		let layer = DocshelfConfigLayer {
			docsets: Some(DocsetsConfigLayer {
				catalog_url: Some("ftp://example.com/feeds".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_config_file_overrides_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(
			&path,
			"[docsets]\nroot_dir = \"/data/docsets\"\ndefault_limit = 10\n",
		)
		.unwrap();

		let config = load_from_sources(vec![
			Box::new(TomlSource::new(&path)),
			Box::new(DefaultsSource),
		])
		.unwrap();
		assert_eq!(
			config.docsets.root_dir,
			std::path::PathBuf::from("/data/docsets")
		);
		assert_eq!(config.docsets.default_limit, 10);
	}

	proptest! {
		#[test]
		fn prop_positive_limits_validate(limit in 1u32..10_000, timeout in 1u64..3_600) {
			let layer = DocshelfConfigLayer {
				docsets: Some(DocsetsConfigLayer {
					default_limit: Some(limit),
					request_timeout_secs: Some(timeout),
					..Default::default()
				}),
				..Default::default()
			};
			let config = finalize(layer).unwrap();
			prop_assert_eq!(config.docsets.default_limit, limit);
			prop_assert_eq!(config.docsets.request_timeout_secs, timeout);
		}
	}
}
