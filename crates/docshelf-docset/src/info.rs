// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Docset manifest (`Contents/Info.plist`).

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{DocsetError, Result};
use crate::layout::DocsetLayout;
use crate::xml::walk_elements;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocsetInfo {
	pub bundle_identifier: String,
	pub bundle_name: String,
	pub platform_family: String,
	/// `DashDocSetKeyword`, when the docset asks for a specific keyword.
	pub keyword_override: Option<String>,
	pub is_dash_docset: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PlistValue {
	String(String),
	Bool(bool),
}

impl PlistValue {
	fn into_string(self) -> Option<String> {
		match self {
			PlistValue::String(s) => Some(s),
			PlistValue::Bool(_) => None,
		}
	}

	fn as_bool(&self) -> Option<bool> {
		match self {
			PlistValue::Bool(b) => Some(*b),
			PlistValue::String(s) => match s.to_ascii_lowercase().as_str() {
				"true" | "yes" | "1" => Some(true),
				"false" | "no" | "0" => Some(false),
				_ => None,
			},
		}
	}
}

/// Scalar entries of the top-level `<dict>`. Nested dicts and arrays are skipped.
fn parse_plist_dict(xml: &str) -> std::result::Result<HashMap<String, PlistValue>, String> {
	let mut entries = HashMap::new();
	let mut pending_key: Option<String> = None;

	walk_elements(xml, |path, text| {
		let top_level = path.len() == 3 && path[0] == b"plist" && path[1] == b"dict";
		if !top_level {
			return;
		}
		let element = path[2].as_slice();
		if element == b"key" {
			pending_key = Some(text);
			return;
		}
		let Some(key) = pending_key.take() else {
			return;
		};
		let value = match element {
			b"string" | b"integer" | b"real" => Some(PlistValue::String(text)),
			b"true" => Some(PlistValue::Bool(true)),
			b"false" => Some(PlistValue::Bool(false)),
			_ => None,
		};
		if let Some(value) = value {
			entries.insert(key, value);
		}
	})?;

	Ok(entries)
}

impl DocsetInfo {
	/// Parse an XML property list. `CFBundleName` is required; other string
	/// keys default to empty.
	pub fn parse(xml: &str) -> std::result::Result<Self, String> {
		let mut dict = parse_plist_dict(xml)?;
		let mut take_string = |key: &str| dict.remove(key).and_then(PlistValue::into_string);

		let bundle_name = take_string("CFBundleName")
			.filter(|name| !name.is_empty())
			.ok_or_else(|| "manifest has no CFBundleName".to_string())?;
		let bundle_identifier = take_string("CFBundleIdentifier").unwrap_or_default();
		let platform_family = take_string("DocSetPlatformFamily").unwrap_or_default();
		let keyword_override = take_string("DashDocSetKeyword").filter(|k| !k.trim().is_empty());
		let is_dash_docset = dict.get("isDashDocset").and_then(PlistValue::as_bool);

		Ok(Self {
			bundle_identifier,
			bundle_name,
			platform_family,
			keyword_override,
			is_dash_docset,
		})
	}

	pub async fn load(layout: &DocsetLayout) -> Result<Self> {
		let path = layout.info_plist();
		let xml = match tokio::fs::read_to_string(&path).await {
			Ok(xml) => xml,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(DocsetError::corrupt(layout.root(), "missing Info.plist"));
			}
			Err(e) => return Err(e.into()),
		};
		Self::parse(&xml).map_err(|e| DocsetError::corrupt(layout.root(), e))
	}
}
