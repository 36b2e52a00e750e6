// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token index (`Tokens.xml`) parsing.

use crate::xml::walk_elements;

/// One searchable symbol read from the token index, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
	pub name: String,
	pub kind: String,
	/// Page path, with `#anchor` appended when the token has one.
	pub path: String,
}

#[derive(Default)]
struct PartialToken {
	name: Option<String>,
	kind: Option<String>,
	path: Option<String>,
	anchor: Option<String>,
}

impl PartialToken {
	fn finish(self) -> TokenEntry {
		let path = self.path.unwrap_or_default();
		TokenEntry {
			name: self.name.unwrap_or_default(),
			kind: self.kind.unwrap_or_default(),
			path: match self.anchor {
				Some(anchor) => anchored_path(&path, &anchor),
				None => path,
			},
		}
	}
}

/// `path#anchor`, with every `.` in the anchor written as `%2E`. An empty
/// anchor leaves the path untouched.
pub fn anchored_path(path: &str, anchor: &str) -> String {
	if anchor.is_empty() {
		return path.to_string();
	}
	format!("{}#{}", path, anchor.replace('.', "%2E"))
}

/// Parse every `<Token>` element. Fields are taken from the first `Name`,
/// `Type`, `Path` and `Anchor` descendants of each token, so both flat tokens
/// and Dash's `<TokenIdentifier>` nesting are understood.
pub fn parse_tokens(xml: &str) -> Result<Vec<TokenEntry>, String> {
	let mut tokens = Vec::new();
	let mut current = PartialToken::default();

	walk_elements(xml, |path, text| {
		let Some((element, ancestors)) = path.split_last() else {
			return;
		};
		if element.as_slice() == b"Token" {
			tokens.push(std::mem::take(&mut current).finish());
			return;
		}
		if !ancestors.iter().any(|a| a.as_slice() == b"Token") {
			return;
		}
		let slot = match element.as_slice() {
			b"Name" => &mut current.name,
			b"Type" => &mut current.kind,
			b"Path" => &mut current.path,
			b"Anchor" => &mut current.anchor,
			_ => return,
		};
		if slot.is_none() {
			*slot = Some(text);
		}
	})?;

	Ok(tokens)
}
