// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal element walker over quick-xml.
//!
//! Feeds, token indexes and plists are all read the same way: collect the text
//! of each element and look at where it sits in the tree when it closes.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Calls `on_close(path, text)` for every element as it closes. `path` holds
/// the local names from the document root down to and including the closing
/// element; `text` is the element's own text content (children excluded).
/// Self-closing elements are reported with empty text.
pub(crate) fn walk_elements<F>(xml: &str, mut on_close: F) -> Result<(), String>
where
	F: FnMut(&[Vec<u8>], String),
{
	let mut reader = Reader::from_str(xml);
	reader.config_mut().trim_text(true);

	let mut names: Vec<Vec<u8>> = Vec::new();
	let mut texts: Vec<String> = Vec::new();

	loop {
		let event = reader
			.read_event()
			.map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;
		match event {
			Event::Start(e) => {
				names.push(e.local_name().as_ref().to_vec());
				texts.push(String::new());
			}
			Event::Empty(e) => {
				names.push(e.local_name().as_ref().to_vec());
				on_close(&names, String::new());
				names.pop();
			}
			Event::Text(t) => {
				let text = t.unescape().map_err(|e| e.to_string())?;
				if let Some(current) = texts.last_mut() {
					current.push_str(&text);
				}
			}
			Event::CData(c) => {
				if let Some(current) = texts.last_mut() {
					current.push_str(&String::from_utf8_lossy(&c));
				}
			}
			Event::End(_) => {
				let text = texts.pop().unwrap_or_default();
				on_close(&names, text);
				names.pop();
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if let Some(open) = names.last() {
		return Err(format!(
			"unexpected end of document inside <{}>",
			String::from_utf8_lossy(open)
		));
	}
	Ok(())
}

/// Whether `path` ends with the given element names.
pub(crate) fn path_ends_with(path: &[Vec<u8>], suffix: &[&str]) -> bool {
	path.len() >= suffix.len()
		&& path[path.len() - suffix.len()..]
			.iter()
			.zip(suffix)
			.all(|(name, want)| name.as_slice() == want.as_bytes())
}
