// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Short, unique per-docset keywords (`python`, `js`, `chai`, ...).

use std::collections::{HashMap, HashSet};

use crate::info::DocsetInfo;

/// Used when a bundle name has no word characters at all.
const EMPTY_FALLBACK: &str = "docset";

/// The keyword a docset asks for: its explicit keyword, else its platform family.
pub fn candidate_keyword(info: &DocsetInfo) -> String {
	match info.keyword_override.as_deref().map(str::trim) {
		Some(keyword) if !keyword.is_empty() => keyword.to_lowercase(),
		_ => info.platform_family.trim().to_lowercase(),
	}
}

/// Bundle name lowercased with every non-word character removed.
pub fn fallback_keyword(bundle_name: &str) -> String {
	let keyword: String = bundle_name
		.to_lowercase()
		.chars()
		.filter(|c| c.is_alphanumeric() || *c == '_')
		.collect();
	if keyword.is_empty() {
		EMPTY_FALLBACK.to_string()
	} else {
		keyword
	}
}

/// Assign one keyword per docset, in the order given.
///
/// A candidate held by exactly one docset is kept as is. Docsets whose
/// candidate is shared (or empty) switch to their bundle-name fallback, and a
/// fallback that is already taken gets `-2`, `-3`, ... in order. Uncontested
/// candidates are reserved before any fallback is placed, so only fallbacks
/// are ever suffixed.
///
/// Existing keywords are stable when docsets are appended: an appended docset
/// can only change another docset's keyword by sharing its candidate, and
/// suffixes go to the later docset in order.
pub fn assign_keywords(infos: &[&DocsetInfo]) -> Vec<String> {
	let candidates: Vec<String> = infos.iter().map(|info| candidate_keyword(info)).collect();

	let mut counts: HashMap<&str, usize> = HashMap::new();
	for candidate in &candidates {
		*counts.entry(candidate.as_str()).or_default() += 1;
	}
	let uncontested =
		|candidate: &String| !candidate.is_empty() && counts[candidate.as_str()] == 1;

	let mut taken: HashSet<String> = candidates
		.iter()
		.filter(|candidate| uncontested(*candidate))
		.cloned()
		.collect();

	infos
		.iter()
		.zip(&candidates)
		.map(|(info, candidate)| {
			if uncontested(candidate) {
				return candidate.clone();
			}
			let fallback = fallback_keyword(&info.bundle_name);
			let mut unique = fallback.clone();
			let mut n = 2;
			while taken.contains(&unique) {
				unique = format!("{fallback}-{n}");
				n += 1;
			}
			taken.insert(unique.clone());
			unique
		})
		.collect()
}
