// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixture docsets shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

pub struct Token<'a> {
	pub name: &'a str,
	pub kind: &'a str,
	pub path: &'a str,
	pub anchor: Option<&'a str>,
}

pub const fn token<'a>(name: &'a str, kind: &'a str, path: &'a str, anchor: Option<&'a str>) -> Token<'a> {
	Token {
		name,
		kind,
		path,
		anchor,
	}
}

pub struct FixtureDocset<'a> {
	pub bundle_name: &'a str,
	pub platform_family: &'a str,
	pub keyword: Option<&'a str>,
	pub tokens: &'a [Token<'a>],
}

pub const CHAI_TOKENS: &[Token<'static>] = &[
	token("equal", "Method", "api/bdd/index.html", Some("equal")),
	token("deepEqual", "Method", "api/assert/index.html", Some("deepEqual")),
	token("assert.deepEqual", "Method", "api/assert/index.html", Some(".deepEqual")),
	token("notEqual", "Method", "api/assert/index.html", Some("notEqual")),
	token("include", "Method", "api/bdd/index.html", Some("include")),
	token("expect", "Function", "api/bdd/index.html", None),
	token("should", "Function", "api/bdd/index.html", None),
	token("100%_coverage", "Guide", "guide/coverage.html", None),
];

pub const GULP_TOKENS: &[Token<'static>] = &[
	token("gulp.src", "Method", "api.html", Some("gulp.src")),
	token("gulp.dest", "Method", "api.html", Some("gulp.dest")),
	token("gulp.task", "Method", "api.html", Some("gulp.task")),
];

pub const PYTHON_TOKENS: &[Token<'static>] = &[
	token("print", "Function", "library/functions.html", Some("print")),
	token("os.path.join", "Function", "library/os.path.html", Some("os.path.join")),
];

pub fn chai() -> FixtureDocset<'static> {
	FixtureDocset {
		bundle_name: "Chai",
		platform_family: "chai",
		keyword: None,
		tokens: CHAI_TOKENS,
	}
}

pub fn gulp() -> FixtureDocset<'static> {
	FixtureDocset {
		bundle_name: "Gulp",
		platform_family: "gulp",
		keyword: None,
		tokens: GULP_TOKENS,
	}
}

pub fn python(bundle_name: &'static str) -> FixtureDocset<'static> {
	FixtureDocset {
		bundle_name,
		platform_family: "python",
		keyword: None,
		tokens: PYTHON_TOKENS,
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

pub fn info_plist(fixture: &FixtureDocset<'_>) -> String {
	let keyword = fixture
		.keyword
		.map(|k| format!("\t<key>DashDocSetKeyword</key>\n\t<string>{}</string>\n", escape(k)))
		.unwrap_or_default();
	format!(
		r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleIdentifier</key>
	<string>{id}</string>
	<key>CFBundleName</key>
	<string>{name}</string>
	<key>DocSetPlatformFamily</key>
	<string>{family}</string>
{keyword}	<key>isDashDocset</key>
	<true/>
</dict>
</plist>
"#,
		id = escape(&fixture.bundle_name.to_lowercase()),
		name = escape(fixture.bundle_name),
		family = escape(fixture.platform_family),
	)
}

pub fn tokens_xml(tokens: &[Token<'_>]) -> String {
	let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Tokens version=\"1.0\">\n");
	for token in tokens {
		xml.push_str("\t<Token>\n");
		xml.push_str(&format!(
			"\t\t<TokenIdentifier><Name>{}</Name><Type>{}</Type></TokenIdentifier>\n",
			escape(token.name),
			escape(token.kind)
		));
		xml.push_str(&format!("\t\t<Path>{}</Path>\n", escape(token.path)));
		if let Some(anchor) = token.anchor {
			xml.push_str(&format!("\t\t<Anchor>{}</Anchor>\n", escape(anchor)));
		}
		xml.push_str("\t</Token>\n");
	}
	xml.push_str("</Tokens>\n");
	xml
}

/// Write `<dir>/<bundle_name>.docset` with a manifest, token index and one page.
pub fn write_docset(dir: &Path, fixture: &FixtureDocset<'_>) -> PathBuf {
	let docset = dir.join(format!("{}.docset", fixture.bundle_name));
	let resources = docset.join("Contents/Resources");
	std::fs::create_dir_all(resources.join("Documents")).unwrap();
	std::fs::write(docset.join("Contents/Info.plist"), info_plist(fixture)).unwrap();
	std::fs::write(resources.join("Tokens.xml"), tokens_xml(fixture.tokens)).unwrap();
	std::fs::write(
		resources.join("Documents/index.html"),
		format!("<h1>{}</h1>", fixture.bundle_name),
	)
	.unwrap();
	docset
}

/// A `.tgz` holding a single fixture docset, laid out like a Kapeli archive.
pub fn docset_tarball(fixture: &FixtureDocset<'_>) -> Vec<u8> {
	let scratch = tempfile::tempdir().unwrap();
	let docset = write_docset(scratch.path(), fixture);
	let dir_name = docset.file_name().unwrap().to_owned();

	let encoder = GzEncoder::new(Vec::new(), Compression::default());
	let mut builder = tar::Builder::new(encoder);
	builder.append_dir_all(&dir_name, &docset).unwrap();
	builder.into_inner().unwrap().finish().unwrap()
}

/// A feed document whose only mirrors are `mirrors`.
pub fn feed_xml(version: &str, mirrors: &[String]) -> String {
	let urls: String = mirrors
		.iter()
		.map(|url| format!("\t<url>{}</url>\n", escape(url)))
		.collect();
	format!(
		"<entry>\n\t<version>{version}</version>\n{urls}\t<other-versions>\n\t\t<version><name>{version}</name></version>\n\t</other-versions>\n</entry>\n"
	)
}

/// Names of every entry directly under `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
	let mut names: Vec<String> = std::fs::read_dir(dir)
		.unwrap()
		.map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
		.collect();
	names.sort();
	names
}
