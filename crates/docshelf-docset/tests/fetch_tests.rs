// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Catalog, download and install tests against a mock feed server.

mod support;

use std::path::Path;
use std::time::Duration;

use docshelf_docset::{
	ArchiveFetcher, DocsetError, DocsetRegistry, FeedCatalog, FetchOptions, PersistedFeedRecord,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{chai, dir_entries, docset_tarball, feed_xml, write_docset};

fn catalog(server: &MockServer) -> FeedCatalog {
	FeedCatalog::new(format!("{}/catalog", server.uri()), Duration::from_secs(30)).unwrap()
}

fn mock_fetcher(server: &MockServer) -> ArchiveFetcher {
	ArchiveFetcher::new(catalog(server), Duration::from_secs(30)).unwrap()
}

fn feed_url(server: &MockServer) -> String {
	format!("{}/feeds/Chai.xml", server.uri())
}

async fn serve_feed(server: &MockServer, version: &str, mirrors: &[String]) {
	Mock::given(method("GET"))
		.and(path("/feeds/Chai.xml"))
		.respond_with(ResponseTemplate::new(200).set_body_string(feed_xml(version, mirrors)))
		.mount(server)
		.await;
}

async fn serve_archive(server: &MockServer, route: &str, body: Vec<u8>) {
	Mock::given(method("GET"))
		.and(path(route))
		.respond_with(ResponseTemplate::new(200).set_body_bytes(body))
		.mount(server)
		.await;
}

/// A mock server offering Chai 4.0.0 from a single mirror.
async fn chai_server() -> MockServer {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror]).await;
	serve_archive(&server, "/mirror/Chai.tgz", docset_tarball(&chai())).await;
	server
}

fn assert_no_leftovers(root: &Path, expected: &[&str]) {
	assert_eq!(dir_entries(root), expected, "unexpected entries under {}", root.display());
}

#[tokio::test]
async fn list_feeds_keeps_xml_entries_with_download_urls() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/catalog"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([
			{ "name": "Chai.xml", "download_url": "https://example.com/Chai.xml", "type": "file" },
			{ "name": "README.md", "download_url": "https://example.com/README.md", "type": "file" },
			{ "name": "Gulp.xml", "download_url": null, "type": "file" },
			{ "name": "Python_3.xml", "download_url": "https://example.com/Python_3.xml" }
		])))
		.mount(&server)
		.await;

	let catalog = catalog(&server);
	let feeds = catalog.list_feeds().await.unwrap();
	let names: Vec<&str> = feeds.iter().map(|feed| feed.name.as_str()).collect();
	assert_eq!(names, vec!["Chai.xml", "Python_3.xml"]);

	let found = catalog.find_feed("chai").await.unwrap();
	assert_eq!(found.download_url, "https://example.com/Chai.xml");
	assert_eq!(catalog.find_feed("Python_3.xml").await.unwrap().stem(), "Python_3");
	assert!(matches!(
		catalog.find_feed("Rust").await,
		Err(DocsetError::NotFound(_))
	));
}

#[tokio::test]
async fn catalog_errors_are_typed() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/catalog"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;
	assert!(matches!(
		catalog(&server).list_feeds().await,
		Err(DocsetError::Network(_))
	));

	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/catalog"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "rate limited" })))
		.mount(&server)
		.await;
	assert!(matches!(
		catalog(&server).list_feeds().await,
		Err(DocsetError::Format(_))
	));
}

#[tokio::test]
async fn feed_metadata_loads_from_url_and_file() {
	let server = chai_server().await;
	let catalog = catalog(&server);

	let remote = catalog.fetch_metadata(&feed_url(&server)).await.unwrap();
	assert_eq!(remote.version.as_deref(), Some("4.0.0"));
	assert_eq!(remote.mirror_urls.len(), 1);

	let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/Chai.xml");
	let local = catalog.fetch_metadata(fixture).await.unwrap();
	assert_eq!(local.version.as_deref(), Some("4.0.0"));
	assert_eq!(local.mirror_urls.len(), 7);
	assert_eq!(
		local.preferred_mirror(),
		Some("http://sanfrancisco.kapeli.com/feeds/Chai.tgz")
	);
	assert_eq!(local.other_versions.len(), 13);

	let missing = format!("{}/feeds/Missing.xml", server.uri());
	assert!(matches!(
		catalog.load_feed_xml(&missing).await,
		Err(DocsetError::Network(_))
	));
	assert!(matches!(
		catalog.load_feed_xml("/definitely/not/here.xml").await,
		Err(DocsetError::Io(_))
	));
}

#[tokio::test]
async fn download_extracts_docset_and_writes_feed_record() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	let docsets = root.path().join("docsets");

	let fetcher = mock_fetcher(&server);
	let installed = fetcher
		.download(&feed_url(&server), &docsets, &CancellationToken::new())
		.await
		.unwrap();

	assert_eq!(installed, docsets.join("Chai.docset"));
	assert!(installed.join("Contents/Info.plist").exists());
	assert_no_leftovers(&docsets, &["Chai.docset"]);

	let record = PersistedFeedRecord::load(&installed.join("feed.json"))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(record.feed_url, feed_url(&server));
	assert_eq!(record.metadata.version.as_deref(), Some("4.0.0"));

	let raw: serde_json::Value =
		serde_json::from_slice(&std::fs::read(installed.join("feed.json")).unwrap()).unwrap();
	assert_eq!(raw["urls"].as_array().unwrap().len(), 1);
	assert_eq!(raw["feed_url"], json!(feed_url(&server)));
}

#[tokio::test]
async fn redownload_replaces_previous_extraction() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let cancel = CancellationToken::new();

	let first = fetcher
		.download(&feed_url(&server), root.path(), &cancel)
		.await
		.unwrap();
	std::fs::write(first.join("stale.txt"), "left over").unwrap();

	let second = fetcher
		.download(&feed_url(&server), root.path(), &cancel)
		.await
		.unwrap();
	assert_eq!(first, second);
	assert!(!second.join("stale.txt").exists());
	assert!(second.join("feed.json").exists());
	assert_no_leftovers(root.path(), &["Chai.docset"]);
}

#[tokio::test]
async fn existing_docset_conflicts_when_replacement_disabled() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	let existing = write_docset(root.path(), &chai());
	std::fs::write(existing.join("keep.txt"), "mine").unwrap();

	let fetcher = mock_fetcher(&server);
	let options = FetchOptions {
		replace_existing: false,
		..FetchOptions::default()
	};
	let err = fetcher
		.download_with(&feed_url(&server), root.path(), &options, &CancellationToken::new())
		.await
		.unwrap_err();

	assert!(matches!(err, DocsetError::Conflict(_)), "{err:?}");
	assert!(existing.join("keep.txt").exists());
	assert_no_leftovers(root.path(), &["Chai.docset"]);
}

#[tokio::test]
async fn failed_mirror_leaves_nothing_behind() {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror.clone()]).await;
	Mock::given(method("GET"))
		.and(path("/mirror/Chai.tgz"))
		.respond_with(ResponseTemplate::new(404))
		.mount(&server)
		.await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let err = fetcher
		.download(&feed_url(&server), root.path(), &CancellationToken::new())
		.await
		.unwrap_err();

	match err {
		DocsetError::Download { url, status } => {
			assert_eq!(url, mirror);
			assert_eq!(status, 404);
		}
		other => panic!("expected download error, got {other:?}"),
	}
	assert_no_leftovers(root.path(), &[]);
}

#[tokio::test]
async fn failover_tries_later_mirrors_only_when_enabled() {
	let server = MockServer::start().await;
	let broken = format!("{}/broken/Chai.tgz", server.uri());
	let working = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[broken, working]).await;
	Mock::given(method("GET"))
		.and(path("/broken/Chai.tgz"))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;
	serve_archive(&server, "/mirror/Chai.tgz", docset_tarball(&chai())).await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let cancel = CancellationToken::new();

	let err = fetcher
		.download(&feed_url(&server), root.path(), &cancel)
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Download { status: 500, .. }), "{err:?}");

	let failover = FetchOptions {
		mirror_failover: true,
		..FetchOptions::default()
	};
	let installed = fetcher
		.download_with(&feed_url(&server), root.path(), &failover, &cancel)
		.await
		.unwrap();
	assert!(installed.join("Contents/Resources/Tokens.xml").exists());
	assert_no_leftovers(root.path(), &["Chai.docset"]);
}

#[tokio::test]
async fn malformed_archive_is_extraction_error() {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror]).await;
	serve_archive(&server, "/mirror/Chai.tgz", b"<html>not an archive</html>".to_vec()).await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let err = fetcher
		.download(&feed_url(&server), root.path(), &CancellationToken::new())
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Extraction(_)), "{err:?}");
	assert_no_leftovers(root.path(), &[]);
}

#[tokio::test]
async fn archive_without_docset_is_extraction_error() {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror]).await;

	let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
	let readme = b"hello";
	let mut header = tar::Header::new_gnu();
	header.set_size(readme.len() as u64);
	header.set_mode(0o644);
	header.set_cksum();
	builder.append_data(&mut header, "README", &readme[..]).unwrap();
	let body = builder.into_inner().unwrap().finish().unwrap();
	serve_archive(&server, "/mirror/Chai.tgz", body).await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let err = fetcher
		.download(&feed_url(&server), root.path(), &CancellationToken::new())
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Extraction(_)), "{err:?}");
	assert_no_leftovers(root.path(), &[]);
}

#[tokio::test]
async fn feed_without_mirrors_is_format_error() {
	let server = MockServer::start().await;
	serve_feed(&server, "4.0.0", &[]).await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let err = fetcher
		.download(&feed_url(&server), root.path(), &CancellationToken::new())
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Format(_)), "{err:?}");
}

#[tokio::test]
async fn cancelled_download_leaves_nothing_behind() {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror]).await;
	Mock::given(method("GET"))
		.and(path("/mirror/Chai.tgz"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_bytes(docset_tarball(&chai()))
				.set_delay(Duration::from_secs(10)),
		)
		.mount(&server)
		.await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(200)).await;
		trigger.cancel();
	});

	let err = fetcher
		.download(&feed_url(&server), root.path(), &cancel)
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Cancelled), "{err:?}");
	assert_no_leftovers(root.path(), &[]);
}

#[tokio::test]
async fn precancelled_download_does_not_touch_disk() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let cancel = CancellationToken::new();
	cancel.cancel();

	let err = fetcher
		.download(&feed_url(&server), &root.path().join("docsets"), &cancel)
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::Cancelled), "{err:?}");
	assert!(!root.path().join("docsets").exists());
}

#[tokio::test]
async fn install_registers_docset_and_reports_updates() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	let catalog = catalog(&server);
	let fetcher = ArchiveFetcher::new(catalog.clone(), Duration::from_secs(30)).unwrap();
	let registry = DocsetRegistry::new(root.path());

	let installed = registry
		.install(
			&feed_url(&server),
			&fetcher,
			&FetchOptions::default(),
			&CancellationToken::new(),
		)
		.await
		.unwrap();
	assert_eq!(installed.keyword, "chai");
	assert_eq!(installed.docset.feed().unwrap().feed_url, feed_url(&server));

	let status = registry.check_update("chai", &catalog).await.unwrap();
	assert_eq!(status.installed.as_deref(), Some("4.0.0"));
	assert!(!status.update_available);

	server.reset().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.1.0", &[mirror]).await;
	serve_archive(&server, "/mirror/Chai.tgz", docset_tarball(&chai())).await;

	let report = registry.check_updates(&catalog).await.unwrap();
	assert!(report.failures.is_empty());
	assert_eq!(report.statuses.len(), 1);
	assert_eq!(report.statuses[0].latest.as_deref(), Some("4.1.0"));
	assert!(report.statuses[0].update_available);

	let reinstalled = registry
		.install(
			&feed_url(&server),
			&fetcher,
			&FetchOptions::default(),
			&CancellationToken::new(),
		)
		.await
		.unwrap();
	assert_eq!(
		reinstalled.docset.feed().unwrap().metadata.version.as_deref(),
		Some("4.1.0")
	);
	let listed = registry.list().await.unwrap();
	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].keyword, "chai");
	assert_no_leftovers(root.path(), &["Chai.docset"]);
	registry.close().await;
}

#[tokio::test]
async fn docsets_without_feed_record_cannot_be_checked() {
	let server = chai_server().await;
	let root = tempfile::tempdir().unwrap();
	write_docset(root.path(), &chai());

	let registry = DocsetRegistry::new(root.path());
	let err = registry
		.check_update("chai", &catalog(&server))
		.await
		.unwrap_err();
	assert!(matches!(err, DocsetError::NotFound(_)), "{err:?}");

	let report = registry.check_updates(&catalog(&server)).await.unwrap();
	assert!(report.statuses.is_empty());
	assert_eq!(report.failures.len(), 1);
	registry.close().await;
}

#[tokio::test]
async fn broken_download_is_never_registered() {
	let server = MockServer::start().await;
	let mirror = format!("{}/mirror/Chai.tgz", server.uri());
	serve_feed(&server, "4.0.0", &[mirror]).await;

	let scratch = tempfile::tempdir().unwrap();
	let docset = write_docset(scratch.path(), &chai());
	std::fs::remove_file(docset.join("Contents/Info.plist")).unwrap();
	let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
	builder.append_dir_all("Chai.docset", &docset).unwrap();
	let body = builder.into_inner().unwrap().finish().unwrap();
	serve_archive(&server, "/mirror/Chai.tgz", body).await;

	let root = tempfile::tempdir().unwrap();
	let fetcher = mock_fetcher(&server);
	let registry = DocsetRegistry::new(root.path());
	let err = registry
		.install(
			&feed_url(&server),
			&fetcher,
			&FetchOptions::default(),
			&CancellationToken::new(),
		)
		.await
		.unwrap_err();

	assert!(matches!(err, DocsetError::CorruptDocset { .. }), "{err:?}");
	assert!(registry.list().await.unwrap().is_empty());
	assert_no_leftovers(root.path(), &[]);
}
