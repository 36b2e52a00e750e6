// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! docshelf: download Dash docsets and search them from the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docshelf_config::{DocshelfConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

#[derive(Parser, Debug)]
#[command(name = "docshelf", about = "Download and search Dash docsets", version)]
struct Args {
	/// Config file to use instead of the user config
	#[arg(long, global = true, env = "DOCSHELF_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List the feeds published in the catalog
	Feeds,
	/// Show a feed's metadata
	Feed {
		/// Feed URL or local feed XML file
		source: String,
	},
	/// Download and install a docset
	Install {
		/// Catalog feed name (e.g. `Chai`), feed URL or local feed XML file
		feed: String,
		/// Fail instead of replacing an installed docset
		#[arg(long)]
		no_replace: bool,
	},
	/// List installed docsets
	List,
	/// Search installed docsets
	Search {
		query: String,
		/// Only search the docset with this keyword
		#[arg(short, long)]
		keyword: Option<String>,
		/// Match the query's characters in order, anything in between
		#[arg(short, long)]
		fuzzy: bool,
		/// Maximum results per docset (defaults to the configured limit)
		#[arg(short, long)]
		limit: Option<u32>,
		#[arg(long, default_value_t = 0)]
		offset: u32,
		/// Print hits as JSON
		#[arg(long)]
		json: bool,
	},
	/// Delete an installed docset
	Remove { keyword: String },
	/// Check installed docsets against their feeds
	Outdated,
	/// Show version and build information
	Version,
}

fn init_tracing(config: &DocshelfConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match config.logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => docshelf_config::load_config_with_file(path)?,
		None => docshelf_config::load_config()?,
	};
	init_tracing(&config);

	tracing::debug!(
		root = %config.docsets.root_dir.display(),
		catalog = %config.docsets.catalog_url,
		"configuration loaded"
	);

	commands::run(args.command, &config).await
}
