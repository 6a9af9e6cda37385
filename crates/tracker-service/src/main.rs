//! Main entry point for the parcel tracker service.
//!
//! This binary wires the configured storage and blob backends into the
//! tracker core and serves the HTTP API over it. Backends are pluggable
//! through the factory registries of the storage and files crates.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracker_config::Config;
use tracker_core::{Tracker, TrackerBuilder, TrackerError};

mod server;

/// Command-line arguments for the tracker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the tracker service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the tracker with all backend implementations
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started tracker");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Build the tracker with backend implementations
	let tracker = build_tracker(config.clone())?;
	let tracker = Arc::new(tracker);

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config.api.clone().unwrap();

		tokio::select! {
			result = server::start_server(api_config, Arc::clone(&tracker)) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Shutdown signal received");
			}
		}
	} else {
		tracing::warn!("API server disabled in configuration - nothing to serve");
	}

	tracing::info!("Stopped tracker");
	Ok(())
}

/// Builds a tracker from configuration, registering every available storage
/// and blob backend implementation.
fn build_tracker(config: Config) -> Result<Tracker, TrackerError> {
	let mut builder = TrackerBuilder::new(config);

	for (name, factory) in tracker_storage::get_all_implementations() {
		builder = builder.with_storage_factory(name, factory);
	}
	for (name, factory) in tracker_files::get_all_implementations() {
		builder = builder.with_blob_factory(name, factory);
	}

	builder.build()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn build_tracker_wires_memory_backends() {
		let config: Config = r#"
[service]
id = "test-tracker"

[storage]
primary = "memory"
[storage.implementations.memory]

[blobs]
primary = "memory"
[blobs.implementations.memory]
"#
		.parse()
		.unwrap();

		let tracker = build_tracker(config).unwrap();
		assert_eq!(tracker.config().service.id, "test-tracker");
	}

	#[tokio::test]
	async fn build_tracker_wires_file_backends() {
		let dir = tempfile::tempdir().unwrap();
		let config: Config = format!(
			r#"
[service]
id = "test-tracker"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{0}/records"

[blobs]
primary = "fs"
[blobs.implementations.fs]
root_path = "{0}/files"
"#,
			dir.path().display()
		)
		.parse()
		.unwrap();

		build_tracker(config).unwrap();
	}

	#[test]
	fn build_tracker_rejects_unregistered_backend() {
		// Passes config validation (the section exists) but no factory is
		// registered under that name.
		let config: Config = r#"
[service]
id = "test-tracker"

[storage]
primary = "dynamo"
[storage.implementations.dynamo]

[blobs]
primary = "memory"
[blobs.implementations.memory]
"#
		.parse()
		.unwrap();

		let result = build_tracker(config);
		assert!(matches!(result, Err(TrackerError::Config(_))));
	}
}
