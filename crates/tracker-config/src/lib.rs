//! Configuration module for the parcel tracker system.
//!
//! This module provides structures and utilities for managing tracker
//! configuration. It supports loading configuration from TOML files with
//! environment-variable resolution and validates that all required values
//! are properly set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the parcel tracker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the record storage backend.
	pub storage: StorageConfig,
	/// Configuration for the blob (file) storage backend.
	pub blobs: BlobConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to this service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this tracker instance.
	pub id: String,
}

/// Configuration for the record storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the blob storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlobConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Lifetime of issued signed URLs in seconds.
	/// Defaults to 3600 seconds (1 hour) if not specified.
	#[serde(default = "default_signed_url_ttl")]
	pub signed_url_ttl_seconds: u64,
	/// Map of blob store implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Returns the default signed-URL lifetime in seconds.
fn default_signed_url_ttl() -> u64 {
	3600 // Default to 1 hour
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request size in bytes. The default clears the 10 MiB upload
	/// cap with room for base64 framing.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default maximum request size in bytes.
fn default_max_request_size() -> usize {
	16 * 1024 * 1024 // 16MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment variables
	/// and validating the result.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Validate blob config
		if self.blobs.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one blob store implementation must be configured".into(),
			));
		}
		if !self.blobs.implementations.contains_key(&self.blobs.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary blob store '{}' not found in implementations",
				self.blobs.primary
			)));
		}
		if self.blobs.signed_url_ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"Signed URL TTL must be greater than 0".into(),
			));
		}
		if self.blobs.signed_url_ttl_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Signed URL TTL cannot exceed 86400 (24 hours)".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TRACKER_TEST_HOST", "localhost");
		std::env::set_var("TRACKER_TEST_PORT", "5432");

		let input = "host = \"${TRACKER_TEST_HOST}:${TRACKER_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("TRACKER_TEST_HOST");
		std::env::remove_var("TRACKER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("MISSING_VAR"));
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("TRACKER_TEST_ID", "test-tracker");

		let config_str = r#"
[service]
id = "${TRACKER_TEST_ID}"

[storage]
primary = "memory"
[storage.implementations.memory]

[blobs]
primary = "memory"
[blobs.implementations.memory]

[api]
enabled = true
port = 8080
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "test-tracker");
		assert_eq!(config.blobs.signed_url_ttl_seconds, 3600);
		let api = config.api.unwrap();
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);

		std::env::remove_var("TRACKER_TEST_ID");
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = r#"
[service]
id = "test"

[storage]
primary = "postgres"
[storage.implementations.memory]

[blobs]
primary = "memory"
[blobs.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("Primary storage 'postgres' not found"));
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = r#"
[service]
id = ""

[storage]
primary = "memory"
[storage.implementations.memory]

[blobs]
primary = "memory"
[blobs.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
	}

	#[test]
	fn test_excessive_signed_url_ttl_rejected() {
		let config_str = r#"
[service]
id = "test"

[storage]
primary = "memory"
[storage.implementations.memory]

[blobs]
primary = "memory"
signed_url_ttl_seconds = 100000
[blobs.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
	}
}
