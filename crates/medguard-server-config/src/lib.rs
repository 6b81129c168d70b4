// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the MedGuard server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`MEDGUARD_*`)
//!
//! # Usage
//!
//! ```ignore
//! use medguard_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("audit retention: {} days", config.audit.retention_days);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub audit: AuditConfig,
	pub compliance: ComplianceConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`MEDGUARD_*`)
/// 2. Config file (`/etc/medguard/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let audit = layer.audit.unwrap_or_default().finalize();
	let compliance = layer.compliance.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&audit, &compliance)?;

	info!(
		database = %database.url,
		audit_enabled = audit.enabled,
		retention_days = audit.retention_days,
		compliance_enabled = compliance.enabled,
		breach_notification_hours = compliance.breach_notification_hours,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		audit,
		compliance,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(audit: &AuditConfig, compliance: &ComplianceConfig) -> Result<(), ConfigError> {
	if audit.retention_days < 1 {
		return Err(ConfigError::Validation(format!(
			"MEDGUARD_AUDIT_RETENTION_DAYS must be at least 1, got {}. \
			 Regulated audit records may not be configured for immediate deletion.",
			audit.retention_days
		)));
	}

	for (name, value) in [
		(
			"breach_notification_hours",
			compliance.breach_notification_hours,
		),
		("export_deadline_hours", compliance.export_deadline_hours),
		("escalation_hours", compliance.escalation_hours),
	] {
		if value < 1 {
			return Err(ConfigError::Validation(format!(
				"compliance.{name} must be at least 1, got {value}"
			)));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_defaults_finalize() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, "sqlite:./medguard.db");
		assert_eq!(config.audit.retention_days, 2555);
		assert_eq!(config.compliance.breach_notification_hours, 72);
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_zero_retention_is_rejected() {
		let layer = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		let result = finalize(layer);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("RETENTION_DAYS"));
	}

	#[test]
	fn test_zero_deadline_is_rejected() {
		let layer = ServerConfigLayer {
			compliance: Some(ComplianceConfigLayer {
				escalation_hours: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(finalize(layer).is_err());
	}

	#[test]
	fn test_load_config_with_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[audit]
retention_days = 1825

[logging]
level = "debug"
"#
		)
		.unwrap();

		let config = load_config_with_file(file.path()).unwrap();
		assert_eq!(config.audit.retention_days, 1825);
		assert_eq!(config.logging.level, "debug");
		assert_eq!(config.compliance.export_deadline_hours, 48);
	}
}
