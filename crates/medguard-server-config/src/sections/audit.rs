// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.

use serde::{Deserialize, Serialize};

/// Seven years, the retention floor for HIPAA-class records.
const DEFAULT_RETENTION_DAYS: i64 = 2555;

fn default_retention_days() -> i64 {
	DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub retention_days: Option<i64>,
	pub min_severity: Option<String>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.retention_days.is_some() {
			self.retention_days = other.retention_days;
		}
		if other.min_severity.is_some() {
			self.min_severity = other.min_severity;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			retention_days: self.retention_days.unwrap_or_else(default_retention_days),
			min_severity: self.min_severity.unwrap_or_else(|| "low".to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	pub enabled: bool,
	/// Days each event row must be kept before it is eligible for purge.
	pub retention_days: i64,
	pub min_severity: String,
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			retention_days: default_retention_days(),
			min_severity: "low".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = AuditConfig::default();
		assert!(config.enabled);
		assert_eq!(config.retention_days, 2555);
		assert_eq!(config.min_severity, "low");
	}

	#[test]
	fn test_layer_finalize_defaults() {
		let config = AuditConfigLayer::default().finalize();
		assert!(config.enabled);
		assert_eq!(config.retention_days, 2555);
	}

	#[test]
	fn test_layer_finalize_with_values() {
		let layer = AuditConfigLayer {
			enabled: Some(false),
			retention_days: Some(365),
			min_severity: Some("high".to_string()),
		};
		let config = layer.finalize();
		assert!(!config.enabled);
		assert_eq!(config.retention_days, 365);
		assert_eq!(config.min_severity, "high");
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = AuditConfigLayer {
			enabled: Some(true),
			retention_days: Some(2555),
			..Default::default()
		};
		let overlay = AuditConfigLayer {
			retention_days: Some(1825),
			..Default::default()
		};
		base.merge(overlay);
		assert_eq!(base.enabled, Some(true));
		assert_eq!(base.retention_days, Some(1825));
	}

	#[test]
	fn test_toml_roundtrip() {
		let config = AuditConfig {
			enabled: true,
			retention_days: 1825,
			min_severity: "medium".to_string(),
		};
		let toml_str = toml::to_string(&config).unwrap();
		let parsed: AuditConfig = toml::from_str(&toml_str).unwrap();
		assert_eq!(config, parsed);
	}
}
