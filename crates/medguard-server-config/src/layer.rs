// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A partial configuration as read from one source.

use serde::Deserialize;

use crate::sections::{
	AuditConfigLayer, ComplianceConfigLayer, DatabaseConfigLayer, LoggingConfigLayer,
};

/// One source's view of the configuration; every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub audit: Option<AuditConfigLayer>,
	#[serde(default)]
	pub compliance: Option<ComplianceConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, overlay: Option<T>, merge: fn(&mut T, T)) {
	if let Some(overlay) = overlay {
		match base.as_mut() {
			Some(base) => merge(base, overlay),
			None => *base = Some(overlay),
		}
	}
}

impl ServerConfigLayer {
	/// Merge `other` on top of `self`; `other`'s values win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.audit, other.audit, AuditConfigLayer::merge);
		merge_section(
			&mut self.compliance,
			other.compliance,
			ComplianceConfigLayer::merge,
		);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_overlay_wins() {
		let mut base = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(2555),
				..Default::default()
			}),
			..Default::default()
		};
		let overlay = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(365),
				..Default::default()
			}),
			..Default::default()
		};

		base.merge(overlay);
		assert_eq!(base.audit.unwrap().retention_days, Some(365));
	}

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		let overlay = ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
			}),
			..Default::default()
		};

		base.merge(overlay);
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite::memory:")
		);
	}

	#[test]
	fn test_merge_keeps_base_when_overlay_empty() {
		let mut base = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
			}),
			..Default::default()
		};

		base.merge(ServerConfigLayer::default());
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}
}
