// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Compliance alerting configuration section.
//!
//! Notification timelines differ between regulatory regimes (72 hour
//! HIPAA-style breach windows, shorter POPIA-style response deadlines).
//! Each deadline is its own knob; the deployment's regulatory profile
//! decides the values, not this crate.

use serde::{Deserialize, Serialize};

const DEFAULT_BREACH_NOTIFICATION_HOURS: i64 = 72;
const DEFAULT_EXPORT_DEADLINE_HOURS: i64 = 48;
const DEFAULT_ESCALATION_HOURS: i64 = 24;
const DEFAULT_SECURITY_LOOKBACK_DAYS: i64 = 30;
const DEFAULT_CONSENT_LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceConfigLayer {
	pub enabled: Option<bool>,
	pub breach_notification_hours: Option<i64>,
	pub export_deadline_hours: Option<i64>,
	pub escalation_hours: Option<i64>,
	pub security_lookback_days: Option<i64>,
	pub consent_lookback_hours: Option<i64>,
}

impl ComplianceConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.breach_notification_hours.is_some() {
			self.breach_notification_hours = other.breach_notification_hours;
		}
		if other.export_deadline_hours.is_some() {
			self.export_deadline_hours = other.export_deadline_hours;
		}
		if other.escalation_hours.is_some() {
			self.escalation_hours = other.escalation_hours;
		}
		if other.security_lookback_days.is_some() {
			self.security_lookback_days = other.security_lookback_days;
		}
		if other.consent_lookback_hours.is_some() {
			self.consent_lookback_hours = other.consent_lookback_hours;
		}
	}

	pub fn finalize(self) -> ComplianceConfig {
		ComplianceConfig {
			enabled: self.enabled.unwrap_or(true),
			breach_notification_hours: self
				.breach_notification_hours
				.unwrap_or(DEFAULT_BREACH_NOTIFICATION_HOURS),
			export_deadline_hours: self
				.export_deadline_hours
				.unwrap_or(DEFAULT_EXPORT_DEADLINE_HOURS),
			escalation_hours: self.escalation_hours.unwrap_or(DEFAULT_ESCALATION_HOURS),
			security_lookback_days: self
				.security_lookback_days
				.unwrap_or(DEFAULT_SECURITY_LOOKBACK_DAYS),
			consent_lookback_hours: self
				.consent_lookback_hours
				.unwrap_or(DEFAULT_CONSENT_LOOKBACK_HOURS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceConfig {
	pub enabled: bool,
	/// Hours before an unresolved reported breach counts as overdue.
	pub breach_notification_hours: i64,
	/// Hours before a data export request counts as overdue.
	pub export_deadline_hours: i64,
	/// Hours an alert may stay unacknowledged before it escalates.
	pub escalation_hours: i64,
	/// How far back the unresolved-security check looks.
	pub security_lookback_days: i64,
	/// How far back the expired-consent check looks.
	pub consent_lookback_hours: i64,
}

impl Default for ComplianceConfig {
	fn default() -> Self {
		ComplianceConfigLayer::default().finalize()
	}
}
