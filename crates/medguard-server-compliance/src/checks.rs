// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The registry of threshold checks the generator evaluates.
//!
//! Each check is a plain descriptor: an event filter, a window relative
//! to "now", and a count threshold. New checks are added to
//! [`default_checks`] rather than discovered dynamically.

use chrono::{DateTime, Duration, Utc};

use medguard_audit_core::{EventKind, Severity};
use medguard_compliance_core::AlertKind;
use medguard_server_config::ComplianceConfig;
use medguard_server_db::{EventFilter, TimeWindow};

/// How a check's window is anchored to the evaluation instant.
#[derive(Debug, Clone, Copy)]
pub enum CheckWindow {
	/// Events within the trailing duration: `[now - d, now)`.
	Within(Duration),
	/// Events older than the duration: `[epoch, now - d)`. Used for
	/// overdue checks where age past a deadline is the violation.
	OlderThan(Duration),
}

impl CheckWindow {
	pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
		match self {
			CheckWindow::Within(d) => TimeWindow::new(now - *d, now),
			CheckWindow::OlderThan(d) => TimeWindow::until(now - *d),
		}
	}
}

/// A single aggregate condition the generator watches.
#[derive(Debug, Clone)]
pub struct ThresholdCheck {
	pub kind: AlertKind,
	/// Stable title; together with `kind` it identifies the open alert.
	pub title: String,
	pub description: String,
	pub severity: Severity,
	pub filter: EventFilter,
	pub window: CheckWindow,
	/// Minimum matching count for the check to raise an alert.
	pub threshold: i64,
}

/// The checks shipped with the compliance module, parameterized by the
/// deployment's deadlines.
pub fn default_checks(config: &ComplianceConfig) -> Vec<ThresholdCheck> {
	vec![
		ThresholdCheck {
			kind: AlertKind::UnresolvedSecurityEvents,
			title: "Unresolved Security Events".to_string(),
			description: "Security events awaiting triage and resolution".to_string(),
			severity: Severity::High,
			filter: EventFilter {
				security_only: true,
				unresolved_only: true,
				..EventFilter::default()
			},
			window: CheckWindow::Within(Duration::days(config.security_lookback_days)),
			threshold: 1,
		},
		ThresholdCheck {
			kind: AlertKind::BreachNotificationOverdue,
			title: "Breach Notifications Overdue".to_string(),
			description: "Reported breaches past the notification deadline".to_string(),
			severity: Severity::Critical,
			filter: EventFilter {
				kind: Some(EventKind::BreachReported),
				unresolved_only: true,
				..EventFilter::default()
			},
			window: CheckWindow::OlderThan(Duration::hours(config.breach_notification_hours)),
			threshold: 1,
		},
		ThresholdCheck {
			kind: AlertKind::ExportOverdue,
			title: "Data Export Requests Overdue".to_string(),
			description: "Data subject export requests past the response deadline".to_string(),
			severity: Severity::Medium,
			filter: EventFilter::for_kind(EventKind::DataExportRequested),
			window: CheckWindow::OlderThan(Duration::hours(config.export_deadline_hours)),
			threshold: 1,
		},
		ThresholdCheck {
			kind: AlertKind::ConsentExpired,
			title: "Patient Consents Expired".to_string(),
			description: "Consent records that lapsed without renewal".to_string(),
			severity: Severity::Medium,
			filter: EventFilter::for_kind(EventKind::ConsentExpired),
			window: CheckWindow::Within(Duration::hours(config.consent_lookback_hours)),
			threshold: 1,
		},
	]
}
