// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The alert generator.
//!
//! Evaluates the check registry against the audit log's aggregation layer
//! and keeps one open [`ComplianceAlert`] per violated condition.
//! Re-running against unchanged data refreshes the existing alert instead
//! of duplicating it, so the generator can run on any schedule without
//! causing alert storms.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use medguard_compliance_core::{AlertDraft, ComplianceAlert};
use medguard_server_config::ComplianceConfig;
use medguard_server_db::{AlertStore, EventStore};

use crate::checks::{default_checks, ThresholdCheck};
use crate::error::GeneratorResult;

/// Derives compliance alerts from aggregate audit-log conditions.
///
/// Dependencies are injected at construction; the process entry point
/// owns their lifecycle.
pub struct AlertGenerator {
	events: Arc<dyn EventStore>,
	alerts: Arc<dyn AlertStore>,
	checks: Vec<ThresholdCheck>,
	escalation: Duration,
}

impl AlertGenerator {
	pub fn new(
		events: Arc<dyn EventStore>,
		alerts: Arc<dyn AlertStore>,
		config: &ComplianceConfig,
	) -> Self {
		Self {
			events,
			alerts,
			checks: default_checks(config),
			escalation: Duration::hours(config.escalation_hours),
		}
	}

	/// Replace the default check registry (used by dashboards with
	/// bespoke conditions, and by tests).
	pub fn with_checks(
		events: Arc<dyn EventStore>,
		alerts: Arc<dyn AlertStore>,
		checks: Vec<ThresholdCheck>,
		escalation: Duration,
	) -> Self {
		Self {
			events,
			alerts,
			checks,
			escalation,
		}
	}

	/// Evaluate every check at `now`, upserting one open alert per
	/// violated condition. Returns the alerts that are currently raised.
	#[instrument(skip(self))]
	pub async fn run(&self, now: DateTime<Utc>) -> GeneratorResult<Vec<ComplianceAlert>> {
		let mut raised = Vec::new();

		for check in &self.checks {
			let window = check.window.resolve(now);
			let count = self.events.count_events(&check.filter, window).await?;
			if count < check.threshold {
				continue;
			}

			let draft = AlertDraft {
				kind: check.kind,
				title: check.title.clone(),
				description: format!("{} ({count} records affected)", check.description),
				severity: check.severity,
				affected_records: count,
				escalate_at: now + self.escalation,
			};

			let alert = self.alerts.upsert_open(&draft).await?;
			info!(
				kind = %alert.kind,
				affected = alert.affected_records,
				status = %alert.status,
				"compliance alert raised"
			);
			raised.push(alert);
		}

		Ok(raised)
	}

	/// Escalate every active alert whose acknowledgment deadline has
	/// passed. Acknowledged and terminal alerts are untouched.
	#[instrument(skip(self))]
	pub async fn escalate_overdue(&self, now: DateTime<Utc>) -> GeneratorResult<Vec<ComplianceAlert>> {
		let due = self.alerts.list_escalatable(now).await?;
		let mut escalated = Vec::new();

		for mut alert in due {
			alert.escalate(now)?;
			self.alerts.update_alert(&alert).await?;
			warn!(
				alert_id = %alert.id,
				kind = %alert.kind,
				"alert escalated: acknowledgment deadline passed"
			);
			escalated.push(alert);
		}

		Ok(escalated)
	}
}
