// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Compliance alert types and lifecycle.
//!
//! An alert is a derived, mutable-state entity raised when an aggregate
//! condition over the audit log needs human attention. Its lifecycle is
//! independent of the event rows that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use medguard_audit_core::{ActorId, Severity};

use crate::error::{ComplianceError, ComplianceResult};

/// Unique identifier for a compliance alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub Uuid);

impl AlertId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for AlertId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for AlertId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for AlertId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// The condition class an alert reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
	UnresolvedSecurityEvents,
	BreachNotificationOverdue,
	ExportOverdue,
	ConsentExpired,
}

impl fmt::Display for AlertKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AlertKind::UnresolvedSecurityEvents => "unresolved_security_events",
			AlertKind::BreachNotificationOverdue => "breach_notification_overdue",
			AlertKind::ExportOverdue => "export_overdue",
			AlertKind::ConsentExpired => "consent_expired",
		};
		write!(f, "{s}")
	}
}

impl FromStr for AlertKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"unresolved_security_events" => Ok(AlertKind::UnresolvedSecurityEvents),
			"breach_notification_overdue" => Ok(AlertKind::BreachNotificationOverdue),
			"export_overdue" => Ok(AlertKind::ExportOverdue),
			"consent_expired" => Ok(AlertKind::ConsentExpired),
			_ => Err(format!("unknown alert kind: {s}")),
		}
	}
}

/// Alert lifecycle status.
///
/// `Resolved` and `Dismissed` are terminal; every other status can still
/// move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
	Active,
	Acknowledged,
	InProgress,
	Resolved,
	Dismissed,
	Escalated,
}

impl AlertStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
	}

	/// The statuses that keep an alert "open" for dedup purposes.
	pub fn open_statuses() -> &'static [AlertStatus] {
		&[
			AlertStatus::Active,
			AlertStatus::Acknowledged,
			AlertStatus::InProgress,
			AlertStatus::Escalated,
		]
	}
}

impl fmt::Display for AlertStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AlertStatus::Active => "active",
			AlertStatus::Acknowledged => "acknowledged",
			AlertStatus::InProgress => "in_progress",
			AlertStatus::Resolved => "resolved",
			AlertStatus::Dismissed => "dismissed",
			AlertStatus::Escalated => "escalated",
		};
		write!(f, "{s}")
	}
}

impl FromStr for AlertStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(AlertStatus::Active),
			"acknowledged" => Ok(AlertStatus::Acknowledged),
			"in_progress" => Ok(AlertStatus::InProgress),
			"resolved" => Ok(AlertStatus::Resolved),
			"dismissed" => Ok(AlertStatus::Dismissed),
			"escalated" => Ok(AlertStatus::Escalated),
			_ => Err(format!("unknown alert status: {s}")),
		}
	}
}

/// Input for raising (or refreshing) an alert.
#[derive(Debug, Clone)]
pub struct AlertDraft {
	pub kind: AlertKind,
	pub title: String,
	pub description: String,
	pub severity: Severity,
	pub affected_records: i64,
	/// Acknowledgment deadline; an unacknowledged alert escalates past it.
	pub escalate_at: DateTime<Utc>,
}

/// A compliance alert with its full lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceAlert {
	pub id: AlertId,
	pub kind: AlertKind,
	/// Stable display title; `(kind, title)` identifies an open alert.
	pub title: String,
	pub description: String,
	pub severity: Severity,
	/// How many event rows the triggering condition currently covers.
	pub affected_records: i64,
	pub status: AlertStatus,

	/// Acknowledgment deadline, anchored at first raise.
	pub escalate_at: DateTime<Utc>,

	pub acknowledged_by: Option<ActorId>,
	pub acknowledged_at: Option<DateTime<Utc>>,
	pub resolved_by: Option<ActorId>,
	pub resolved_at: Option<DateTime<Utc>>,
	pub resolution_note: Option<String>,

	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ComplianceAlert {
	/// Create a fresh active alert from a draft.
	pub fn from_draft(draft: AlertDraft, now: DateTime<Utc>) -> Self {
		Self {
			id: AlertId::new(),
			kind: draft.kind,
			title: draft.title,
			description: draft.description,
			severity: draft.severity,
			affected_records: draft.affected_records,
			status: AlertStatus::Active,
			escalate_at: draft.escalate_at,
			acknowledged_by: None,
			acknowledged_at: None,
			resolved_by: None,
			resolved_at: None,
			resolution_note: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Refresh the mutable condition fields from a newer draft.
	///
	/// Status, acknowledgment state, and the escalation deadline are left
	/// untouched; only what the condition currently looks like changes.
	pub fn refresh(&mut self, draft: &AlertDraft, now: DateTime<Utc>) {
		self.description = draft.description.clone();
		self.severity = draft.severity;
		self.affected_records = draft.affected_records;
		self.updated_at = now;
	}

	/// Record an acknowledgment by `actor`.
	///
	/// Permitted from `Active` and from `Escalated` (a late acknowledgment
	/// after the deadline passed).
	pub fn acknowledge(&mut self, actor: ActorId, now: DateTime<Utc>) -> ComplianceResult<()> {
		match self.status {
			AlertStatus::Active | AlertStatus::Escalated => {
				self.status = AlertStatus::Acknowledged;
				self.acknowledged_by = Some(actor);
				self.acknowledged_at = Some(now);
				self.updated_at = now;
				Ok(())
			}
			from => Err(ComplianceError::InvalidTransition {
				from,
				to: AlertStatus::Acknowledged,
			}),
		}
	}

	/// Mark remediation work as started. Requires a prior acknowledgment.
	pub fn start_progress(&mut self, now: DateTime<Utc>) -> ComplianceResult<()> {
		match self.status {
			AlertStatus::Acknowledged => {
				self.status = AlertStatus::InProgress;
				self.updated_at = now;
				Ok(())
			}
			from => Err(ComplianceError::InvalidTransition {
				from,
				to: AlertStatus::InProgress,
			}),
		}
	}

	/// Resolve the alert. Requires a non-empty resolution note; on any
	/// validation or transition failure the alert is left unchanged.
	pub fn resolve(
		&mut self,
		actor: ActorId,
		note: &str,
		now: DateTime<Utc>,
	) -> ComplianceResult<()> {
		if note.trim().is_empty() {
			return Err(ComplianceError::Validation(
				"resolution note must not be empty".to_string(),
			));
		}

		match self.status {
			AlertStatus::Active | AlertStatus::Acknowledged | AlertStatus::InProgress => {
				self.status = AlertStatus::Resolved;
				self.resolved_by = Some(actor);
				self.resolved_at = Some(now);
				self.resolution_note = Some(note.trim().to_string());
				self.updated_at = now;
				Ok(())
			}
			from => Err(ComplianceError::InvalidTransition {
				from,
				to: AlertStatus::Resolved,
			}),
		}
	}

	/// Manual override: close the alert without resolution. Permitted from
	/// any non-terminal status.
	pub fn dismiss(&mut self, now: DateTime<Utc>) -> ComplianceResult<()> {
		if self.status.is_terminal() {
			return Err(ComplianceError::InvalidTransition {
				from: self.status,
				to: AlertStatus::Dismissed,
			});
		}
		self.status = AlertStatus::Dismissed;
		self.updated_at = now;
		Ok(())
	}

	/// Escalate an unacknowledged alert whose deadline has passed.
	pub fn escalate(&mut self, now: DateTime<Utc>) -> ComplianceResult<()> {
		match self.status {
			AlertStatus::Active => {
				self.status = AlertStatus::Escalated;
				self.updated_at = now;
				Ok(())
			}
			from => Err(ComplianceError::InvalidTransition {
				from,
				to: AlertStatus::Escalated,
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use proptest::prelude::*;

	fn draft() -> AlertDraft {
		AlertDraft {
			kind: AlertKind::ExportOverdue,
			title: "Data Export Requests Overdue".to_string(),
			description: "Export requests past deadline".to_string(),
			severity: Severity::Medium,
			affected_records: 3,
			escalate_at: Utc::now() + Duration::hours(24),
		}
	}

	#[test]
	fn fresh_alert_is_active() {
		let now = Utc::now();
		let alert = ComplianceAlert::from_draft(draft(), now);
		assert_eq!(alert.status, AlertStatus::Active);
		assert_eq!(alert.affected_records, 3);
		assert_eq!(alert.created_at, now);
		assert!(alert.acknowledged_by.is_none());
	}

	#[test]
	fn refresh_updates_condition_fields_only() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		let original_escalate_at = alert.escalate_at;

		let mut newer = draft();
		newer.affected_records = 7;
		newer.description = "More exports overdue".to_string();
		newer.escalate_at = Utc::now() + Duration::hours(48);

		let later = now + Duration::minutes(5);
		alert.refresh(&newer, later);

		assert_eq!(alert.affected_records, 7);
		assert_eq!(alert.description, "More exports overdue");
		assert_eq!(alert.status, AlertStatus::Active);
		assert_eq!(alert.escalate_at, original_escalate_at);
		assert_eq!(alert.updated_at, later);
	}

	#[test]
	fn acknowledge_from_active() {
		let now = Utc::now();
		let actor = ActorId::generate();
		let mut alert = ComplianceAlert::from_draft(draft(), now);

		alert.acknowledge(actor, now).unwrap();
		assert_eq!(alert.status, AlertStatus::Acknowledged);
		assert_eq!(alert.acknowledged_by, Some(actor));
		assert_eq!(alert.acknowledged_at, Some(now));
	}

	#[test]
	fn acknowledge_from_escalated_is_allowed() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.escalate(now).unwrap();

		alert.acknowledge(ActorId::generate(), now).unwrap();
		assert_eq!(alert.status, AlertStatus::Acknowledged);
	}

	#[test]
	fn acknowledge_twice_fails() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.acknowledge(ActorId::generate(), now).unwrap();

		let err = alert.acknowledge(ActorId::generate(), now).unwrap_err();
		assert_eq!(
			err,
			ComplianceError::InvalidTransition {
				from: AlertStatus::Acknowledged,
				to: AlertStatus::Acknowledged,
			}
		);
	}

	#[test]
	fn resolve_requires_note() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);

		let err = alert.resolve(ActorId::generate(), "   ", now).unwrap_err();
		assert!(matches!(err, ComplianceError::Validation(_)));
		assert_eq!(alert.status, AlertStatus::Active);
		assert!(alert.resolved_at.is_none());
	}

	#[test]
	fn resolve_from_active_and_acknowledged() {
		let now = Utc::now();
		let actor = ActorId::generate();

		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.resolve(actor, "exports delivered", now).unwrap();
		assert_eq!(alert.status, AlertStatus::Resolved);
		assert_eq!(alert.resolution_note.as_deref(), Some("exports delivered"));

		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.acknowledge(actor, now).unwrap();
		alert.resolve(actor, "exports delivered", now).unwrap();
		assert_eq!(alert.status, AlertStatus::Resolved);
	}

	#[test]
	fn resolve_from_in_progress() {
		let now = Utc::now();
		let actor = ActorId::generate();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.acknowledge(actor, now).unwrap();
		alert.start_progress(now).unwrap();
		alert.resolve(actor, "done", now).unwrap();
		assert_eq!(alert.status, AlertStatus::Resolved);
	}

	#[test]
	fn resolve_from_escalated_fails() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.escalate(now).unwrap();

		let err = alert
			.resolve(ActorId::generate(), "note", now)
			.unwrap_err();
		assert!(matches!(err, ComplianceError::InvalidTransition { .. }));
	}

	#[test]
	fn dismiss_from_any_non_terminal() {
		let now = Utc::now();

		let setups: [fn(&mut ComplianceAlert); 4] = [
			|_| {},
			|a| a.acknowledge(ActorId::generate(), Utc::now()).unwrap(),
			|a| {
				a.acknowledge(ActorId::generate(), Utc::now()).unwrap();
				a.start_progress(Utc::now()).unwrap();
			},
			|a| a.escalate(Utc::now()).unwrap(),
		];

		for setup in setups {
			let mut alert = ComplianceAlert::from_draft(draft(), now);
			setup(&mut alert);
			alert.dismiss(now).unwrap();
			assert_eq!(alert.status, AlertStatus::Dismissed);
		}
	}

	#[test]
	fn dismiss_from_terminal_fails() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.resolve(ActorId::generate(), "done", now).unwrap();

		assert!(alert.dismiss(now).is_err());
		assert_eq!(alert.status, AlertStatus::Resolved);
	}

	#[test]
	fn escalate_only_from_active() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		alert.acknowledge(ActorId::generate(), now).unwrap();

		assert!(alert.escalate(now).is_err());
		assert_eq!(alert.status, AlertStatus::Acknowledged);
	}

	#[test]
	fn start_progress_requires_acknowledgment() {
		let now = Utc::now();
		let mut alert = ComplianceAlert::from_draft(draft(), now);
		assert!(alert.start_progress(now).is_err());
	}

	#[test]
	fn terminal_statuses() {
		assert!(AlertStatus::Resolved.is_terminal());
		assert!(AlertStatus::Dismissed.is_terminal());
		assert!(!AlertStatus::Active.is_terminal());
		assert!(!AlertStatus::Escalated.is_terminal());
		assert_eq!(AlertStatus::open_statuses().len(), 4);
	}

	proptest! {
		#[test]
		fn alert_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = AlertId(Uuid::from_bytes(uuid_bytes));
			let parsed: AlertId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn alert_status_roundtrip(status in prop_oneof![
			Just(AlertStatus::Active),
			Just(AlertStatus::Acknowledged),
			Just(AlertStatus::InProgress),
			Just(AlertStatus::Resolved),
			Just(AlertStatus::Dismissed),
			Just(AlertStatus::Escalated),
		]) {
			let parsed: AlertStatus = status.to_string().parse().unwrap();
			prop_assert_eq!(status, parsed);
		}

		#[test]
		fn alert_kind_roundtrip(kind in prop_oneof![
			Just(AlertKind::UnresolvedSecurityEvents),
			Just(AlertKind::BreachNotificationOverdue),
			Just(AlertKind::ExportOverdue),
			Just(AlertKind::ConsentExpired),
		]) {
			let parsed: AlertKind = kind.to_string().parse().unwrap();
			prop_assert_eq!(kind, parsed);
		}
	}
}
