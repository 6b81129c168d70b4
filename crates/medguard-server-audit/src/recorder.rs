// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event writer.
//!
//! Every other subsystem records audit rows through [`EventRecorder`] as a
//! direct, synchronous side effect of the action being audited. There is
//! no queue and no buffering: when `record` returns `Ok`, exactly one row
//! is durable.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{error, instrument};

use medguard_audit_core::{EventId, EventRecord, NewEvent, RetentionPolicy};

use crate::error::AuditResult;

/// Appends audit rows with server-assigned time and retention.
///
/// Construct one per process at the entry point and share it; the
/// timestamp clamp lives here, so a single recorder guarantees that
/// `occurred_at` never decreases across its inserts.
pub struct EventRecorder {
	pool: SqlitePool,
	policy: RetentionPolicy,
	last_occurred: Mutex<DateTime<Utc>>,
}

impl EventRecorder {
	pub fn new(pool: SqlitePool, policy: RetentionPolicy) -> Self {
		Self {
			pool,
			policy,
			last_occurred: Mutex::new(DateTime::UNIX_EPOCH),
		}
	}

	pub fn policy(&self) -> RetentionPolicy {
		self.policy
	}

	/// Append one event row and return the stored record.
	///
	/// The timestamp is server time, clamped so it never runs backwards
	/// relative to the previous insert; the clamp lock is held across the
	/// INSERT so id order agrees with timestamp order. A draft without an
	/// actor for a kind that normally has one is still recorded (logging
	/// never blocks the primary action), with the anomaly flagged in the
	/// description. A storage failure is returned to the caller and also
	/// logged, so a gap in the audit trail is itself visible.
	#[instrument(skip(self, event), fields(kind = %event.kind, severity = %event.severity))]
	pub async fn record(&self, event: NewEvent) -> AuditResult<EventRecord> {
		let mut event = event;
		if event.actor.is_none() && !event.kind.allows_missing_actor() {
			event.description = format!("[unattributed] {}", event.description);
		}

		let details_json = serde_json::to_string(&event.details)?;

		let mut last = self.last_occurred.lock().await;
		let mut occurred_at = Utc::now();
		if occurred_at < *last {
			occurred_at = *last;
		}
		*last = occurred_at;

		let retention_until = self.policy.retention_until(occurred_at);

		let result = sqlx::query(
			r#"
			INSERT INTO audit_events (
				occurred_at, kind, severity, actor_id, subject_kind, subject_id,
				description, ip_address, user_agent, request_path, request_method,
				session_id, details, retention_until, resolved
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
			"#,
		)
		.bind(occurred_at.to_rfc3339())
		.bind(event.kind.to_string())
		.bind(event.severity.to_string())
		.bind(event.actor.map(|a| a.to_string()))
		.bind(event.subject.as_ref().map(|s| s.kind.to_string()))
		.bind(event.subject.as_ref().map(|s| s.id.clone()))
		.bind(&event.description)
		.bind(&event.ip_address)
		.bind(&event.user_agent)
		.bind(&event.request_path)
		.bind(&event.request_method)
		.bind(&event.session_id)
		.bind(&details_json)
		.bind(retention_until.to_rfc3339())
		.execute(&self.pool)
		.await;
		drop(last);

		let done = match result {
			Ok(done) => done,
			Err(e) => {
				// Fallback channel: the missing audit row must itself leave
				// a trace somewhere.
				error!(
					kind = %event.kind,
					severity = %event.severity,
					error = %e,
					"audit event write failed; compliance record lost"
				);
				return Err(e.into());
			}
		};

		Ok(EventRecord {
			id: EventId::from(done.last_insert_rowid()),
			occurred_at,
			kind: event.kind,
			severity: event.severity,
			actor: event.actor,
			subject: event.subject,
			description: event.description,
			ip_address: event.ip_address,
			user_agent: event.user_agent,
			request_path: event.request_path,
			request_method: event.request_method,
			session_id: event.session_id,
			details: event.details,
			retention_until,
			resolution: None,
		})
	}
}
