// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository for compliance alerts.
//!
//! Re-raising the same violation must refresh the existing open alert,
//! never duplicate it. The partial unique index on `(kind, title)` over
//! open statuses backs this: when two generator runs race, the second
//! insert fails the constraint and falls back to an update.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use medguard_audit_core::{ActorId, Severity};
use medguard_compliance_core::{AlertDraft, AlertId, AlertKind, AlertStatus, ComplianceAlert};

use crate::error::{DbError, Result};

/// Storage contract for compliance alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
	/// Raise an alert, or refresh the open alert with the same
	/// `(kind, title)` if one exists. Idempotent under re-runs and safe
	/// under concurrent generator runs.
	async fn upsert_open(&self, draft: &AlertDraft) -> Result<ComplianceAlert>;

	async fn get_alert(&self, id: AlertId) -> Result<Option<ComplianceAlert>>;

	/// The open (non-terminal) alert for `(kind, title)`, if any.
	async fn find_open(&self, kind: AlertKind, title: &str) -> Result<Option<ComplianceAlert>>;

	async fn list_open(&self) -> Result<Vec<ComplianceAlert>>;

	/// Active alerts whose acknowledgment deadline has passed.
	async fn list_escalatable(&self, now: DateTime<Utc>) -> Result<Vec<ComplianceAlert>>;

	/// Persist an alert's current state (status transitions included).
	async fn update_alert(&self, alert: &ComplianceAlert) -> Result<()>;
}

/// SQLite implementation of the alert repository.
#[derive(Clone)]
pub struct SqliteAlertStore {
	pool: SqlitePool,
}

impl SqliteAlertStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	async fn insert_alert(&self, alert: &ComplianceAlert) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO compliance_alerts (
				id, kind, title, description, severity, affected_records, status,
				escalate_at, acknowledged_by, acknowledged_at,
				resolved_by, resolved_at, resolution_note,
				created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(alert.id.to_string())
		.bind(alert.kind.to_string())
		.bind(&alert.title)
		.bind(&alert.description)
		.bind(alert.severity.to_string())
		.bind(alert.affected_records)
		.bind(alert.status.to_string())
		.bind(alert.escalate_at.to_rfc3339())
		.bind(alert.acknowledged_by.map(|a| a.to_string()))
		.bind(alert.acknowledged_at.map(|dt| dt.to_rfc3339()))
		.bind(alert.resolved_by.map(|a| a.to_string()))
		.bind(alert.resolved_at.map(|dt| dt.to_rfc3339()))
		.bind(&alert.resolution_note)
		.bind(alert.created_at.to_rfc3339())
		.bind(alert.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	async fn refresh_open(
		&self,
		draft: &AlertDraft,
		now: DateTime<Utc>,
	) -> Result<Option<ComplianceAlert>> {
		match self.find_open(draft.kind, &draft.title).await? {
			Some(mut existing) => {
				existing.refresh(draft, now);
				self.update_alert(&existing).await?;
				Ok(Some(existing))
			}
			None => Ok(None),
		}
	}
}

fn open_status_list() -> String {
	AlertStatus::open_statuses()
		.iter()
		.map(|s| format!("'{s}'"))
		.collect::<Vec<_>>()
		.join(", ")
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Database(db_err) => db_err.message().to_lowercase().contains("unique"),
		_ => false,
	}
}

#[async_trait]
impl AlertStore for SqliteAlertStore {
	#[instrument(skip(self, draft), fields(kind = %draft.kind, title = %draft.title))]
	async fn upsert_open(&self, draft: &AlertDraft) -> Result<ComplianceAlert> {
		let now = Utc::now();

		if let Some(existing) = self.refresh_open(draft, now).await? {
			return Ok(existing);
		}

		let alert = ComplianceAlert::from_draft(draft.clone(), now);
		match self.insert_alert(&alert).await {
			Ok(()) => Ok(alert),
			Err(DbError::Sqlx(e)) if is_unique_violation(&e) => {
				// Lost the race to a concurrent generator run; the winner's
				// row is the one to refresh.
				self
					.refresh_open(draft, now)
					.await?
					.ok_or_else(|| {
						DbError::Internal(format!(
							"open alert ({}, {}) vanished after unique conflict",
							draft.kind, draft.title
						))
					})
			}
			Err(e) => Err(e),
		}
	}

	#[instrument(skip(self), fields(alert_id = %id))]
	async fn get_alert(&self, id: AlertId) -> Result<Option<ComplianceAlert>> {
		let row = sqlx::query_as::<_, AlertRow>(&format!(
			"SELECT {ALERT_COLUMNS} FROM compliance_alerts WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, kind, title), fields(alert_kind = %kind))]
	async fn find_open(&self, kind: AlertKind, title: &str) -> Result<Option<ComplianceAlert>> {
		let sql = format!(
			"SELECT {ALERT_COLUMNS} FROM compliance_alerts \
			 WHERE kind = ? AND title = ? AND status IN ({})",
			open_status_list()
		);
		let row = sqlx::query_as::<_, AlertRow>(&sql)
			.bind(kind.to_string())
			.bind(title)
			.fetch_optional(&self.pool)
			.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn list_open(&self) -> Result<Vec<ComplianceAlert>> {
		let sql = format!(
			"SELECT {ALERT_COLUMNS} FROM compliance_alerts \
			 WHERE status IN ({}) ORDER BY created_at DESC",
			open_status_list()
		);
		let rows = sqlx::query_as::<_, AlertRow>(&sql)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self))]
	async fn list_escalatable(&self, now: DateTime<Utc>) -> Result<Vec<ComplianceAlert>> {
		let sql = format!(
			"SELECT {ALERT_COLUMNS} FROM compliance_alerts \
			 WHERE status = 'active' AND escalate_at <= ? ORDER BY escalate_at ASC"
		);
		let rows = sqlx::query_as::<_, AlertRow>(&sql)
			.bind(now.to_rfc3339())
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, alert), fields(alert_id = %alert.id, status = %alert.status))]
	async fn update_alert(&self, alert: &ComplianceAlert) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE compliance_alerts
			SET description = ?, severity = ?, affected_records = ?, status = ?,
				acknowledged_by = ?, acknowledged_at = ?,
				resolved_by = ?, resolved_at = ?, resolution_note = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&alert.description)
		.bind(alert.severity.to_string())
		.bind(alert.affected_records)
		.bind(alert.status.to_string())
		.bind(alert.acknowledged_by.map(|a| a.to_string()))
		.bind(alert.acknowledged_at.map(|dt| dt.to_rfc3339()))
		.bind(alert.resolved_by.map(|a| a.to_string()))
		.bind(alert.resolved_at.map(|dt| dt.to_rfc3339()))
		.bind(&alert.resolution_note)
		.bind(alert.updated_at.to_rfc3339())
		.bind(alert.id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("compliance alert {}", alert.id)));
		}
		Ok(())
	}
}

const ALERT_COLUMNS: &str = "id, kind, title, description, severity, affected_records, \
	status, escalate_at, acknowledged_by, acknowledged_at, resolved_by, resolved_at, \
	resolution_note, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AlertRow {
	id: String,
	kind: String,
	title: String,
	description: String,
	severity: String,
	affected_records: i64,
	status: String,
	escalate_at: String,
	acknowledged_by: Option<String>,
	acknowledged_at: Option<String>,
	resolved_by: Option<String>,
	resolved_at: Option<String>,
	resolution_note: Option<String>,
	created_at: String,
	updated_at: String,
}

fn parse_datetime(s: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp '{s}': {e}")))
}

fn parse_actor(s: Option<&str>, column: &str) -> Result<Option<ActorId>> {
	s.map(ActorId::from_str)
		.transpose()
		.map_err(|e| DbError::Internal(format!("invalid {column}: {e}")))
}

impl TryFrom<AlertRow> for ComplianceAlert {
	type Error = DbError;

	fn try_from(row: AlertRow) -> Result<Self> {
		Ok(ComplianceAlert {
			id: AlertId::from_str(&row.id)
				.map_err(|e| DbError::Internal(format!("invalid alert id: {e}")))?,
			kind: AlertKind::from_str(&row.kind).map_err(DbError::Internal)?,
			title: row.title,
			description: row.description,
			severity: Severity::from_str(&row.severity).map_err(DbError::Internal)?,
			affected_records: row.affected_records,
			status: AlertStatus::from_str(&row.status).map_err(DbError::Internal)?,
			escalate_at: parse_datetime(&row.escalate_at, "escalate_at")?,
			acknowledged_by: parse_actor(row.acknowledged_by.as_deref(), "acknowledged_by")?,
			acknowledged_at: row
				.acknowledged_at
				.as_deref()
				.map(|s| parse_datetime(s, "acknowledged_at"))
				.transpose()?,
			resolved_by: parse_actor(row.resolved_by.as_deref(), "resolved_by")?,
			resolved_at: row
				.resolved_at
				.as_deref()
				.map(|s| parse_datetime(s, "resolved_at"))
				.transpose()?,
			resolution_note: row.resolution_note,
			created_at: parse_datetime(&row.created_at, "created_at")?,
			updated_at: parse_datetime(&row.updated_at, "updated_at")?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_audit_test_pool;
	use chrono::Duration;

	fn export_draft(affected: i64) -> AlertDraft {
		AlertDraft {
			kind: AlertKind::ExportOverdue,
			title: "3 Data Export Requests Overdue".to_string(),
			description: "Export requests past the 48 hour deadline".to_string(),
			severity: Severity::Medium,
			affected_records: affected,
			escalate_at: Utc::now() + Duration::hours(24),
		}
	}

	#[tokio::test]
	async fn upsert_creates_then_refreshes() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);

		let first = store.upsert_open(&export_draft(3)).await.unwrap();
		assert_eq!(first.status, AlertStatus::Active);
		assert_eq!(first.affected_records, 3);

		let second = store.upsert_open(&export_draft(5)).await.unwrap();
		assert_eq!(second.id, first.id);
		assert_eq!(second.affected_records, 5);

		let open = store.list_open().await.unwrap();
		assert_eq!(open.len(), 1);
		assert_eq!(open[0].affected_records, 5);
	}

	#[tokio::test]
	async fn concurrent_upserts_leave_one_open_row() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);

		let draft3 = export_draft(3);
		let draft4 = export_draft(4);
		let (a, b) = tokio::join!(
			store.upsert_open(&draft3),
			store.upsert_open(&draft4),
		);
		a.unwrap();
		b.unwrap();

		let open = store.list_open().await.unwrap();
		assert_eq!(open.len(), 1);
	}

	#[tokio::test]
	async fn upsert_after_resolution_opens_a_new_alert() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);
		let now = Utc::now();

		let mut first = store.upsert_open(&export_draft(3)).await.unwrap();
		first
			.resolve(ActorId::generate(), "exports delivered", now)
			.unwrap();
		store.update_alert(&first).await.unwrap();

		let second = store.upsert_open(&export_draft(2)).await.unwrap();
		assert_ne!(second.id, first.id);
		assert_eq!(second.status, AlertStatus::Active);

		let open = store.list_open().await.unwrap();
		assert_eq!(open.len(), 1);
	}

	#[tokio::test]
	async fn different_titles_are_distinct_alerts() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);

		store.upsert_open(&export_draft(3)).await.unwrap();

		let mut other = export_draft(1);
		other.title = "1 Data Export Request Overdue".to_string();
		store.upsert_open(&other).await.unwrap();

		assert_eq!(store.list_open().await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn find_open_ignores_terminal_alerts() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);
		let now = Utc::now();

		let mut alert = store.upsert_open(&export_draft(3)).await.unwrap();
		alert.dismiss(now).unwrap();
		store.update_alert(&alert).await.unwrap();

		let found = store
			.find_open(AlertKind::ExportOverdue, "3 Data Export Requests Overdue")
			.await
			.unwrap();
		assert!(found.is_none());
	}

	#[tokio::test]
	async fn transitions_survive_a_round_trip() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);
		let now = Utc::now();
		let actor = ActorId::generate();

		let mut alert = store.upsert_open(&export_draft(3)).await.unwrap();
		alert.acknowledge(actor, now).unwrap();
		store.update_alert(&alert).await.unwrap();

		let loaded = store.get_alert(alert.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, AlertStatus::Acknowledged);
		assert_eq!(loaded.acknowledged_by, Some(actor));
		assert!(loaded.acknowledged_at.is_some());
	}

	#[tokio::test]
	async fn list_escalatable_returns_only_overdue_active() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);
		let now = Utc::now();

		let mut overdue = export_draft(3);
		overdue.escalate_at = now - Duration::hours(1);
		store.upsert_open(&overdue).await.unwrap();

		let mut future = export_draft(1);
		future.title = "Other".to_string();
		future.escalate_at = now + Duration::hours(1);
		store.upsert_open(&future).await.unwrap();

		let mut acknowledged = export_draft(1);
		acknowledged.title = "Acknowledged".to_string();
		acknowledged.escalate_at = now - Duration::hours(2);
		let mut alert = store.upsert_open(&acknowledged).await.unwrap();
		alert.acknowledge(ActorId::generate(), now).unwrap();
		store.update_alert(&alert).await.unwrap();

		let due = store.list_escalatable(now).await.unwrap();
		assert_eq!(due.len(), 1);
		assert_eq!(due[0].title, "3 Data Export Requests Overdue");
	}

	#[tokio::test]
	async fn update_missing_alert_is_not_found() {
		let pool = create_audit_test_pool().await;
		let store = SqliteAlertStore::new(pool);
		let alert = ComplianceAlert::from_draft(export_draft(1), Utc::now());

		let err = store.update_alert(&alert).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}
}
