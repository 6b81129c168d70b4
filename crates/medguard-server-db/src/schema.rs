// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table and index definitions for the audit subsystem.

use sqlx::SqlitePool;

use crate::error::Result;

/// Create the audit tables and indexes if they do not exist.
///
/// `audit_events.id` is an AUTOINCREMENT rowid: monotonic in insertion
/// order, which the read side relies on as the ordering tiebreaker.
/// The partial unique index on `compliance_alerts` is what makes
/// concurrent generator runs collapse to a single open alert per
/// `(kind, title)` pair.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS audit_events (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			occurred_at TEXT NOT NULL,
			kind TEXT NOT NULL,
			severity TEXT NOT NULL,
			actor_id TEXT,
			subject_kind TEXT,
			subject_id TEXT,
			description TEXT NOT NULL,
			ip_address TEXT,
			user_agent TEXT,
			request_path TEXT,
			request_method TEXT,
			session_id TEXT,
			details TEXT NOT NULL,
			retention_until TEXT NOT NULL,
			resolved INTEGER NOT NULL DEFAULT 0,
			resolved_by TEXT,
			resolution_note TEXT,
			resolved_at TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_events_occurred ON audit_events(occurred_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_events_kind ON audit_events(kind, occurred_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_events_severity ON audit_events(severity, occurred_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_events_actor ON audit_events(actor_id, occurred_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS compliance_alerts (
			id TEXT PRIMARY KEY,
			kind TEXT NOT NULL,
			title TEXT NOT NULL,
			description TEXT NOT NULL,
			severity TEXT NOT NULL,
			affected_records INTEGER NOT NULL DEFAULT 0,
			status TEXT NOT NULL,
			escalate_at TEXT NOT NULL,
			acknowledged_by TEXT,
			acknowledged_at TEXT,
			resolved_by TEXT,
			resolved_at TEXT,
			resolution_note TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE UNIQUE INDEX IF NOT EXISTS idx_compliance_alerts_open
		ON compliance_alerts(kind, title)
		WHERE status IN ('active', 'acknowledged', 'in_progress', 'escalated')
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_compliance_alerts_status ON compliance_alerts(status, escalate_at)",
	)
	.execute(pool)
	.await?;

	tracing::debug!("audit schema ensured");
	Ok(())
}
