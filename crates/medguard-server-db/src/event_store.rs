// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the audit log, plus the two permitted mutations: the
//! single-shot security-event resolution and the retention sweep.
//!
//! Every read is a single SQL statement, so each call sees one consistent
//! snapshot even under concurrent appends.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use tracing::instrument;

use medguard_audit_core::{
	ActorId, EventId, EventKind, EventRecord, Resolution, Severity, SubjectKind, SubjectRef,
};

use crate::error::{DbError, Result};

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
}

impl TimeWindow {
	pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
		Self { start, end }
	}

	/// Everything recorded before `end`.
	pub fn until(end: DateTime<Utc>) -> Self {
		Self {
			start: DateTime::UNIX_EPOCH,
			end,
		}
	}

	pub fn contains(&self, instant: DateTime<Utc>) -> bool {
		instant >= self.start && instant < self.end
	}
}

/// Optional filters applied to event reads.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
	pub kind: Option<EventKind>,
	pub actor: Option<ActorId>,
	pub severity: Option<Severity>,
	/// Keep only events at this severity or above.
	pub min_severity: Option<Severity>,
	/// Keep only security-class kinds.
	pub security_only: bool,
	/// Keep only rows without resolution state.
	pub unresolved_only: bool,
}

impl EventFilter {
	pub fn for_kind(kind: EventKind) -> Self {
		Self {
			kind: Some(kind),
			..Self::default()
		}
	}
}

/// Count of events for one kind within a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct KindCount {
	pub kind: EventKind,
	pub count: i64,
	pub percent: f64,
}

/// Count of events for one severity within a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityCount {
	pub severity: Severity,
	pub count: i64,
	pub percent: f64,
}

/// Aggregated view of the audit log over a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
	pub total: i64,
	/// Kinds with at least one event, most frequent first.
	pub by_kind: Vec<KindCount>,
	/// Every severity bucket, most severe first; zero counts included.
	pub by_severity: Vec<SeverityCount>,
}

impl EventSummary {
	pub fn kind_count(&self, kind: EventKind) -> i64 {
		self.by_kind
			.iter()
			.find(|c| c.kind == kind)
			.map(|c| c.count)
			.unwrap_or(0)
	}

	pub fn severity_count(&self, severity: Severity) -> i64 {
		self.by_severity
			.iter()
			.find(|c| c.severity == severity)
			.map(|c| c.count)
			.unwrap_or(0)
	}
}

/// Share of `count` in `total` as a percentage; zero when `total` is zero.
fn percent_of(count: i64, total: i64) -> f64 {
	if total == 0 {
		0.0
	} else {
		count as f64 / total as f64 * 100.0
	}
}

/// Read-side contract over the audit log.
#[async_trait]
pub trait EventStore: Send + Sync {
	/// Matching records ordered `occurred_at DESC`, ties broken by
	/// `id ASC` (ids are monotonic on insert).
	async fn list_events(
		&self,
		filter: &EventFilter,
		window: TimeWindow,
		limit: u32,
	) -> Result<Vec<EventRecord>>;

	async fn summarize(&self, filter: &EventFilter, window: TimeWindow) -> Result<EventSummary>;

	async fn count_events(&self, filter: &EventFilter, window: TimeWindow) -> Result<i64>;

	async fn get_event(&self, id: EventId) -> Result<Option<EventRecord>>;

	/// Transition a security-class row from unresolved to resolved.
	/// Rejected before any mutation when the note is empty, the row is
	/// missing, or the kind carries no resolution state; a second attempt
	/// on the same row is a conflict.
	async fn resolve_security_event(
		&self,
		id: EventId,
		resolver: ActorId,
		note: &str,
	) -> Result<EventRecord>;

	/// Delete rows whose retention horizon has passed.
	///
	/// Deletes only rows with `retention_until <= before`. The caller
	/// guarantees `before` is an instant at which those rows are genuinely
	/// eligible; this performs a direct bulk delete and trusts it.
	async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64>;
}

/// SQLite implementation of the event read side.
#[derive(Clone)]
pub struct SqliteEventStore {
	pool: SqlitePool,
}

impl SqliteEventStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn filter_conditions(filter: &EventFilter) -> Vec<String> {
		let mut conditions = Vec::new();
		if filter.kind.is_some() {
			conditions.push("kind = ?".to_string());
		}
		if filter.actor.is_some() {
			conditions.push("actor_id = ?".to_string());
		}
		if filter.severity.is_some() {
			conditions.push("severity = ?".to_string());
		}
		if let Some(min) = filter.min_severity {
			let placeholders = vec!["?"; min.at_or_above().len()].join(", ");
			conditions.push(format!("severity IN ({placeholders})"));
		}
		if filter.security_only {
			let kinds = EventKind::security_kinds()
				.iter()
				.map(|k| format!("'{k}'"))
				.collect::<Vec<_>>()
				.join(", ");
			conditions.push(format!("kind IN ({kinds})"));
		}
		if filter.unresolved_only {
			conditions.push("resolved = 0".to_string());
		}
		conditions.push("occurred_at >= ?".to_string());
		conditions.push("occurred_at < ?".to_string());
		conditions
	}
}

/// Binds filter and window values in the same order `filter_conditions`
/// emitted their placeholders.
macro_rules! bind_filter_window {
	($query:expr, $filter:expr, $window:expr) => {{
		let mut query = $query;
		if let Some(kind) = $filter.kind {
			query = query.bind(kind.to_string());
		}
		if let Some(actor) = $filter.actor {
			query = query.bind(actor.to_string());
		}
		if let Some(severity) = $filter.severity {
			query = query.bind(severity.to_string());
		}
		if let Some(min) = $filter.min_severity {
			for severity in min.at_or_above() {
				query = query.bind(severity.to_string());
			}
		}
		query = query
			.bind($window.start.to_rfc3339())
			.bind($window.end.to_rfc3339());
		query
	}};
}

#[async_trait]
impl EventStore for SqliteEventStore {
	#[instrument(skip(self, filter))]
	async fn list_events(
		&self,
		filter: &EventFilter,
		window: TimeWindow,
		limit: u32,
	) -> Result<Vec<EventRecord>> {
		let where_clause = Self::filter_conditions(filter).join(" AND ");
		let sql = format!(
			"SELECT {EVENT_COLUMNS} FROM audit_events WHERE {where_clause} \
			 ORDER BY occurred_at DESC, id ASC LIMIT ?"
		);

		let query = bind_filter_window!(sqlx::query_as::<_, EventRow>(&sql), filter, window)
			.bind(limit as i64);

		let rows = query.fetch_all(&self.pool).await?;
		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, filter))]
	async fn summarize(&self, filter: &EventFilter, window: TimeWindow) -> Result<EventSummary> {
		let where_clause = Self::filter_conditions(filter).join(" AND ");
		// One statement so the breakdown is a single consistent snapshot.
		let sql = format!(
			"SELECT kind, severity, COUNT(*) as cnt FROM audit_events \
			 WHERE {where_clause} GROUP BY kind, severity"
		);

		let query = bind_filter_window!(sqlx::query(&sql), filter, window);
		let rows = query.fetch_all(&self.pool).await?;

		let mut total: i64 = 0;
		let mut kind_counts: Vec<(EventKind, i64)> = Vec::new();
		let mut severity_counts: Vec<(Severity, i64)> = Vec::new();

		for row in rows {
			let kind_str: String = row.get("kind");
			let severity_str: String = row.get("severity");
			let count: i64 = row.get("cnt");

			let kind = EventKind::from_str(&kind_str).map_err(DbError::Internal)?;
			let severity = Severity::from_str(&severity_str).map_err(DbError::Internal)?;

			total += count;
			match kind_counts.iter_mut().find(|(k, _)| *k == kind) {
				Some((_, c)) => *c += count,
				None => kind_counts.push((kind, count)),
			}
			match severity_counts.iter_mut().find(|(s, _)| *s == severity) {
				Some((_, c)) => *c += count,
				None => severity_counts.push((severity, count)),
			}
		}

		kind_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

		let by_kind = kind_counts
			.into_iter()
			.map(|(kind, count)| KindCount {
				kind,
				count,
				percent: percent_of(count, total),
			})
			.collect();

		let by_severity = Severity::all()
			.iter()
			.map(|&severity| {
				let count = severity_counts
					.iter()
					.find(|(s, _)| *s == severity)
					.map(|(_, c)| *c)
					.unwrap_or(0);
				SeverityCount {
					severity,
					count,
					percent: percent_of(count, total),
				}
			})
			.collect();

		Ok(EventSummary {
			total,
			by_kind,
			by_severity,
		})
	}

	#[instrument(skip(self, filter))]
	async fn count_events(&self, filter: &EventFilter, window: TimeWindow) -> Result<i64> {
		let where_clause = Self::filter_conditions(filter).join(" AND ");
		let sql = format!("SELECT COUNT(*) as cnt FROM audit_events WHERE {where_clause}");

		let query = bind_filter_window!(sqlx::query(&sql), filter, window);
		let row = query.fetch_one(&self.pool).await?;
		Ok(row.get("cnt"))
	}

	#[instrument(skip(self), fields(event_id = %id))]
	async fn get_event(&self, id: EventId) -> Result<Option<EventRecord>> {
		let sql = format!("SELECT {EVENT_COLUMNS} FROM audit_events WHERE id = ?");
		let row = sqlx::query_as::<_, EventRow>(&sql)
			.bind(id.into_inner())
			.fetch_optional(&self.pool)
			.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, note, resolver), fields(event_id = %id, resolved_by = %resolver))]
	async fn resolve_security_event(
		&self,
		id: EventId,
		resolver: ActorId,
		note: &str,
	) -> Result<EventRecord> {
		if note.trim().is_empty() {
			return Err(DbError::Validation(
				"resolution note must not be empty".to_string(),
			));
		}

		let record = self
			.get_event(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("audit event {id}")))?;

		if !record.kind.is_security() {
			return Err(DbError::Validation(format!(
				"event kind '{}' carries no resolution state",
				record.kind
			)));
		}

		// Conditional update: the resolved flag flips at most once.
		let result = sqlx::query(
			r#"
			UPDATE audit_events
			SET resolved = 1, resolved_by = ?, resolution_note = ?, resolved_at = ?
			WHERE id = ? AND resolved = 0
			"#,
		)
		.bind(resolver.to_string())
		.bind(note.trim())
		.bind(Utc::now().to_rfc3339())
		.bind(id.into_inner())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::Conflict(format!(
				"security event {id} is already resolved"
			)));
		}

		self
			.get_event(id)
			.await?
			.ok_or_else(|| DbError::Internal(format!("audit event {id} vanished after update")))
	}

	#[instrument(skip(self))]
	async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query("DELETE FROM audit_events WHERE retention_until <= ?")
			.bind(before.to_rfc3339())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::info!(deleted, "purged expired audit rows");
		}
		Ok(deleted)
	}
}

const EVENT_COLUMNS: &str = "id, occurred_at, kind, severity, actor_id, subject_kind, \
	subject_id, description, ip_address, user_agent, request_path, request_method, \
	session_id, details, retention_until, resolved, resolved_by, resolution_note, resolved_at";

#[derive(sqlx::FromRow)]
struct EventRow {
	id: i64,
	occurred_at: String,
	kind: String,
	severity: String,
	actor_id: Option<String>,
	subject_kind: Option<String>,
	subject_id: Option<String>,
	description: String,
	ip_address: Option<String>,
	user_agent: Option<String>,
	request_path: Option<String>,
	request_method: Option<String>,
	session_id: Option<String>,
	details: String,
	retention_until: String,
	resolved: i64,
	resolved_by: Option<String>,
	resolution_note: Option<String>,
	resolved_at: Option<String>,
}

fn parse_datetime(s: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp '{s}': {e}")))
}

impl TryFrom<EventRow> for EventRecord {
	type Error = DbError;

	fn try_from(row: EventRow) -> Result<Self> {
		let kind = EventKind::from_str(&row.kind).map_err(DbError::Internal)?;
		let severity = Severity::from_str(&row.severity).map_err(DbError::Internal)?;

		let actor = row
			.actor_id
			.as_deref()
			.map(ActorId::from_str)
			.transpose()
			.map_err(|e| DbError::Internal(format!("invalid actor_id: {e}")))?;

		let subject = match (row.subject_kind.as_deref(), row.subject_id) {
			(Some(kind_str), Some(id)) => {
				let subject_kind = SubjectKind::from_str(kind_str).map_err(DbError::Internal)?;
				Some(SubjectRef::new(subject_kind, id))
			}
			_ => None,
		};

		let resolution = if row.resolved != 0 {
			let resolved_at = row
				.resolved_at
				.as_deref()
				.map(|s| parse_datetime(s, "resolved_at"))
				.transpose()?
				.ok_or_else(|| DbError::Internal("resolved row without resolved_at".to_string()))?;
			let resolved_by = row
				.resolved_by
				.as_deref()
				.map(ActorId::from_str)
				.transpose()
				.map_err(|e| DbError::Internal(format!("invalid resolved_by: {e}")))?;
			Some(Resolution {
				resolved_by,
				note: row.resolution_note.unwrap_or_default(),
				resolved_at,
			})
		} else {
			None
		};

		Ok(EventRecord {
			id: EventId::from(row.id),
			occurred_at: parse_datetime(&row.occurred_at, "occurred_at")?,
			kind,
			severity,
			actor,
			subject,
			description: row.description,
			ip_address: row.ip_address,
			user_agent: row.user_agent,
			request_path: row.request_path,
			request_method: row.request_method,
			session_id: row.session_id,
			details: serde_json::from_str(&row.details).unwrap_or(serde_json::Value::Null),
			retention_until: parse_datetime(&row.retention_until, "retention_until")?,
			resolution,
		})
	}
}
