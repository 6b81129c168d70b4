// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for the audit log.
//!
//! This module provides the foundational types for the audit system:
//!
//! - [`EventKind`]: Enumeration of all auditable actions
//! - [`Severity`]: Ordered severity levels used for filtering and alerting
//! - [`EventRecord`]: A durable, immutable audit row
//! - [`NewEvent`] / [`EventBuilder`]: Fluent API for constructing drafts
//!   before they are appended by the recorder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Actions that can be recorded in the audit log.
///
/// The set only ever grows; kinds are never removed or renamed once a row
/// referencing them has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	// Data access events
	Create,
	Read,
	Update,
	Delete,

	// Authentication events
	LoginSuccess,
	LoginFailure,

	// Security events
	AccessDenied,
	BreachAttempt,
	SecurityEvent,

	// Consent events
	ConsentGranted,
	ConsentWithdrawn,
	ConsentExpired,

	// Breach workflow events
	BreachReported,
	BreachNotificationSent,

	// Data subject export events
	DataExportRequested,
	DataExportCompleted,

	// Background maintenance events
	RetentionPurge,
}

impl EventKind {
	/// Returns the default severity for this event kind.
	///
	/// Callers may override per event; the mapping here is the floor used
	/// when nothing more specific is known:
	/// - `Low`: routine reads/writes and successful operations
	/// - `Medium`: deletions, failures, and consent changes
	/// - `High`: denied access and open security events
	/// - `Critical`: breach activity
	pub fn default_severity(&self) -> Severity {
		match self {
			EventKind::Create
			| EventKind::Read
			| EventKind::Update
			| EventKind::LoginSuccess
			| EventKind::ConsentGranted
			| EventKind::DataExportCompleted
			| EventKind::RetentionPurge => Severity::Low,

			EventKind::Delete
			| EventKind::LoginFailure
			| EventKind::ConsentWithdrawn
			| EventKind::ConsentExpired
			| EventKind::DataExportRequested => Severity::Medium,

			EventKind::AccessDenied
			| EventKind::SecurityEvent
			| EventKind::BreachNotificationSent => Severity::High,

			EventKind::BreachAttempt | EventKind::BreachReported => Severity::Critical,
		}
	}

	/// Whether a missing actor is expected for this kind.
	///
	/// Failed logins happen before identity is established, and background
	/// maintenance runs without a user. Everything else normally carries an
	/// actor; the recorder flags the description when one is absent.
	pub fn allows_missing_actor(&self) -> bool {
		matches!(
			self,
			EventKind::LoginFailure
				| EventKind::BreachAttempt
				| EventKind::SecurityEvent
				| EventKind::RetentionPurge
		)
	}

	/// Whether rows of this kind carry resolution state.
	///
	/// Only security-class events can transition from unresolved to
	/// resolved; all other rows stay immutable for their whole lifetime.
	pub fn is_security(&self) -> bool {
		matches!(
			self,
			EventKind::AccessDenied
				| EventKind::BreachAttempt
				| EventKind::SecurityEvent
				| EventKind::BreachReported
		)
	}

	/// All kinds that carry resolution state, in declaration order.
	pub fn security_kinds() -> &'static [EventKind] {
		&[
			EventKind::AccessDenied,
			EventKind::BreachAttempt,
			EventKind::SecurityEvent,
			EventKind::BreachReported,
		]
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			EventKind::Create => "create",
			EventKind::Read => "read",
			EventKind::Update => "update",
			EventKind::Delete => "delete",
			EventKind::LoginSuccess => "login_success",
			EventKind::LoginFailure => "login_failure",
			EventKind::AccessDenied => "access_denied",
			EventKind::BreachAttempt => "breach_attempt",
			EventKind::SecurityEvent => "security_event",
			EventKind::ConsentGranted => "consent_granted",
			EventKind::ConsentWithdrawn => "consent_withdrawn",
			EventKind::ConsentExpired => "consent_expired",
			EventKind::BreachReported => "breach_reported",
			EventKind::BreachNotificationSent => "breach_notification_sent",
			EventKind::DataExportRequested => "data_export_requested",
			EventKind::DataExportCompleted => "data_export_completed",
			EventKind::RetentionPurge => "retention_purge",
		};
		write!(f, "{s}")
	}
}

impl FromStr for EventKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"create" => Ok(EventKind::Create),
			"read" => Ok(EventKind::Read),
			"update" => Ok(EventKind::Update),
			"delete" => Ok(EventKind::Delete),
			"login_success" => Ok(EventKind::LoginSuccess),
			"login_failure" => Ok(EventKind::LoginFailure),
			"access_denied" => Ok(EventKind::AccessDenied),
			"breach_attempt" => Ok(EventKind::BreachAttempt),
			"security_event" => Ok(EventKind::SecurityEvent),
			"consent_granted" => Ok(EventKind::ConsentGranted),
			"consent_withdrawn" => Ok(EventKind::ConsentWithdrawn),
			"consent_expired" => Ok(EventKind::ConsentExpired),
			"breach_reported" => Ok(EventKind::BreachReported),
			"breach_notification_sent" => Ok(EventKind::BreachNotificationSent),
			"data_export_requested" => Ok(EventKind::DataExportRequested),
			"data_export_completed" => Ok(EventKind::DataExportCompleted),
			"retention_purge" => Ok(EventKind::RetentionPurge),
			_ => Err(format!("unknown event kind: {s}")),
		}
	}
}

/// Severity levels for audit events.
///
/// The derived ordering is by urgency: `Low < Medium < High < Critical`.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	#[default]
	Low,
	Medium,
	High,
	Critical,
}

impl Severity {
	/// Returns all severity levels from most to least severe.
	pub fn all() -> &'static [Severity] {
		&[
			Severity::Critical,
			Severity::High,
			Severity::Medium,
			Severity::Low,
		]
	}

	/// Returns this level and everything more severe, most severe first.
	pub fn at_or_above(&self) -> Vec<Severity> {
		Severity::all()
			.iter()
			.copied()
			.filter(|s| s >= self)
			.collect()
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Severity::Low => "low",
			Severity::Medium => "medium",
			Severity::High => "high",
			Severity::Critical => "critical",
		};
		write!(f, "{s}")
	}
}

impl FromStr for Severity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"low" => Ok(Severity::Low),
			"medium" => Ok(Severity::Medium),
			"high" => Ok(Severity::High),
			"critical" => Ok(Severity::Critical),
			_ => Err(format!("unknown severity: {s}")),
		}
	}
}

/// A unique identifier for an event row.
///
/// Assigned by the store at insertion and monotonic in insertion order,
/// which makes it the tiebreaker for equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn into_inner(self) -> i64 {
		self.0
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for EventId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

impl From<EventId> for i64 {
	fn from(id: EventId) -> Self {
		id.0
	}
}

/// A unique identifier for the user who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn into_inner(self) -> Uuid {
		self.0
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ActorId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

impl From<Uuid> for ActorId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

impl From<ActorId> for Uuid {
	fn from(id: ActorId) -> Self {
		id.0
	}
}

/// The class of entity an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
	Patient,
	MedicationRecord,
	ConsentRecord,
	Page,
	ExportRequest,
	BreachCase,
}

impl fmt::Display for SubjectKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			SubjectKind::Patient => "patient",
			SubjectKind::MedicationRecord => "medication_record",
			SubjectKind::ConsentRecord => "consent_record",
			SubjectKind::Page => "page",
			SubjectKind::ExportRequest => "export_request",
			SubjectKind::BreachCase => "breach_case",
		};
		write!(f, "{s}")
	}
}

impl FromStr for SubjectKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"patient" => Ok(SubjectKind::Patient),
			"medication_record" => Ok(SubjectKind::MedicationRecord),
			"consent_record" => Ok(SubjectKind::ConsentRecord),
			"page" => Ok(SubjectKind::Page),
			"export_request" => Ok(SubjectKind::ExportRequest),
			"breach_case" => Ok(SubjectKind::BreachCase),
			_ => Err(format!("unknown subject kind: {s}")),
		}
	}
}

/// An explicit tagged reference to the entity an event concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
	pub kind: SubjectKind,
	pub id: String,
}

impl SubjectRef {
	pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
		Self {
			kind,
			id: id.into(),
		}
	}
}

impl fmt::Display for SubjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind, self.id)
	}
}

/// Resolution state for a security-class event row.
///
/// Written at most once; an unresolved row has no `Resolution` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
	pub resolved_by: Option<ActorId>,
	pub note: String,
	pub resolved_at: DateTime<Utc>,
}

/// A durable row in the audit log.
///
/// Immutable after creation except for the single unresolved-to-resolved
/// transition on security-class kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
	/// Store-assigned identifier, monotonic in insertion order.
	pub id: EventId,
	/// Server-assigned time of the event. Never client-supplied.
	pub occurred_at: DateTime<Utc>,
	pub kind: EventKind,
	pub severity: Severity,

	/// The user who performed the action, when identity is known.
	pub actor: Option<ActorId>,
	/// The entity the event concerns.
	pub subject: Option<SubjectRef>,

	/// Human-readable summary of what happened.
	pub description: String,

	/// Request metadata captured at the call site.
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub request_path: Option<String>,
	pub request_method: Option<String>,
	pub session_id: Option<String>,

	/// Structured payload: change sets, previous/new values, extras.
	pub details: serde_json::Value,

	/// Earliest instant this row becomes eligible for deletion.
	pub retention_until: DateTime<Utc>,

	/// Resolution state; populated only for security-class kinds.
	pub resolution: Option<Resolution>,
}

impl EventRecord {
	pub fn is_resolved(&self) -> bool {
		self.resolution.is_some()
	}
}

/// A draft event, ready to be appended by the recorder.
///
/// The store assigns `id`, `occurred_at`, and `retention_until`; nothing
/// here can influence them.
#[derive(Debug, Clone)]
pub struct NewEvent {
	pub kind: EventKind,
	pub severity: Severity,
	pub actor: Option<ActorId>,
	pub subject: Option<SubjectRef>,
	pub description: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub request_path: Option<String>,
	pub request_method: Option<String>,
	pub session_id: Option<String>,
	pub details: serde_json::Value,
}

impl NewEvent {
	/// Create a new event builder for the given kind.
	pub fn builder(kind: EventKind) -> EventBuilder {
		EventBuilder::new(kind)
	}
}

/// Builder for constructing event drafts with a fluent API.
#[derive(Debug, Clone)]
pub struct EventBuilder {
	kind: EventKind,
	severity: Option<Severity>,
	actor: Option<ActorId>,
	subject: Option<SubjectRef>,
	description: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	request_path: Option<String>,
	request_method: Option<String>,
	session_id: Option<String>,
	details: serde_json::Value,
}

impl EventBuilder {
	pub fn new(kind: EventKind) -> Self {
		Self {
			kind,
			severity: None,
			actor: None,
			subject: None,
			description: None,
			ip_address: None,
			user_agent: None,
			request_path: None,
			request_method: None,
			session_id: None,
			details: serde_json::Value::Null,
		}
	}

	/// Set the severity. Defaults to the kind's default severity.
	pub fn severity(mut self, severity: Severity) -> Self {
		self.severity = Some(severity);
		self
	}

	/// Set the user who performed the action.
	pub fn actor(mut self, actor: ActorId) -> Self {
		self.actor = Some(actor);
		self
	}

	/// Set the entity the event concerns.
	pub fn subject(mut self, kind: SubjectKind, id: impl Into<String>) -> Self {
		self.subject = Some(SubjectRef::new(kind, id));
		self
	}

	/// Set the human-readable summary.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn request_path(mut self, path: impl Into<String>) -> Self {
		self.request_path = Some(path.into());
		self
	}

	pub fn request_method(mut self, method: impl Into<String>) -> Self {
		self.request_method = Some(method.into());
		self
	}

	pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	/// Set the structured payload.
	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	/// Build the draft.
	pub fn build(self) -> NewEvent {
		NewEvent {
			kind: self.kind,
			severity: self.severity.unwrap_or_else(|| self.kind.default_severity()),
			actor: self.actor,
			subject: self.subject,
			description: self
				.description
				.unwrap_or_else(|| self.kind.to_string()),
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			request_path: self.request_path,
			request_method: self.request_method,
			session_id: self.session_id,
			details: self.details,
		}
	}
}
