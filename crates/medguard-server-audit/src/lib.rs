// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod error;
pub mod recorder;

pub use error::{AuditError, AuditResult};
pub use recorder::EventRecorder;

pub use medguard_audit_core::{
	ActorId, EventBuilder, EventId, EventKind, EventRecord, NewEvent, Resolution, RetentionPolicy,
	Severity, SubjectKind, SubjectRef, DEFAULT_RETENTION_DAYS,
};
