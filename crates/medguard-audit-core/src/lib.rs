// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod event;
pub mod retention;

pub use event::{
	ActorId, EventBuilder, EventId, EventKind, EventRecord, NewEvent, Resolution, Severity,
	SubjectKind, SubjectRef,
};
pub use retention::{RetentionPolicy, DEFAULT_RETENTION_DAYS};
