// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for the audit and compliance subsystem.
//!
//! Discipline: each write is a single-row transaction, each read is a
//! single consistent-snapshot query. No multi-statement transaction spans
//! this subsystem.

pub mod alert_store;
pub mod error;
pub mod event_store;
pub mod pool;
pub mod schema;
pub mod testing;

pub use alert_store::{AlertStore, SqliteAlertStore};
pub use error::{DbError, Result};
pub use event_store::{
	EventFilter, EventStore, EventSummary, KindCount, SeverityCount, SqliteEventStore, TimeWindow,
};
pub use pool::create_pool;
pub use schema::create_schema;
