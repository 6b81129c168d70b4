// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::schema::create_schema;

/// In-memory pool pinned to one connection so every caller sees the same
/// database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

pub async fn create_audit_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_schema(&pool).await.unwrap();
	pool
}
