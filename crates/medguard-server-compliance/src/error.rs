// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use medguard_compliance_core::ComplianceError;
use medguard_server_db::DbError;

pub type GeneratorResult<T> = Result<T, GeneratorError>;

#[derive(Error, Debug)]
pub enum GeneratorError {
	#[error("storage error: {0}")]
	Db(#[from] DbError),

	#[error("alert lifecycle error: {0}")]
	Alert(#[from] ComplianceError),
}
