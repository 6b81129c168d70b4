// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::alert::AlertStatus;

pub type ComplianceResult<T> = Result<T, ComplianceError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ComplianceError {
	#[error("validation error: {0}")]
	Validation(String),

	#[error("invalid alert transition from '{from}' to '{to}'")]
	InvalidTransition { from: AlertStatus, to: AlertStatus },
}
