// Copyright (c) 2025 MedGuard SA (Pty) Ltd. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retention policy applied when an event row is appended.

use chrono::{DateTime, Duration, Utc};

/// Default retention period for audit rows in days (seven years).
pub const DEFAULT_RETENTION_DAYS: i64 = 2555;

/// Computes the retention horizon stamped onto each row at creation.
///
/// The horizon only governs deletion eligibility; nothing deletes a row
/// before it. The period is a deployment-level configuration input, never
/// hard-coded at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
	days: i64,
}

impl RetentionPolicy {
	/// Create a policy keeping rows for `days` days. Periods below one day
	/// are clamped up to one day.
	pub fn new(days: i64) -> Self {
		Self { days: days.max(1) }
	}

	pub fn days(&self) -> i64 {
		self.days
	}

	/// The earliest instant a row created at `occurred_at` may be purged.
	pub fn retention_until(&self, occurred_at: DateTime<Utc>) -> DateTime<Utc> {
		occurred_at + Duration::days(self.days)
	}
}

impl Default for RetentionPolicy {
	fn default() -> Self {
		Self::new(DEFAULT_RETENTION_DAYS)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_seven_years() {
		assert_eq!(RetentionPolicy::default().days(), 2555);
	}

	#[test]
	fn retention_until_is_after_occurred_at() {
		let policy = RetentionPolicy::default();
		let now = Utc::now();
		let until = policy.retention_until(now);
		assert!(until >= now + Duration::days(DEFAULT_RETENTION_DAYS));
	}

	#[test]
	fn sub_day_periods_are_clamped() {
		let policy = RetentionPolicy::new(0);
		assert_eq!(policy.days(), 1);

		let policy = RetentionPolicy::new(-30);
		assert_eq!(policy.days(), 1);
	}

	#[test]
	fn custom_period_is_respected() {
		let policy = RetentionPolicy::new(365);
		let now = Utc::now();
		assert_eq!(policy.retention_until(now), now + Duration::days(365));
	}
}
