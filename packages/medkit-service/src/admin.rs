use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use medkit_domain::reference_day;
use medkit_storage::queries;

use crate::{Error, MedkitService, Result};

/// Read-only quota diagnostics for the admin surface.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UsageReport {
	pub user_id: Uuid,
	pub tier: String,
	pub used_today: i64,
	/// `None` for unbounded (paid) tiers.
	pub daily_limit: Option<i64>,
}

impl MedkitService {
	pub async fn usage(&self, user_id: Uuid) -> Result<UsageReport> {
		let Some(user) = queries::get_user(&self.db, user_id).await? else {
			return Err(Error::NotFound { message: "User not found.".to_string() });
		};
		let tier = self.resolve_tier(&user);
		let day = reference_day(
			OffsetDateTime::now_utc(),
			self.cfg.quota.reference_utc_offset_hours,
		);
		let used_today = queries::usage_on_day(&self.db, user.user_id, day).await?;

		Ok(UsageReport {
			user_id: user.user_id,
			tier: tier.as_str().to_string(),
			used_today,
			daily_limit: tier.daily_query_limit(self.cfg.quota.free_daily_limit),
		})
	}
}
