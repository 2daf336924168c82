use time::{Date, OffsetDateTime, UtcOffset};

use crate::tier::Tier;

/// Calendar day of `now` in the deployment's billing reference timezone.
/// Daily usage counters are keyed by this date, so the rollover happens at
/// local midnight rather than UTC midnight.
pub fn reference_day(now: OffsetDateTime, reference_utc_offset_hours: i32) -> Date {
	let offset = UtcOffset::from_hms(
		reference_utc_offset_hours.clamp(-12, 14) as i8,
		0,
		0,
	)
	.unwrap_or(UtcOffset::UTC);

	now.to_offset(offset).date()
}

/// Whether a user with `used_today` recorded queries may run one more.
pub fn allows_query(tier: Tier, used_today: i64, free_daily_limit: i64) -> bool {
	match tier.daily_query_limit(free_daily_limit) {
		Some(limit) => used_today < limit,
		None => true,
	}
}
