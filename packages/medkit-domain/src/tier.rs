use serde::{Deserialize, Serialize};

/// Subscription tier. Closed set: quota ceilings and sync entitlement hang
/// off this, and the generation backend picks its model per tier.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
	Free,
	Pro,
	Enterprise,
}

impl Tier {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"free" => Some(Self::Free),
			"pro" => Some(Self::Pro),
			"enterprise" => Some(Self::Enterprise),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Free => "free",
			Self::Pro => "pro",
			Self::Enterprise => "enterprise",
		}
	}

	/// Daily query ceiling. `None` means unbounded.
	pub fn daily_query_limit(&self, free_daily_limit: i64) -> Option<i64> {
		match self {
			Self::Free => Some(free_daily_limit),
			Self::Pro | Self::Enterprise => None,
		}
	}

	/// History synchronization is a paid feature.
	pub fn can_sync(&self) -> bool {
		!matches!(self, Self::Free)
	}
}
