use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub query: Query,
	pub quota: Quota,
	pub sync: Sync,
	pub history: History,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub retrieval: RetrievalProviderConfig,
	pub generation: GenerationProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct RetrievalProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub temperature: f32,
	pub max_output_tokens: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	pub models: TierModels,
}

/// Model identifiers the generation backend routes to, one per subscription
/// tier. Tier-specific model choice lives here so the pipeline never has to
/// branch on tier beyond passing it through.
#[derive(Debug, Deserialize)]
pub struct TierModels {
	pub free: String,
	pub pro: String,
	pub enterprise: String,
}

#[derive(Debug, Deserialize)]
pub struct Query {
	pub max_query_chars: u32,
	pub retrieval_limit: u32,
	pub min_similarity: f32,
}

#[derive(Debug, Deserialize)]
pub struct Quota {
	pub free_daily_limit: i64,
	/// Offset of the deployment's billing reference timezone from UTC.
	/// Daily counters roll over at midnight in this timezone.
	pub reference_utc_offset_hours: i32,
}

#[derive(Debug, Deserialize)]
pub struct Sync {
	pub max_batch_entries: u32,
	/// Entries with matching normalized text whose timestamps fall within
	/// this window are the same real-world event.
	pub dedup_window_secs: i64,
	/// Wider window for logging text matches that just missed the duplicate
	/// window, so the windows can be tuned from production logs.
	pub near_miss_window_secs: i64,
	/// How many recent server records to compare an incoming batch against.
	pub dedup_scan_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct History {
	pub list_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}
