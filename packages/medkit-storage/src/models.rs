use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct UserAccount {
	pub user_id: Uuid,
	pub email: String,
	pub subscription_tier: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Agency {
	pub agency_id: Uuid,
	pub name: String,
	pub state_code: String,
	pub created_at: OffsetDateTime,
}

/// One row of the append-only query audit log. `query_id` is assigned by
/// the database sequence and is the only canonical identifier; `client_ts`
/// and `device_id` are retained from synced offline entries for duplicate
/// comparison, never for ordering.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct QueryRecordRow {
	pub query_id: i64,
	pub user_id: Uuid,
	pub agency_id: Option<Uuid>,
	pub query_text: String,
	pub response_text: Option<String>,
	pub protocol_refs: Value,
	pub model_used: Option<String>,
	pub response_time_ms: Option<i32>,
	pub client_ts: Option<OffsetDateTime>,
	pub device_id: Option<String>,
	pub created_at: OffsetDateTime,
}

/// Insert payload for a new audit-log row.
#[derive(Debug)]
pub struct NewQueryRecord<'a> {
	pub user_id: Uuid,
	pub agency_id: Option<Uuid>,
	pub query_text: &'a str,
	pub response_text: Option<&'a str>,
	pub protocol_refs: &'a Value,
	pub model_used: Option<&'a str>,
	pub response_time_ms: Option<i32>,
	pub client_ts: Option<OffsetDateTime>,
	pub device_id: Option<&'a str>,
}
