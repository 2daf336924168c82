use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use medkit_storage::{models::QueryRecordRow, queries};

use crate::{Error, MedkitService, Result};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HistoryItem {
	pub query_id: i64,
	pub query_text: String,
	pub response_text: Option<String>,
	pub protocol_refs: Vec<String>,
	pub model_used: Option<String>,
	pub response_time_ms: Option<i32>,
	#[serde(with = "crate::time_serde")]
	pub created_at: time::OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HistoryResponse {
	pub items: Vec<HistoryItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClearHistoryResponse {
	pub deleted: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeleteEntryResponse {
	pub query_id: i64,
}

impl HistoryItem {
	fn from_row(row: QueryRecordRow) -> Self {
		Self {
			query_id: row.query_id,
			query_text: row.query_text,
			response_text: row.response_text,
			protocol_refs: refs_from_value(&row.protocol_refs),
			model_used: row.model_used,
			response_time_ms: row.response_time_ms,
			created_at: row.created_at,
		}
	}
}

fn refs_from_value(value: &Value) -> Vec<String> {
	value
		.as_array()
		.map(|refs| {
			refs.iter().filter_map(|item| item.as_str()).map(str::to_string).collect()
		})
		.unwrap_or_default()
}

impl MedkitService {
	/// The user's history, newest first, bounded by `history.list_limit`.
	pub async fn history(&self, user_id: Uuid) -> Result<HistoryResponse> {
		let items = self.load_history(user_id).await?;

		Ok(HistoryResponse { items })
	}

	pub async fn clear_history(&self, user_id: Uuid) -> Result<ClearHistoryResponse> {
		let deleted = queries::clear_history(&self.db, user_id).await?;

		tracing::info!(user_id = %user_id, deleted, "History cleared.");

		Ok(ClearHistoryResponse { deleted })
	}

	/// Delete one of the user's own entries. A nonexistent or foreign id is
	/// a not-found error, so clients can detect stale local references.
	pub async fn delete_entry(&self, user_id: Uuid, query_id: i64) -> Result<DeleteEntryResponse> {
		let deleted = queries::delete_entry(&self.db, user_id, query_id).await?;

		if deleted == 0 {
			return Err(Error::NotFound { message: "History entry not found.".to_string() });
		}

		Ok(DeleteEntryResponse { query_id })
	}

	pub(crate) async fn load_history(&self, user_id: Uuid) -> Result<Vec<HistoryItem>> {
		let rows = queries::list_history(
			&self.db,
			user_id,
			i64::from(self.cfg.history.list_limit),
		)
		.await?;

		Ok(rows.into_iter().map(HistoryItem::from_row).collect())
	}
}
