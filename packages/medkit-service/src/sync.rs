use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use medkit_domain::{
	DedupWindows, IncomingEntry, KnownEvent, normalize_query_text, parse_client_timestamp,
	plan_merge,
};
use medkit_storage::{models::NewQueryRecord, queries};

use crate::{Error, HistoryItem, MedkitService, Result};

/// A query the client observed, possibly while offline. The timestamp is
/// the device's own clock and is trusted only for duplicate comparison.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LocalQueryEntry {
	pub query_text: String,
	pub county_id: Option<Uuid>,
	pub timestamp: String,
	pub device_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SyncRequest {
	pub user_id: Uuid,
	pub entries: Vec<LocalQueryEntry>,
}

/// Post-merge view the client replaces its local cache with.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MergedHistoryView {
	pub merged: u32,
	pub server_history: Vec<HistoryItem>,
}

impl MedkitService {
	/// Merge a device's locally collected history into the server's
	/// authoritative history. Idempotent: replaying a batch admits nothing
	/// new. Additive: sync never deletes. Paid tiers only.
	pub async fn sync(&self, req: SyncRequest) -> Result<MergedHistoryView> {
		let Some(user) = queries::get_user(&self.db, req.user_id).await? else {
			return Err(Error::InvalidRequest { message: "User not found.".to_string() });
		};
		let tier = self.resolve_tier(&user);

		if !tier.can_sync() {
			return Err(Error::NotEntitled {
				message: "History sync requires a paid plan.".to_string(),
			});
		}
		if req.entries.len() > self.cfg.sync.max_batch_entries as usize {
			return Err(Error::InvalidRequest {
				message: format!(
					"Sync batch exceeds {} entries.",
					self.cfg.sync.max_batch_entries
				),
			});
		}

		// One malformed entry must not block the rest of the batch.
		let mut incoming = Vec::with_capacity(req.entries.len());

		for (index, entry) in req.entries.iter().enumerate() {
			let normalized_text = normalize_query_text(&entry.query_text);

			if normalized_text.is_empty() {
				tracing::warn!(
					user_id = %req.user_id,
					device_id = entry.device_id.as_str(),
					index,
					"Dropping sync entry with empty query text."
				);

				continue;
			}

			let Some(timestamp) = parse_client_timestamp(&entry.timestamp) else {
				tracing::warn!(
					user_id = %req.user_id,
					device_id = entry.device_id.as_str(),
					index,
					raw = entry.timestamp.as_str(),
					"Dropping sync entry with unparseable timestamp."
				);

				continue;
			};

			incoming.push(IncomingEntry { index, normalized_text, timestamp });
		}

		// Dedup against current server state. Records admitted by earlier
		// syncs compare by their retained client timestamp, live queries by
		// receipt time.
		let recent = queries::list_history(
			&self.db,
			req.user_id,
			i64::from(self.cfg.sync.dedup_scan_limit),
		)
		.await?;
		let known: Vec<KnownEvent> = recent
			.iter()
			.map(|row| KnownEvent {
				normalized_text: normalize_query_text(&row.query_text),
				event_ts: row.client_ts.unwrap_or(row.created_at),
			})
			.collect();
		let windows = DedupWindows::from_secs(
			self.cfg.sync.dedup_window_secs,
			self.cfg.sync.near_miss_window_secs,
		);
		let plan = plan_merge(&known, &incoming, windows);

		for near_miss in &plan.near_misses {
			let entry = &req.entries[near_miss.index];

			tracing::info!(
				user_id = %req.user_id,
				device_id = entry.device_id.as_str(),
				delta_secs = near_miss.delta_secs,
				"Admitted history entry just outside the dedup window."
			);
		}

		let empty_refs = json!([]);
		let mut tx = self.db.pool.begin().await?;

		for &index in &plan.admitted {
			let entry = &req.entries[index];
			let timestamp = incoming
				.iter()
				.find(|candidate| candidate.index == index)
				.map(|candidate| candidate.timestamp);

			queries::insert_query_record_tx(
				&mut tx,
				&NewQueryRecord {
					user_id: req.user_id,
					agency_id: entry.county_id,
					query_text: entry.query_text.trim(),
					response_text: None,
					protocol_refs: &empty_refs,
					model_used: None,
					response_time_ms: None,
					client_ts: timestamp,
					device_id: Some(entry.device_id.as_str()),
				},
			)
			.await?;
		}

		tx.commit().await?;

		let merged = plan.admitted.len() as u32;

		if !plan.duplicates.is_empty() {
			tracing::debug!(
				user_id = %req.user_id,
				duplicates = plan.duplicates.len(),
				"Discarded duplicate sync entries."
			);
		}

		tracing::info!(
			user_id = %req.user_id,
			received = req.entries.len(),
			merged,
			"History sync merged."
		);

		let server_history = self.load_history(req.user_id).await?;

		Ok(MergedHistoryView { merged, server_history })
	}
}
