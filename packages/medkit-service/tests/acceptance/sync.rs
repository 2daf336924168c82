use std::sync::Arc;

use medkit_service::{Error, LocalQueryEntry, Providers, SyncRequest};

use super::{StubGeneration, StubRetrieval, sample_passage};

fn providers() -> Providers {
	Providers::new(
		Arc::new(StubRetrieval { passages: vec![sample_passage()] }),
		Arc::new(StubGeneration::new("unused")),
	)
}

fn entry(query_text: &str, timestamp: &str, device_id: &str) -> LocalQueryEntry {
	LocalQueryEntry {
		query_text: query_text.to_string(),
		county_id: None,
		timestamp: timestamp.to_string(),
		device_id: device_id.to_string(),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn replayed_batch_merges_exactly_once() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let batch = vec![
		entry("chest pain", "2025-06-01T12:00:00Z", "device-a"),
		entry("opiate overdose", "2025-06-01T12:10:00Z", "device-a"),
	];
	let first = service
		.sync(SyncRequest { user_id, entries: batch.clone() })
		.await
		.expect("First sync failed.");

	assert_eq!(first.merged, 2);
	assert_eq!(first.server_history.len(), 2);

	let replay = service
		.sync(SyncRequest { user_id, entries: batch })
		.await
		.expect("Replayed sync failed.");

	assert_eq!(replay.merged, 0);
	assert_eq!(replay.server_history.len(), 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn device_batches_commute() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let batch_a = vec![
		entry("chest pain", "2025-06-01T12:00:00Z", "device-a"),
		entry("burn rule of nines", "2025-06-01T13:00:00Z", "device-a"),
	];
	let batch_b = vec![entry("seizure", "2025-06-01T12:30:00Z", "device-b")];

	let mut history_ab: Vec<String> = {
		service
			.sync(SyncRequest { user_id, entries: batch_a.clone() })
			.await
			.expect("Sync A failed.");

		let view = service
			.sync(SyncRequest { user_id, entries: batch_b.clone() })
			.await
			.expect("Sync B failed.");

		view.server_history.into_iter().map(|item| item.query_text).collect()
	};

	service.clear_history(user_id).await.expect("Failed to clear history.");

	let mut history_ba: Vec<String> = {
		service
			.sync(SyncRequest { user_id, entries: batch_b })
			.await
			.expect("Sync B failed.");

		let view = service
			.sync(SyncRequest { user_id, entries: batch_a })
			.await
			.expect("Sync A failed.");

		view.server_history.into_iter().map(|item| item.query_text).collect()
	};

	history_ab.sort();
	history_ba.sort();

	assert_eq!(history_ab, history_ba);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn same_event_from_two_devices_collapses() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let from_device_a = vec![entry("chest pain", "2025-06-01T12:00:00Z", "device-a")];
	// Device B observed the same logical event with a two-second clock
	// skew and different casing.
	let from_device_b = vec![entry("Chest Pain", "2025-06-01T12:00:02Z", "device-b")];

	let first = service
		.sync(SyncRequest { user_id, entries: from_device_a })
		.await
		.expect("Device A sync failed.");

	assert_eq!(first.merged, 1);

	let second = service
		.sync(SyncRequest { user_id, entries: from_device_b })
		.await
		.expect("Device B sync failed.");

	assert_eq!(second.merged, 0);
	assert_eq!(second.server_history.len(), 1);
	assert_eq!(second.server_history[0].query_text, "chest pain");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn malformed_timestamp_drops_only_that_entry() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "enterprise").await;
	let batch = vec![
		entry("chest pain", "2025-06-01T12:00:00Z", "device-a"),
		entry("seizure", "not a timestamp", "device-a"),
		entry("stroke scale", "2025-06-01T12:20:00Z", "device-a"),
	];
	let view = service
		.sync(SyncRequest { user_id, entries: batch })
		.await
		.expect("Sync failed.");

	assert_eq!(view.merged, 2);

	let texts: Vec<&str> =
		view.server_history.iter().map(|item| item.query_text.as_str()).collect();

	assert!(texts.contains(&"chest pain"));
	assert!(texts.contains(&"stroke scale"));
	assert!(!texts.contains(&"seizure"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn free_tier_sync_is_rejected_before_touching_data() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "free").await;
	let result = service
		.sync(SyncRequest {
			user_id,
			entries: vec![entry("chest pain", "2025-06-01T12:00:00Z", "device-a")],
		})
		.await;

	assert!(matches!(result, Err(Error::NotEntitled { .. })));
	assert_eq!(super::audit_count(&service, user_id).await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn empty_batch_returns_current_history() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let view = service
		.sync(SyncRequest { user_id, entries: Vec::new() })
		.await
		.expect("Empty sync failed.");

	assert_eq!(view.merged, 0);
	assert!(view.server_history.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn oversized_batch_is_an_invalid_request() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let limit = cfg.sync.max_batch_entries as usize;
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let entries: Vec<_> = (0..=limit)
		.map(|i| entry(&format!("query {i}"), "2025-06-01T12:00:00Z", "device-a"))
		.collect();
	let result = service.sync(SyncRequest { user_id, entries }).await;

	assert!(matches!(result, Err(Error::InvalidRequest { .. })));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
