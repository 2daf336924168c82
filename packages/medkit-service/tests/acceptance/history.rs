use std::sync::Arc;

use medkit_service::{Error, Providers, SubmitRequest};

use super::{StubGeneration, StubRetrieval, sample_passage};

fn providers() -> Providers {
	Providers::new(
		Arc::new(StubRetrieval { passages: vec![sample_passage()] }),
		Arc::new(StubGeneration::new("Administer epinephrine 0.3 mg IM.")),
	)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn history_lists_newest_first_and_deletes_are_scoped() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers()).await;
	let user_id = super::seed_user(&service, "pro").await;
	let other_user = super::seed_user(&service, "pro").await;

	for query_text in ["chest pain", "anaphylaxis dosing"] {
		let response = service
			.submit_query(SubmitRequest {
				user_id,
				agency_id: None,
				query_text: query_text.to_string(),
			})
			.await;

		assert!(response.success, "Expected success, got {:?}", response.error);
	}

	let history = service.history(user_id).await.expect("Failed to list history.");

	assert_eq!(history.items.len(), 2);
	assert_eq!(history.items[0].query_text, "anaphylaxis dosing");
	assert_eq!(history.items[0].protocol_refs, vec!["7.2 - Anaphylaxis".to_string()]);

	let target = history.items[0].query_id;

	// Another user cannot delete this entry.
	let foreign = service.delete_entry(other_user, target).await;

	assert!(matches!(foreign, Err(Error::NotFound { .. })));

	let deleted = service.delete_entry(user_id, target).await.expect("Failed to delete entry.");

	assert_eq!(deleted.query_id, target);

	// A second delete of the same id reports the stale reference.
	let stale = service.delete_entry(user_id, target).await;

	assert!(matches!(stale, Err(Error::NotFound { .. })));

	let cleared = service.clear_history(user_id).await.expect("Failed to clear history.");

	assert_eq!(cleared.deleted, 1);
	assert!(service.history(user_id).await.expect("Failed to list history.").items.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
