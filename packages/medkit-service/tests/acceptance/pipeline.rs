use std::sync::Arc;

use medkit_service::{Providers, SubmitRequest, submit};

use super::{
	FailingGeneration, FailingRetrieval, StubGeneration, StubRetrieval, sample_passage,
};

fn answer_providers() -> Providers {
	Providers::new(
		Arc::new(StubRetrieval { passages: vec![sample_passage()] }),
		Arc::new(StubGeneration::new("Administer epinephrine 0.3 mg IM.")),
	)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn answered_query_cites_retrieved_passages_and_charges_quota_once() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, answer_providers()).await;
	let user_id = super::seed_user(&service, "free").await;
	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "adult epinephrine dose anaphylaxis".to_string(),
		})
		.await;

	assert!(response.success, "Expected success, got {:?}", response.error);

	let answer = response.answer.expect("Expected an answer.");

	assert_eq!(answer.protocol_refs, vec!["7.2 - Anaphylaxis".to_string()]);
	assert_eq!(answer.model, "compact-1");
	assert_eq!(super::usage_today(&service, user_id).await, 1);
	assert_eq!(super::audit_count(&service, user_id).await, 1);

	let stages: Vec<&str> = response.stages.iter().map(|s| s.stage.as_str()).collect();

	assert_eq!(stages, vec!["gate", "retrieve", "generate", "persist"]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn free_tier_at_limit_is_refused_with_no_side_effects() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let limit = cfg.quota.free_daily_limit as i32;
	let service = super::build_service(cfg, answer_providers()).await;
	let user_id = super::seed_user(&service, "free").await;

	super::set_usage_today(&service, user_id, limit).await;

	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "pediatric seizure dosing".to_string(),
		})
		.await;

	assert!(!response.success);
	assert_eq!(response.error.as_deref(), Some(submit::ERROR_QUOTA_EXCEEDED));
	assert_eq!(super::usage_today(&service, user_id).await, i64::from(limit));
	assert_eq!(super::audit_count(&service, user_id).await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn paid_tier_is_never_gated() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, answer_providers()).await;
	let user_id = super::seed_user(&service, "pro").await;

	super::set_usage_today(&service, user_id, 10_000).await;

	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "stroke scale".to_string(),
		})
		.await;

	assert!(response.success, "Expected success, got {:?}", response.error);
	assert_eq!(response.answer.expect("Expected an answer.").model, "standard-1");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn empty_retrieval_refuses_without_charging_quota() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let generation = Arc::new(StubGeneration::new("unused"));
	let calls = generation.calls.clone();
	let providers =
		Providers::new(Arc::new(StubRetrieval { passages: Vec::new() }), generation);
	let service = super::build_service(cfg, providers).await;
	let user_id = super::seed_user(&service, "free").await;
	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "quilting techniques".to_string(),
		})
		.await;

	assert!(!response.success);
	assert_eq!(response.error.as_deref(), Some(submit::ERROR_NO_MATCHING_PROTOCOLS));
	assert_eq!(super::usage_today(&service, user_id).await, 0);
	assert_eq!(super::audit_count(&service, user_id).await, 0);
	// Generation was never attempted for an empty context.
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn backend_failures_commit_nothing() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let providers = Providers::new(
		Arc::new(FailingRetrieval),
		Arc::new(StubGeneration::new("unused")),
	);
	let service = super::build_service(cfg, providers).await;
	let user_id = super::seed_user(&service, "pro").await;
	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "chest pain".to_string(),
		})
		.await;

	assert!(!response.success);
	assert_eq!(response.error.as_deref(), Some(submit::ERROR_RETRIEVAL_FAILED));
	assert_eq!(super::audit_count(&service, user_id).await, 0);
	assert_eq!(super::usage_today(&service, user_id).await, 0);

	let providers = Providers::new(
		Arc::new(StubRetrieval { passages: vec![sample_passage()] }),
		Arc::new(FailingGeneration),
	);
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, providers).await;
	let response = service
		.submit_query(SubmitRequest {
			user_id,
			agency_id: None,
			query_text: "chest pain".to_string(),
		})
		.await;

	assert!(!response.success);
	assert_eq!(response.error.as_deref(), Some(submit::ERROR_GENERATION_FAILED));
	assert_eq!(super::audit_count(&service, user_id).await, 0);
	assert_eq!(super::usage_today(&service, user_id).await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDKIT_PG_DSN to run."]
async fn unknown_agency_falls_back_to_global_search() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping; set MEDKIT_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg, answer_providers()).await;
	let user_id = super::seed_user(&service, "free").await;
	let response = service
		.submit_query(SubmitRequest {
			user_id,
			// No such agency row exists; the search runs unscoped.
			agency_id: Some(uuid::Uuid::new_v4()),
			query_text: "adult epinephrine dose anaphylaxis".to_string(),
		})
		.await;

	assert!(response.success, "Expected success, got {:?}", response.error);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
