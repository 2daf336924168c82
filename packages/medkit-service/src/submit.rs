use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use medkit_domain::{allows_query, citation_label, reference_day};
use medkit_storage::{models::NewQueryRecord, queries};

use crate::{
	MedkitService, Result,
	trace::{RequestTrace, StageTiming},
};

pub const ERROR_QUOTA_EXCEEDED: &str = "quota_exceeded";
pub const ERROR_NO_MATCHING_PROTOCOLS: &str = "no_matching_protocols";
pub const ERROR_INVALID_REQUEST: &str = "invalid_request";
pub const ERROR_RETRIEVAL_FAILED: &str = "retrieval_failed";
pub const ERROR_GENERATION_FAILED: &str = "generation_failed";
pub const ERROR_INTERNAL: &str = "internal_error";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmitRequest {
	pub user_id: Uuid,
	pub agency_id: Option<Uuid>,
	pub query_text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueryAnswer {
	pub text: String,
	pub protocol_refs: Vec<String>,
	pub model: String,
	pub input_tokens: i64,
	pub output_tokens: i64,
}

/// Always a structured value: refusals (quota, no matching protocols) and
/// infrastructure failures share this shape, distinguished only by the
/// stable `error` code. Callers branch on `success`, never on exceptions.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmitResponse {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub answer: Option<QueryAnswer>,
	pub request_id: Uuid,
	pub response_time_ms: u64,
	pub stages: Vec<StageTiming>,
}

enum PipelineOutcome {
	Answered(QueryAnswer),
	/// A routine business refusal; nothing was committed.
	Refused(&'static str),
	/// A backend failed; the detail is already logged, only the safe code
	/// leaves the server.
	Failed(&'static str),
}

impl MedkitService {
	/// Run the query pipeline: gate, resolve tenant, retrieve, generate,
	/// persist, charge quota. Steps are strictly sequential; quota is
	/// charged only after the audit record is written, so no failure path
	/// consumes the caller's allowance.
	pub async fn submit_query(&self, req: SubmitRequest) -> SubmitResponse {
		let mut trace = RequestTrace::new();
		let outcome = self.run_pipeline(&req, &mut trace).await;

		match outcome {
			Ok(PipelineOutcome::Answered(answer)) => {
				tracing::info!(
					request_id = %trace.request_id,
					user_id = %req.user_id,
					elapsed_ms = trace.total_ms(),
					"Query answered."
				);

				finish(trace, None, Some(answer))
			},
			Ok(PipelineOutcome::Refused(code)) => {
				tracing::info!(
					request_id = %trace.request_id,
					user_id = %req.user_id,
					code,
					"Query refused."
				);

				finish(trace, Some(code), None)
			},
			Ok(PipelineOutcome::Failed(code)) => finish(trace, Some(code), None),
			Err(err) => {
				tracing::error!(
					request_id = %trace.request_id,
					user_id = %req.user_id,
					error = %err,
					"Query pipeline failed."
				);

				finish(trace, Some(ERROR_INTERNAL), None)
			},
		}
	}

	async fn run_pipeline(
		&self,
		req: &SubmitRequest,
		trace: &mut RequestTrace,
	) -> Result<PipelineOutcome> {
		let query_text = req.query_text.trim();

		if query_text.is_empty()
			|| query_text.chars().count() > self.cfg.query.max_query_chars as usize
		{
			return Ok(PipelineOutcome::Refused(ERROR_INVALID_REQUEST));
		}

		let Some(user) = queries::get_user(&self.db, req.user_id).await? else {
			return Ok(PipelineOutcome::Refused(ERROR_INVALID_REQUEST));
		};
		let tier = self.resolve_tier(&user);
		let now = OffsetDateTime::now_utc();
		let day = reference_day(now, self.cfg.quota.reference_utc_offset_hours);
		let used_today = queries::usage_on_day(&self.db, user.user_id, day).await?;

		if !allows_query(tier, used_today, self.cfg.quota.free_daily_limit) {
			return Ok(PipelineOutcome::Refused(ERROR_QUOTA_EXCEEDED));
		}

		trace.mark("gate");

		// Jurisdiction metadata is incomplete in the field; an unknown
		// agency widens to a global search instead of failing.
		let agency_name = match req.agency_id {
			Some(agency_id) => {
				queries::get_agency(&self.db, agency_id).await?.map(|agency| agency.name)
			},
			None => None,
		};
		let passages = match self
			.providers
			.retrieval
			.search(
				&self.cfg.providers.retrieval,
				query_text,
				agency_name.as_deref(),
				self.cfg.query.retrieval_limit,
				self.cfg.query.min_similarity,
			)
			.await
		{
			Ok(passages) => passages,
			Err(err) => {
				tracing::error!(
					request_id = %trace.request_id,
					error = %err,
					"Retrieval backend failed."
				);

				return Ok(PipelineOutcome::Failed(ERROR_RETRIEVAL_FAILED));
			},
		};

		trace.mark("retrieve");

		if passages.is_empty() {
			return Ok(PipelineOutcome::Refused(ERROR_NO_MATCHING_PROTOCOLS));
		}

		let generated = match self
			.providers
			.generation
			.generate(
				&self.cfg.providers.generation,
				query_text,
				&passages,
				tier,
				agency_name.as_deref(),
			)
			.await
		{
			Ok(generated) => generated,
			Err(err) => {
				tracing::error!(
					request_id = %trace.request_id,
					error = %err,
					"Generation backend failed."
				);

				return Ok(PipelineOutcome::Failed(ERROR_GENERATION_FAILED));
			},
		};

		trace.mark("generate");

		// Citations come from what retrieval returned, in retrieval order,
		// independent of which protocols the answer text happens to name.
		let protocol_refs: Vec<String> = passages
			.iter()
			.map(|passage| citation_label(&passage.protocol_number, &passage.protocol_title))
			.collect();
		let refs_json = json!(protocol_refs);

		queries::insert_query_record(
			&self.db,
			&NewQueryRecord {
				user_id: user.user_id,
				agency_id: req.agency_id,
				query_text,
				response_text: Some(&generated.content),
				protocol_refs: &refs_json,
				model_used: Some(&generated.model),
				response_time_ms: Some(trace.total_ms() as i32),
				client_ts: None,
				device_id: None,
			},
		)
		.await?;

		// Charge quota only after the record is durably written.
		queries::increment_usage(&self.db, user.user_id, day).await?;

		trace.mark("persist");

		Ok(PipelineOutcome::Answered(QueryAnswer {
			text: generated.content,
			protocol_refs,
			model: generated.model,
			input_tokens: generated.input_tokens,
			output_tokens: generated.output_tokens,
		}))
	}
}

fn finish(trace: RequestTrace, error: Option<&str>, answer: Option<QueryAnswer>) -> SubmitResponse {
	SubmitResponse {
		success: error.is_none(),
		error: error.map(str::to_string),
		answer,
		request_id: trace.request_id,
		response_time_ms: trace.total_ms(),
		stages: trace.into_stages(),
	}
}
