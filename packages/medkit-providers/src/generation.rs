use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use medkit_domain::Tier;

use crate::retrieval::Passage;

/// A generated answer together with the model that produced it and its
/// token accounting.
#[derive(Clone, Debug)]
pub struct Generated {
	pub content: String,
	pub model: String,
	pub input_tokens: i64,
	pub output_tokens: i64,
}

/// Ask the generation backend to answer `query` from the retrieved
/// passages. The subscription tier selects the model; the caller passes the
/// tier through without branching on it.
pub async fn generate(
	cfg: &medkit_config::GenerationProviderConfig,
	query: &str,
	passages: &[Passage],
	tier: Tier,
	agency_name: Option<&str>,
) -> Result<Generated> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let context: Vec<Value> = passages
		.iter()
		.map(|passage| {
			serde_json::json!({
				"protocol_number": passage.protocol_number,
				"protocol_title": passage.protocol_title,
				"section": passage.section,
				"content": passage.content,
			})
		})
		.collect();
	let body = serde_json::json!({
		"model": model_for_tier(&cfg.models, tier),
		"query": query,
		"agency": agency_name,
		"passages": context,
		"temperature": cfg.temperature,
		"max_output_tokens": cfg.max_output_tokens,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generation_response(json)
}

pub fn model_for_tier(models: &medkit_config::TierModels, tier: Tier) -> &str {
	match tier {
		Tier::Free => &models.free,
		Tier::Pro => &models.pro,
		Tier::Enterprise => &models.enterprise,
	}
}

fn parse_generation_response(json: Value) -> Result<Generated> {
	let content = json
		.get("content")
		.and_then(|v| v.as_str())
		.ok_or_else(|| eyre::eyre!("Generation response is missing content."))?
		.to_string();
	let model = json
		.get("model")
		.and_then(|v| v.as_str())
		.ok_or_else(|| eyre::eyre!("Generation response is missing model."))?
		.to_string();
	let usage = json.get("usage");
	let input_tokens =
		usage.and_then(|u| u.get("input_tokens")).and_then(|v| v.as_i64()).unwrap_or(0);
	let output_tokens =
		usage.and_then(|u| u.get("output_tokens")).and_then(|v| v.as_i64()).unwrap_or(0);

	Ok(Generated { content, model, input_tokens, output_tokens })
}
