use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A protocol excerpt returned by the retrieval backend, ranked by
/// similarity to the query.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Passage {
	pub id: String,
	pub protocol_number: String,
	pub protocol_title: String,
	pub section: String,
	pub content: String,
	pub similarity: f32,
}

/// Search the protocol corpus. `agency_scope` of `None` runs an unscoped
/// (global) search; jurisdiction metadata is incomplete, so an unknown
/// agency widens the search rather than failing it. An empty result is a
/// valid response.
pub async fn search(
	cfg: &medkit_config::RetrievalProviderConfig,
	query: &str,
	agency_scope: Option<&str>,
	limit: u32,
	threshold: f32,
) -> Result<Vec<Passage>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": query,
		"agency": agency_scope,
		"limit": limit,
		"threshold": threshold,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json, threshold)
}

fn parse_search_response(json: Value, threshold: f32) -> Result<Vec<Passage>> {
	let results = json
		.get("results")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Search response is missing results array."))?;
	let mut passages = Vec::with_capacity(results.len());

	for item in results {
		let similarity = item
			.get("similarity")
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Search result missing numeric similarity."))?
			as f32;

		// The backend applies the threshold itself; re-check here so a
		// lenient backend cannot push sub-threshold passages into
		// generation context.
		if similarity < threshold {
			continue;
		}

		passages.push(Passage {
			id: string_field(item, "id")?,
			protocol_number: string_field(item, "protocol_number")?,
			protocol_title: string_field(item, "protocol_title")?,
			section: item
				.get("section")
				.and_then(|v| v.as_str())
				.unwrap_or_default()
				.to_string(),
			content: string_field(item, "content")?,
			similarity,
		});
	}

	passages.sort_by(|a, b| {
		b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
	});

	Ok(passages)
}

fn string_field(item: &Value, field: &str) -> Result<String> {
	item.get(field)
		.and_then(|v| v.as_str())
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Search result missing {field}."))
}
