mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, GenerationProviderConfig, History, Postgres, Providers, Query, Quota,
	RetrievalProviderConfig, Security, Service, Storage, Sync, TierModels,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.query.max_query_chars == 0 {
		return Err(Error::Validation {
			message: "query.max_query_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.query.retrieval_limit == 0 {
		return Err(Error::Validation {
			message: "query.retrieval_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.query.min_similarity.is_finite() || !(0.0..=1.0).contains(&cfg.query.min_similarity) {
		return Err(Error::Validation {
			message: "query.min_similarity must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.quota.free_daily_limit <= 0 {
		return Err(Error::Validation {
			message: "quota.free_daily_limit must be greater than zero.".to_string(),
		});
	}
	if !(-12..=14).contains(&cfg.quota.reference_utc_offset_hours) {
		return Err(Error::Validation {
			message: "quota.reference_utc_offset_hours must be between -12 and 14.".to_string(),
		});
	}
	if cfg.sync.max_batch_entries == 0 {
		return Err(Error::Validation {
			message: "sync.max_batch_entries must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.dedup_window_secs <= 0 {
		return Err(Error::Validation {
			message: "sync.dedup_window_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.near_miss_window_secs < cfg.sync.dedup_window_secs {
		return Err(Error::Validation {
			message: "sync.near_miss_window_secs must not be less than sync.dedup_window_secs."
				.to_string(),
		});
	}
	if cfg.sync.dedup_scan_limit == 0 {
		return Err(Error::Validation {
			message: "sync.dedup_scan_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.history.list_limit == 0 {
		return Err(Error::Validation {
			message: "history.list_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.providers.generation.temperature.is_finite()
		|| !(0.0..=2.0).contains(&cfg.providers.generation.temperature)
	{
		return Err(Error::Validation {
			message: "providers.generation.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.providers.generation.max_output_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.generation.max_output_tokens must be greater than zero."
				.to_string(),
		});
	}

	for (label, key) in [
		("retrieval", &cfg.providers.retrieval.api_key),
		("generation", &cfg.providers.generation.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	let models = &cfg.providers.generation.models;

	for (label, model) in
		[("free", &models.free), ("pro", &models.pro), ("enterprise", &models.enterprise)]
	{
		if model.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.generation.models.{label} must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}
}
