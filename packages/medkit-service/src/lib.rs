pub mod admin;
pub mod history;
pub mod submit;
pub mod sync;
pub mod time_serde;
pub mod trace;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use admin::UsageReport;
pub use error::{Error, Result};
pub use history::{ClearHistoryResponse, DeleteEntryResponse, HistoryItem, HistoryResponse};
pub use submit::{QueryAnswer, SubmitRequest, SubmitResponse};
pub use sync::{LocalQueryEntry, MergedHistoryView, SyncRequest};
pub use trace::{RequestTrace, StageTiming};

use medkit_config::{Config, GenerationProviderConfig, RetrievalProviderConfig};
use medkit_domain::Tier;
use medkit_providers::{Generated, Passage, generation, retrieval};
use medkit_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait RetrievalProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a RetrievalProviderConfig,
		query: &'a str,
		agency_scope: Option<&'a str>,
		limit: u32,
		threshold: f32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Passage>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		query: &'a str,
		passages: &'a [Passage],
		tier: Tier,
		agency_name: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<Generated>>;
}

#[derive(Clone)]
pub struct Providers {
	pub retrieval: Arc<dyn RetrievalProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

struct DefaultProviders;

impl RetrievalProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a RetrievalProviderConfig,
		query: &'a str,
		agency_scope: Option<&'a str>,
		limit: u32,
		threshold: f32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Passage>>> {
		Box::pin(retrieval::search(cfg, query, agency_scope, limit, threshold))
	}
}

impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		query: &'a str,
		passages: &'a [Passage],
		tier: Tier,
		agency_name: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<Generated>> {
		Box::pin(generation::generate(cfg, query, passages, tier, agency_name))
	}
}

impl Providers {
	pub fn new(
		retrieval: Arc<dyn RetrievalProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { retrieval, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { retrieval: provider.clone(), generation: provider }
	}
}

pub struct MedkitService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}

impl MedkitService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}

	/// Resolve the caller's subscription tier from stored user state.
	pub(crate) fn resolve_tier(&self, user: &medkit_storage::models::UserAccount) -> Tier {
		match Tier::parse(&user.subscription_tier) {
			Some(tier) => tier,
			None => {
				tracing::warn!(
					user_id = %user.user_id,
					tier = user.subscription_tier.as_str(),
					"Unknown subscription tier; treating as free."
				);

				Tier::Free
			},
		}
	}
}
