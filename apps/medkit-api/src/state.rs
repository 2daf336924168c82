use std::sync::Arc;

use medkit_service::MedkitService;
use medkit_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MedkitService>,
}
impl AppState {
	pub async fn new(config: medkit_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = MedkitService::new(config, db);

		Ok(Self { service: Arc::new(service) })
	}
}
