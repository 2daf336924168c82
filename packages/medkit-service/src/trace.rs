use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StageTiming {
	pub stage: String,
	pub elapsed_ms: u64,
}

/// Correlates one request across logs and its response, and times the
/// pipeline stages. `total_ms` is measured from construction, so callers
/// read it just before returning.
#[derive(Debug)]
pub struct RequestTrace {
	pub request_id: Uuid,
	started: Instant,
	last_mark: Instant,
	stages: Vec<StageTiming>,
}

impl RequestTrace {
	pub fn new() -> Self {
		let now = Instant::now();

		Self { request_id: Uuid::new_v4(), started: now, last_mark: now, stages: Vec::new() }
	}

	/// Close the current stage under `stage` and start timing the next one.
	pub fn mark(&mut self, stage: &str) {
		let now = Instant::now();
		let elapsed_ms = now.duration_since(self.last_mark).as_millis() as u64;

		self.stages.push(StageTiming { stage: stage.to_string(), elapsed_ms });
		self.last_mark = now;
	}

	pub fn total_ms(&self) -> u64 {
		self.started.elapsed().as_millis() as u64
	}

	pub fn stages(&self) -> &[StageTiming] {
		&self.stages
	}

	pub fn into_stages(self) -> Vec<StageTiming> {
		self.stages
	}
}

impl Default for RequestTrace {
	fn default() -> Self {
		Self::new()
	}
}
