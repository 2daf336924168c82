pub mod citation;
pub mod history_merge;
pub mod quota;
pub mod tier;

pub use citation::citation_label;
pub use history_merge::{
	DedupWindows, IncomingEntry, KnownEvent, MergePlan, NearMiss, normalize_query_text,
	parse_client_timestamp, plan_merge,
};
pub use quota::{allows_query, reference_day};
pub use tier::Tier;
