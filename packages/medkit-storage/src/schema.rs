/// Idempotent DDL for the medkit core tables. Statements are split on `;`
/// by the bootstrap, so none of them may embed a semicolon in a literal.
pub fn schema_sql() -> &'static str {
	"\
CREATE TABLE IF NOT EXISTS users (
	user_id UUID PRIMARY KEY,
	email TEXT NOT NULL UNIQUE,
	subscription_tier TEXT NOT NULL DEFAULT 'free',
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS agencies (
	agency_id UUID PRIMARY KEY,
	name TEXT NOT NULL,
	state_code TEXT NOT NULL,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS query_history (
	query_id BIGSERIAL PRIMARY KEY,
	user_id UUID NOT NULL,
	agency_id UUID,
	query_text TEXT NOT NULL,
	response_text TEXT,
	protocol_refs JSONB NOT NULL DEFAULT '[]'::jsonb,
	model_used TEXT,
	response_time_ms INT,
	client_ts TIMESTAMPTZ,
	device_id TEXT,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS query_history_user_recency_idx
	ON query_history (user_id, created_at DESC, query_id DESC);

CREATE TABLE IF NOT EXISTS usage_counters (
	user_id UUID NOT NULL,
	day DATE NOT NULL,
	used INT NOT NULL DEFAULT 0,
	PRIMARY KEY (user_id, day)
);
"
}
