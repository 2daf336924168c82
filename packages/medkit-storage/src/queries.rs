use sqlx::{Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{Agency, NewQueryRecord, QueryRecordRow, UserAccount},
};

const INSERT_QUERY_RECORD: &str = "\
INSERT INTO query_history (
	user_id,
	agency_id,
	query_text,
	response_text,
	protocol_refs,
	model_used,
	response_time_ms,
	client_ts,
	device_id
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING *";

pub async fn get_user(db: &Db, user_id: Uuid) -> Result<Option<UserAccount>> {
	let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE user_id = $1")
		.bind(user_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(user)
}

pub async fn get_agency(db: &Db, agency_id: Uuid) -> Result<Option<Agency>> {
	let agency = sqlx::query_as::<_, Agency>("SELECT * FROM agencies WHERE agency_id = $1")
		.bind(agency_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(agency)
}

pub async fn insert_query_record(db: &Db, record: &NewQueryRecord<'_>) -> Result<QueryRecordRow> {
	let row = sqlx::query_as::<_, QueryRecordRow>(INSERT_QUERY_RECORD)
		.bind(record.user_id)
		.bind(record.agency_id)
		.bind(record.query_text)
		.bind(record.response_text)
		.bind(record.protocol_refs)
		.bind(record.model_used)
		.bind(record.response_time_ms)
		.bind(record.client_ts)
		.bind(record.device_id)
		.fetch_one(&db.pool)
		.await?;

	Ok(row)
}

pub async fn insert_query_record_tx(
	tx: &mut Transaction<'_, Postgres>,
	record: &NewQueryRecord<'_>,
) -> Result<QueryRecordRow> {
	let row = sqlx::query_as::<_, QueryRecordRow>(INSERT_QUERY_RECORD)
		.bind(record.user_id)
		.bind(record.agency_id)
		.bind(record.query_text)
		.bind(record.response_text)
		.bind(record.protocol_refs)
		.bind(record.model_used)
		.bind(record.response_time_ms)
		.bind(record.client_ts)
		.bind(record.device_id)
		.fetch_one(&mut **tx)
		.await?;

	Ok(row)
}

/// The user's history, newest first. Server receipt time orders the
/// canonical history; `query_id` breaks ties between same-instant rows.
pub async fn list_history(db: &Db, user_id: Uuid, limit: i64) -> Result<Vec<QueryRecordRow>> {
	let rows = sqlx::query_as::<_, QueryRecordRow>(
		"\
SELECT *
FROM query_history
WHERE user_id = $1
ORDER BY created_at DESC, query_id DESC
LIMIT $2",
	)
	.bind(user_id)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn delete_entry(db: &Db, user_id: Uuid, query_id: i64) -> Result<u64> {
	let result = sqlx::query("DELETE FROM query_history WHERE user_id = $1 AND query_id = $2")
		.bind(user_id)
		.bind(query_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn clear_history(db: &Db, user_id: Uuid) -> Result<u64> {
	let result = sqlx::query("DELETE FROM query_history WHERE user_id = $1")
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn usage_on_day(db: &Db, user_id: Uuid, day: Date) -> Result<i64> {
	let used: Option<i32> =
		sqlx::query_scalar("SELECT used FROM usage_counters WHERE user_id = $1 AND day = $2")
			.bind(user_id)
			.bind(day)
			.fetch_optional(&db.pool)
			.await?;

	Ok(i64::from(used.unwrap_or(0)))
}

/// Atomic per-(user, day) increment. The upsert keeps the counter correct
/// across concurrent requests and across server instances; callers gate
/// with a read first, accepting the documented soft-limit race.
pub async fn increment_usage(db: &Db, user_id: Uuid, day: Date) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO usage_counters (user_id, day, used)
VALUES ($1, $2, 1)
ON CONFLICT (user_id, day)
DO UPDATE SET used = usage_counters.used + 1",
	)
	.bind(user_id)
	.bind(day)
	.execute(&db.pool)
	.await?;

	Ok(())
}
