use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

/// Canonical form of a query text for duplicate comparison: trimmed,
/// case-folded, inner whitespace collapsed to single spaces. Client apps
/// resubmit the same question with incidental casing and spacing changes;
/// those must compare equal.
pub fn normalize_query_text(raw: &str) -> String {
	raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Client timestamps arrive as RFC 3339 strings from untrusted device
/// clocks. An unparseable timestamp invalidates the entry, never the batch.
pub fn parse_client_timestamp(raw: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

#[derive(Clone, Copy, Debug)]
pub struct DedupWindows {
	/// Matching text within this delta is the same real-world event.
	pub duplicate: Duration,
	/// Matching text within this (wider) delta is logged as a near miss.
	pub near_miss: Duration,
}

impl DedupWindows {
	pub fn from_secs(duplicate_secs: i64, near_miss_secs: i64) -> Self {
		Self {
			duplicate: Duration::seconds(duplicate_secs),
			near_miss: Duration::seconds(near_miss_secs.max(duplicate_secs)),
		}
	}
}

/// One batch entry that survived timestamp parsing. `index` points back
/// into the caller's original batch so admitted entries can be recovered.
#[derive(Clone, Debug)]
pub struct IncomingEntry {
	pub index: usize,
	pub normalized_text: String,
	pub timestamp: OffsetDateTime,
}

/// An event the server already knows about: an existing history record,
/// compared by its client-reported event time when one was retained and by
/// its server receipt time otherwise.
#[derive(Clone, Debug)]
pub struct KnownEvent {
	pub normalized_text: String,
	pub event_ts: OffsetDateTime,
}

#[derive(Debug)]
pub struct NearMiss {
	pub index: usize,
	pub delta_secs: i64,
}

#[derive(Debug, Default)]
pub struct MergePlan {
	/// Indices of entries to admit, in batch order.
	pub admitted: Vec<usize>,
	/// Indices discarded as duplicates of server state or earlier batch
	/// entries. Silent by design: retried batches must be idempotent.
	pub duplicates: Vec<usize>,
	/// Admitted entries whose text matched an existing event just outside
	/// the duplicate window. Logged upstream for window tuning.
	pub near_misses: Vec<NearMiss>,
}

/// Decide which batch entries are new events. Comparison is pure set logic
/// over `(normalized text, event time)`: an entry duplicates a known event
/// or an earlier admitted entry when the texts match and the clocks agree
/// to within the duplicate window. Entries are processed in batch order,
/// and each admitted entry joins the comparison set, so a batch that
/// queued the same event twice collapses to one admission.
pub fn plan_merge(
	known: &[KnownEvent],
	batch: &[IncomingEntry],
	windows: DedupWindows,
) -> MergePlan {
	let mut plan = MergePlan::default();
	let mut seen: Vec<KnownEvent> = known.to_vec();

	for entry in batch {
		let mut duplicate = false;
		let mut closest_near_miss: Option<i64> = None;

		for event in &seen {
			if event.normalized_text != entry.normalized_text {
				continue;
			}

			let delta = (entry.timestamp - event.event_ts).abs();

			if delta <= windows.duplicate {
				duplicate = true;

				break;
			}
			if delta <= windows.near_miss {
				let secs = delta.whole_seconds();

				if closest_near_miss.map(|best| secs < best).unwrap_or(true) {
					closest_near_miss = Some(secs);
				}
			}
		}

		if duplicate {
			plan.duplicates.push(entry.index);

			continue;
		}

		if let Some(delta_secs) = closest_near_miss {
			plan.near_misses.push(NearMiss { index: entry.index, delta_secs });
		}

		plan.admitted.push(entry.index);
		seen.push(KnownEvent {
			normalized_text: entry.normalized_text.clone(),
			event_ts: entry.timestamp,
		});
	}

	plan
}
