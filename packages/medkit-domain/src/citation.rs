/// Human-readable citation for a retrieved protocol passage, e.g.
/// `"7.2 - Anaphylaxis"`. Citations are derived from what retrieval
/// returned, in retrieval order, so the reference list stays complete even
/// when the generated answer text does not name every protocol it drew on.
pub fn citation_label(protocol_number: &str, protocol_title: &str) -> String {
	let number = protocol_number.trim();
	let title = protocol_title.trim();

	match (number.is_empty(), title.is_empty()) {
		(false, false) => format!("{number} - {title}"),
		(false, true) => number.to_string(),
		(true, false) => title.to_string(),
		(true, true) => "Unnumbered protocol".to_string(),
	}
}
