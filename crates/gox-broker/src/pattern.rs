//! Wildcard topic pattern matching (spec §4.2).

/// Does `pattern` match `topic`? `*` alone matches everything; `ns:*` matches
/// any single colon-delimited segment in that position. Otherwise the
/// pattern and topic must have the same segment count and every non-`*`
/// segment must match literally.
#[must_use]
pub fn matches(pattern: &str, topic: &str) -> bool {
	if pattern == "*" {
		return true;
	}
	let p_segs: Vec<&str> = pattern.split(':').collect();
	let t_segs: Vec<&str> = topic.split(':').collect();
	if p_segs.len() != t_segs.len() {
		return false;
	}
	p_segs.iter().zip(t_segs.iter()).all(|(p, t)| *p == "*" || p == t)
}

#[cfg(test)]
mod tests {
	use super::matches;

	#[test]
	fn plain_star_matches_everything() {
		assert!(matches("*", "a"));
		assert!(matches("*", "a:b:c"));
	}

	#[test]
	fn segment_wildcard_matches_single_segment_only() {
		assert!(matches("a:*", "a:b"));
		assert!(!matches("a:*", "a:b:c"));
		assert!(!matches("a:*", "a"));
	}

	#[test]
	fn literal_segments_must_match() {
		assert!(matches("ns:topic", "ns:topic"));
		assert!(!matches("ns:topic", "ns:other"));
	}

	proptest::proptest! {
		#[test]
		fn same_segment_count_required_for_non_star(
			a in "[a-z]{1,4}",
			b in "[a-z]{1,4}",
			c in "[a-z]{1,4}",
		) {
			let two_seg = format!("{a}:{b}");
			let three_seg = format!("{a}:{b}:{c}");
			proptest::prop_assert!(!matches(&two_seg, &three_seg));
		}
	}
}
