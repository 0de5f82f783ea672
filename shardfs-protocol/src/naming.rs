//! Shard filename conventions.
//!
//! A shard of logical file `name` with 1-indexed position `i` is stored
//! as `name.part<i>` in a slave's flat storage root. The master derives
//! client-visible listings by stripping that suffix back off.

/// Builds the physical shard filename for a logical name and index.
#[must_use]
pub fn part_file_name(logical: &str, index: u32) -> String {
    format!("{logical}.part{index}")
}

/// Strips a trailing `.part<digits>` suffix, recovering the logical
/// name. Returns `None` when the name carries no such suffix.
#[must_use]
pub fn logical_name(raw: &str) -> Option<&str> {
    let at = raw.rfind(".part")?;
    let digits = &raw[at + ".part".len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(&raw[..at])
}

/// Whether a raw filename looks like a stored shard.
#[must_use]
pub fn is_part_name(raw: &str) -> bool {
    logical_name(raw).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_part_names() {
        assert_eq!(part_file_name("film.mp4", 1), "film.mp4.part1");
        assert_eq!(part_file_name("a", 12), "a.part12");
    }

    #[test]
    fn strips_part_suffix() {
        assert_eq!(logical_name("film.mp4.part3"), Some("film.mp4"));
        assert_eq!(logical_name("a.part12"), Some("a"));
    }

    #[test]
    fn non_shard_names_are_rejected() {
        assert_eq!(logical_name("film.mp4"), None);
        assert_eq!(logical_name("notes.partial"), None);
        assert_eq!(logical_name("x.part"), None);
        assert_eq!(logical_name("x.part1b"), None);
    }

    #[test]
    fn innermost_suffix_wins_on_nested_names() {
        // A logical name may itself end in `.partN`; only the outermost
        // suffix belongs to the store.
        assert_eq!(logical_name("x.part1.part2"), Some("x.part1"));
    }
}
