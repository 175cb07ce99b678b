//! Property-based tests for the label, paging and subtitle helpers.

use order_desk::services::{
    labels::{batch_ranges, display_width, format_postal},
    orders::next_offset,
    sub_words::apply_substitutions,
    subtitles::{character_count, parse_srt, to_srt, SubtitleEntry, SEGMENT_SEPARATOR},
};
use proptest::prelude::*;

fn timestamp_strategy() -> impl Strategy<Value = String> {
    (0u32..100, 0u32..60, 0u32..60, 0u32..1000)
        .prop_map(|(h, m, s, ms)| format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms))
}

// Lines are never blank, so an entry never contains the separator
fn cue_text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Zあ-ん0-9!?]{1,12}( [a-zA-Z]{1,6})?", 1..4)
        .prop_map(|lines| lines.join("\n"))
}

fn entries_strategy() -> impl Strategy<Value = Vec<SubtitleEntry>> {
    prop::collection::vec(
        (timestamp_strategy(), timestamp_strategy(), cue_text_strategy()),
        0..30,
    )
    .prop_map(|cues| {
        cues.into_iter()
            .enumerate()
            .map(|(i, (start, end, text))| SubtitleEntry {
                index: i as u32 + 1,
                start,
                end,
                text,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn batches_cover_every_row_once(total in 0usize..2_000, size in 1usize..200) {
        let ranges = batch_ranges(total, size);
        let mut expected_start = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, expected_start);
            prop_assert!(!range.is_empty());
            prop_assert!(range.len() <= size);
            expected_start = range.end;
        }
        prop_assert_eq!(expected_start, total);
        prop_assert_eq!(ranges.len(), (total + size - 1) / size);
    }

    #[test]
    fn zero_prefixed_postal_codes_are_hyphenated(digits in "[0-9]{7}") {
        let formatted = format_postal(&format!("0{}", digits));
        prop_assert_eq!(formatted, format!("{}-{}", &digits[..3], &digits[3..]));
    }

    #[test]
    fn other_postal_values_pass_through(value in "[1-9][0-9-]{0,9}") {
        prop_assert_eq!(format_postal(&value), value);
    }

    #[test]
    fn wide_characters_count_double(text in "\\PC{0,40}") {
        let ascii = text.chars().filter(char::is_ascii).count();
        let total = text.chars().count();
        prop_assert_eq!(display_width(&text), ascii + 2 * (total - ascii));
    }

    #[test]
    fn empty_dictionary_changes_nothing(text in "\\PC{0,80}") {
        prop_assert_eq!(apply_substitutions(&text, &[]), text);
    }

    #[test]
    fn next_offset_stays_inside_total(offset in 0u32..10_000, limit in 1u32..200, total in 0u64..20_000) {
        match next_offset(offset, limit, total) {
            Some(next) => {
                prop_assert!(next < total);
                prop_assert_eq!(next, u64::from(offset) + u64::from(limit));
            }
            None => prop_assert!(u64::from(offset) + u64::from(limit) >= total),
        }
    }

    #[test]
    fn rendered_subtitles_parse_back(entries in entries_strategy()) {
        let parsed = parse_srt(&to_srt(&entries)).unwrap();
        prop_assert_eq!(parsed, entries);
    }

    #[test]
    fn character_count_matches_joined_request(entries in entries_strategy()) {
        let joined = entries
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);
        prop_assert_eq!(character_count(&entries), joined.chars().count());
    }
}
