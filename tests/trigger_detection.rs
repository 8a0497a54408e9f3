use proptest::prelude::*;
use relaybot::exec::TriggerScanner;

const TRIGGER: &str = "Username for";

// Feed `data` to a scanner cut at the given (sorted, deduplicated) points.
fn scan_in_pieces(data: &[u8], mut cuts: Vec<usize>) -> bool {
    cuts.retain(|&c| c > 0 && c < data.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut scanner = TriggerScanner::new(TRIGGER);
    let mut start = 0;
    let mut found = false;
    for cut in cuts.into_iter().chain(std::iter::once(data.len())) {
        found |= scanner.feed(&data[start..cut]);
        start = cut;
    }
    found
}

proptest! {
    #[test]
    fn detection_does_not_depend_on_chunking(
        prefix in "[a-z :'/\n]{0,40}",
        suffix in "[a-z :'/\n]{0,40}",
        with_trigger in any::<bool>(),
        cuts in proptest::collection::vec(0usize..120, 0..10),
    ) {
        let text = if with_trigger {
            format!("{prefix}{TRIGGER}{suffix}")
        } else {
            format!("{prefix}{suffix}")
        };
        let expected = text.contains(TRIGGER);

        prop_assert_eq!(scan_in_pieces(text.as_bytes(), cuts), expected);
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer(text in "[A-Za-z ]{0,60}") {
        let data = text.as_bytes();
        let cuts: Vec<usize> = (1..data.len()).collect();
        prop_assert_eq!(scan_in_pieces(data, cuts), text.contains(TRIGGER));
    }
}
