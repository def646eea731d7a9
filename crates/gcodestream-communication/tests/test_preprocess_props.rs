use gcodestream_communication::{group_thousands, preprocess_line, ProgressMeter};
use proptest::prelude::*;

fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

proptest! {
    #[test]
    fn prop_payload_has_no_comment_or_trailing_space(line in proptest::collection::vec(any::<u8>(), 0..200)) {
        let payload = preprocess_line(&line);
        prop_assert!(!payload.contains(&b';'));
        if let Some(&last) = payload.last() {
            prop_assert!(!is_c_space(last));
        }
        // the payload is always a prefix of the source line
        prop_assert!(line.starts_with(payload));
    }

    #[test]
    fn prop_preprocess_is_idempotent(line in "[ -~\t]{0,80}") {
        let once = preprocess_line(line.as_bytes());
        prop_assert_eq!(preprocess_line(once), once);
    }

    #[test]
    fn prop_percent_never_decreases(total in 0u64..10_000_000, a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let meter = ProgressMeter::new(total);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(meter.percent(lo) <= meter.percent(hi));
        // at end of input the percent is below 100
        prop_assert!(meter.percent(total) < 100);
    }

    #[test]
    fn prop_grouping_preserves_digits(n in any::<u64>()) {
        let grouped = group_thousands(n, Some(','));
        prop_assert_eq!(grouped.replace(',', ""), n.to_string());
        prop_assert!(grouped.split(',').skip(1).all(|group| group.len() == 3));
    }
}
