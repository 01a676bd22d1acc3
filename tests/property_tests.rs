//! Property-based tests using proptest

use proptest::prelude::*;
use stellar_logging::collectors::file::escape_text;
use stellar_logging::core::{interpolate, SeverityGate};
use stellar_logging::LogLevel;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL_LEVELS.to_vec())
}

fn message_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::MESSAGE_LEVELS.to_vec())
}

// Severity gate properties
proptest! {
    #[test]
    fn test_gate_enables_message_ranks_below_threshold(
        threshold in 0..i32::MAX,
        level in any_level()
    ) {
        let gate = SeverityGate::with_threshold(threshold).unwrap();
        prop_assert_eq!(gate.enabled(level), !level.is_sentinel() && level.rank() < threshold);
    }

    #[test]
    fn test_negative_threshold_rejected(threshold in i32::MIN..0) {
        prop_assert!(SeverityGate::with_threshold(threshold).is_err());

        let gate = SeverityGate::new();
        prop_assert!(gate.set(threshold).is_err());
        prop_assert_eq!(gate.threshold(), i32::MAX);
    }

    #[test]
    fn test_set_level_enables_level_and_more_severe(
        configured in message_level(),
        level in message_level()
    ) {
        let gate = SeverityGate::new();
        gate.set_level(configured);
        prop_assert_eq!(gate.enabled(level), level <= configured);
    }

    #[test]
    fn test_off_never_enabled(threshold in 0..i32::MAX) {
        let gate = SeverityGate::with_threshold(threshold).unwrap();
        prop_assert!(!gate.enabled(LogLevel::Off));
    }
}

// File text escaping properties
proptest! {
    #[test]
    fn test_escaped_text_has_no_quotes_or_newlines_inside(text in "(?s).*") {
        let escaped = escape_text(&text);
        prop_assert!(!escaped.contains('"'));
        prop_assert!(!escaped.contains('\n'));
        if text.is_empty() || !text.chars().all(|c| c == '\n') {
            prop_assert!(escaped.starts_with('\''));
            prop_assert!(escaped.ends_with('\''));
        } else {
            prop_assert!(escaped.is_empty());
        }
    }

    #[test]
    fn test_escaped_text_wraps_each_line(
        lines in prop::collection::vec("[^\n'\"]*", 0..5),
        last in "[^\n'\"]+"
    ) {
        let mut lines = lines;
        lines.push(last);
        let text = lines.join("\n");
        let expected: String = lines.iter().map(|line| format!("'{}'", line)).collect();
        prop_assert_eq!(escape_text(&text), expected);
    }

    #[test]
    fn test_trailing_newlines_are_dropped(
        lines in prop::collection::vec("[^\n'\"]*", 1..5),
        last in "[^\n'\"]+",
        newlines in 1..5usize
    ) {
        let mut lines = lines;
        lines.push(last);
        let text = lines.join("\n");
        let padded = format!("{}{}", text, "\n".repeat(newlines));
        prop_assert_eq!(escape_text(&padded), escape_text(&text));
    }

    #[test]
    fn test_quotes_become_backticks(text in "[a-z\"' ]*") {
        let escaped = escape_text(&text);
        let inner = &escaped[1..escaped.len() - 1];
        prop_assert_eq!(inner, text.replace(['"', '\''], "`"));
    }
}

// Interpolation properties
proptest! {
    #[test]
    fn test_text_without_braces_is_unchanged(text in "[^{}]*", arg in ".*") {
        prop_assert_eq!(interpolate(&text, &[arg]).unwrap(), text);
    }

    #[test]
    fn test_single_placeholder_substituted(
        before in "[^{}]*",
        after in "[^{}]*",
        arg in "[^{}]*"
    ) {
        let pattern = format!("{}{{0}}{}", before, after);
        let expected = format!("{}{}{}", before, arg, after);
        prop_assert_eq!(interpolate(&pattern, &[arg]).unwrap(), expected);
    }

    #[test]
    fn test_interpolate_never_panics(pattern in ".*", args in prop::collection::vec(".*", 0..3)) {
        let _ = interpolate(&pattern, &args);
    }
}
