use proptest::prelude::*;
use relaybot::input::{is_valid_input, RequestValue, MAX_INPUT_LEN};

#[test]
fn typical_query_ids() {
    assert!(is_valid_input("test-id_42"));
    assert!(is_valid_input("AbC-123_xyz"));
    assert!(!is_valid_input("query_id=abc&user=1"));
    assert!(!is_valid_input("abc\n"));
    assert!(!is_valid_input("\u{00e9}t\u{00e9}"));
}

#[test]
fn length_boundaries() {
    assert!(!is_valid_input(""));
    assert!(is_valid_input("a"));
    assert!(is_valid_input(&"a".repeat(MAX_INPUT_LEN)));
    assert!(!is_valid_input(&"a".repeat(MAX_INPUT_LEN + 1)));
}

#[test]
fn request_value_keeps_the_text_verbatim() {
    let value = RequestValue::parse("test-id_42").unwrap();
    assert_eq!(value.as_str(), "test-id_42");
    assert_eq!(value.to_string(), "test-id_42");
    assert!(RequestValue::parse(" test-id_42").is_none());
}

proptest! {
    #[test]
    fn allowed_alphabet_within_length_is_accepted(s in "[A-Za-z0-9_-]{1,100}") {
        prop_assert!(is_valid_input(&s));
        prop_assert_eq!(RequestValue::parse(&s).map(|v| v.as_str().to_string()), Some(s.clone()));
    }

    #[test]
    fn any_forbidden_character_is_rejected(
        prefix in "[A-Za-z0-9_-]{0,40}",
        bad in "[^A-Za-z0-9_-]",
        suffix in "[A-Za-z0-9_-]{0,40}",
    ) {
        let s = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_valid_input(&s));
    }

    #[test]
    fn overlong_values_are_rejected(s in "[A-Za-z0-9_-]{101,300}") {
        prop_assert!(!is_valid_input(&s));
    }

    #[test]
    fn validation_matches_a_plain_character_check(s in "\\PC{0,120}") {
        let expected = (1..=MAX_INPUT_LEN).contains(&s.len())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        prop_assert_eq!(is_valid_input(&s), expected);
    }
}
