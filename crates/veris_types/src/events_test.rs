use pretty_assertions::assert_eq;

use crate::events::{Event, EVENT_RATE_LIMIT_EXCEEDED};

#[test]
fn attributes_preserve_insertion_order() {
    let event = Event::new(EVENT_RATE_LIMIT_EXCEEDED)
        .attribute("account", "veris1abc")
        .attribute("reason", "block_limit")
        .attribute("limit", "5000");

    assert_eq!(event.kind, "rate_limit_exceeded");
    assert_eq!(
        event.attributes,
        vec![
            ("account".to_owned(), "veris1abc".to_owned()),
            ("reason".to_owned(), "block_limit".to_owned()),
            ("limit".to_owned(), "5000".to_owned()),
        ]
    );
    assert_eq!(event.get("reason"), Some("block_limit"));
    assert_eq!(event.get("missing"), None);
}
