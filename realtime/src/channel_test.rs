use super::*;
use serde_json::json;

// =============================================================================
// paths
// =============================================================================

#[test]
fn paths_are_keyed_by_owner_edition_viewer() {
    let paths = ChannelPaths::new("acct1", "ed1", "u1");
    assert_eq!(paths.draft, "/accounts/acct1/editions/ed1/regularDrafts/u1");
    assert_eq!(paths.active_item, "/accounts/acct1/editions/ed1/activeItem/u1");
    assert_eq!(paths.interaction_events, "/accounts/acct1/editions/ed1/uiEvents/u1");
}

#[test]
fn get_matches_fields() {
    let paths = ChannelPaths::new("a", "e", "v");
    for kind in ChannelKind::ALL {
        assert!(paths.get(kind).ends_with(&format!("/{}/v", kind.suffix())));
    }
}

#[test]
fn only_interaction_events_use_tail_mode() {
    assert_eq!(ChannelKind::Draft.mode(), SubscribeMode::Value);
    assert_eq!(ChannelKind::ActiveItem.mode(), SubscribeMode::Value);
    assert_eq!(ChannelKind::InteractionEvents.mode(), SubscribeMode::LastAppended);
}

// =============================================================================
// interaction decoding
// =============================================================================

#[test]
fn decodes_item_click() {
    assert_eq!(
        InteractionEvent::decode("click:item:42"),
        Some(InteractionEvent::Click(Target::Item("42".into())))
    );
}

#[test]
fn decodes_group_click() {
    assert_eq!(
        InteractionEvent::decode("click:group:g-7"),
        Some(InteractionEvent::Click(Target::Group("g-7".into())))
    );
}

#[test]
fn id_may_contain_separator() {
    let event = InteractionEvent::decode("click:item:a:b").unwrap();
    assert_eq!(event.target(), &Target::Item("a:b".into()));
}

#[test]
fn non_click_kinds_are_ignored() {
    assert_eq!(InteractionEvent::decode("hover:item:1"), None);
    assert_eq!(InteractionEvent::decode("dblclick:group:1"), None);
}

#[test]
fn unknown_target_type_is_ignored() {
    assert_eq!(InteractionEvent::decode("click:page:1"), None);
}

#[test]
fn malformed_records_are_ignored() {
    for raw in ["", "click", "click:item", "click:item:", "::", "garbage"] {
        assert_eq!(InteractionEvent::decode(raw), None, "{raw:?}");
    }
}

#[test]
fn from_value_requires_string() {
    assert!(InteractionEvent::from_value(&json!("click:item:1")).is_some());
    assert!(InteractionEvent::from_value(&json!(17)).is_none());
    assert!(InteractionEvent::from_value(&json!(null)).is_none());
    assert!(InteractionEvent::from_value(&json!({"kind": "click"})).is_none());
}

// =============================================================================
// active item values
// =============================================================================

#[test]
fn active_item_id_reads_strings_and_numbers() {
    assert_eq!(active_item_id(&json!("it-1")), Some("it-1".into()));
    assert_eq!(active_item_id(&json!(12)), Some("12".into()));
}

#[test]
fn active_item_id_absent_for_null_and_empty() {
    assert_eq!(active_item_id(&json!(null)), None);
    assert_eq!(active_item_id(&json!("")), None);
    assert_eq!(active_item_id(&json!({"id": 1})), None);
}
