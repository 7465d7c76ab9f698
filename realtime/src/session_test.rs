use super::*;

fn descriptor() -> SessionDescriptor {
    SessionDescriptor {
        config: ConnectionParams {
            api_key: "web-key".into(),
            database_url: "https://demo.firebaseio.com".into(),
        },
        token: "tok".into(),
        data: SessionIdentity { owner_account_id: "acct1".into(), viewer_user_id: "u1".into() },
        edition_id: "ed1".into(),
    }
}

#[test]
fn serializes_with_wire_field_names() {
    let json = serde_json::to_value(descriptor()).unwrap();
    assert_eq!(json["config"]["apiKey"], "web-key");
    assert_eq!(json["config"]["databaseURL"], "https://demo.firebaseio.com");
    assert_eq!(json["data"]["clientId"], "acct1");
    assert_eq!(json["data"]["userId"], "u1");
    assert_eq!(json["editionId"], "ed1");
    assert_eq!(json["token"], "tok");
}

#[test]
fn deserializes_page_payload() {
    let raw = r#"{
        "config": {"apiKey": "k", "databaseURL": "https://x.firebaseio.com"},
        "token": "t",
        "data": {"clientId": "c", "userId": "u"},
        "editionId": "e"
    }"#;
    let parsed: SessionDescriptor = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.owner_account_id(), "c");
    assert_eq!(parsed.viewer_user_id(), "u");
    assert_eq!(parsed.edition_id, "e");
}

#[test]
fn incomplete_without_token() {
    let mut d = descriptor();
    assert!(d.is_complete());
    d.token.clear();
    assert!(!d.is_complete());
}

#[test]
fn incomplete_without_database_url() {
    let mut d = descriptor();
    d.config.database_url.clear();
    assert!(!d.is_complete());
}
