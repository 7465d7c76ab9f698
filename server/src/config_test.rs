use std::collections::HashMap;

use super::*;

fn config(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    GatewayConfig::from_lookup(|key| map.get(key).cloned())
}

// =============================================================================
// from_lookup
// =============================================================================

#[test]
fn defaults_when_nothing_set() {
    let cfg = config(&[]).unwrap();
    assert_eq!(cfg.host, DEFAULT_HOST);
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.upstream.base_url, DEFAULT_UPSTREAM_URL);
    assert_eq!(cfg.upstream.timeout_secs, DEFAULT_UPSTREAM_TIMEOUT_SECS);
    assert!(cfg.upstream.default_apikey.is_none());
    assert!(!cfg.upstream.accept_invalid_certs);
    assert!(cfg.default_user_id.is_none());
    assert!(cfg.asset_dir.ends_with("assets"));
    assert_eq!(cfg.bind_addr(), "127.0.0.1:7002");
}

#[test]
fn overrides_are_parsed() {
    let cfg = config(&[
        ("HOST", "0.0.0.0"),
        ("PORT", "8080"),
        ("UPSTREAM_URL", "https://upstream.example.test/"),
        ("UPSTREAM_APIKEY", "secret"),
        ("UPSTREAM_TIMEOUT_SECS", "5"),
        ("UPSTREAM_ACCEPT_INVALID_CERTS", "yes"),
        ("PREVIEW_USER_ID", "u1"),
        ("PREVIEW_ASSET_DIR", "/srv/preview"),
    ])
    .unwrap();
    assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    assert_eq!(cfg.upstream.base_url, "https://upstream.example.test");
    assert_eq!(cfg.upstream.default_apikey.as_deref(), Some("secret"));
    assert_eq!(cfg.upstream.timeout_secs, 5);
    assert!(cfg.upstream.accept_invalid_certs);
    assert_eq!(cfg.default_user_id.as_deref(), Some("u1"));
    assert_eq!(cfg.asset_dir, PathBuf::from("/srv/preview"));
}

#[test]
fn invalid_numbers_fall_back() {
    let cfg = config(&[("PORT", "not-a-port"), ("UPSTREAM_TIMEOUT_SECS", "-3")]).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.upstream.timeout_secs, DEFAULT_UPSTREAM_TIMEOUT_SECS);
}

#[test]
fn blank_values_count_as_unset() {
    let cfg = config(&[("UPSTREAM_APIKEY", "   "), ("PREVIEW_USER_ID", "")]).unwrap();
    assert!(cfg.upstream.default_apikey.is_none());
    assert!(cfg.default_user_id.is_none());
}

#[test]
fn invalid_upstream_url_errors() {
    let err = config(&[("UPSTREAM_URL", "not a url")]).unwrap_err();
    assert!(err.to_string().contains("invalid UPSTREAM_URL"));
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", " On "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "Off"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_invalid_returns_none() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

#[test]
fn unparseable_bool_env_defaults_false() {
    let cfg = config(&[("UPSTREAM_ACCEPT_INVALID_CERTS", "perhaps")]).unwrap();
    assert!(!cfg.upstream.accept_invalid_certs);
}
