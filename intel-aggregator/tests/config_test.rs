use intel_aggregator::config::AppConfig;
use intel_aggregator::{IntelError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn test_defaults_without_environment() -> Result<()> {
    let config = config_from(&[])?;

    assert_eq!(config.limits.max_posts, 15);
    assert_eq!(config.limits.max_articles, 15);
    assert_eq!(config.limits.tier_caps.p1, 15);
    assert_eq!(config.limits.tier_caps.p2, 15);
    assert_eq!(config.limits.tier_caps.p3, 10);
    assert_eq!(config.limits.max_recommendations, 5);
    assert_eq!(config.limits.min_mentions, 2);
    assert_eq!(config.limits.max_history, 30);
    assert!(config.x_api.api_key.is_none());
    assert!(config.analyzer.api_key.is_none());
    assert_eq!(config.rss.feeds.len(), 4);
    assert_eq!(config.directories.data_dir, PathBuf::from("data"));
    assert_eq!(config.logging.level, "info");

    Ok(())
}

#[test]
fn test_environment_overrides() -> Result<()> {
    let config = config_from(&[
        ("MAX_HISTORY", "7"),
        ("P3_CAP", "3"),
        ("RSS_FEEDS", "https://a.example.com/rss; https://b.example.com/feed;"),
        ("DATA_DIR", "/tmp/intel-data"),
        ("TWITTER_API_KEY", "  key-123  "),
        ("MAX_POSTS", "not a number"),
    ])?;

    assert_eq!(config.limits.max_history, 7);
    assert_eq!(config.limits.tier_caps.p3, 3);
    assert_eq!(
        config.rss.feeds,
        vec!["https://a.example.com/rss", "https://b.example.com/feed"]
    );
    assert_eq!(config.directories.data_dir, PathBuf::from("/tmp/intel-data"));
    assert_eq!(config.x_api.api_key.as_deref(), Some("key-123"));
    assert_eq!(config.limits.max_posts, 15);

    Ok(())
}

#[test]
fn test_invalid_feed_url_is_rejected() {
    let result = config_from(&[("RSS_FEEDS", "https://ok.example.com/rss;ftp://bad.example.com")]);
    assert!(matches!(result, Err(IntelError::Config(_))));
}

#[test]
fn test_lower_bounds_are_clamped() -> Result<()> {
    let config = config_from(&[("MIN_MENTIONS", "1"), ("MAX_HISTORY", "0")])?;
    assert_eq!(config.limits.min_mentions, 2);
    assert_eq!(config.limits.max_history, 1);
    Ok(())
}
