use std::collections::HashMap;

use tempfile::tempdir;
use viral_monitor::config::{
    Credentials, DiscordCredentials, DiscordUse, MonitorConfig, ScheduleConfig, SourceKind, XCredentials,
};
use viral_monitor::persona::ReplyStyle;
use viral_monitor::scoring::QueryStrategy;
use viral_monitor::MonitorError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn partial_toml_keeps_defaults() {
    let config = MonitorConfig::from_toml(
        r#"
source = "reddit"

[filter]
min_engagement = 25

[replies]
style = "builder"
"#,
    )
    .unwrap();

    assert_eq!(config.source, SourceKind::Reddit);
    assert_eq!(config.filter.min_engagement, 25);
    assert_eq!(config.filter.min_followers, 100);
    assert!(config.filter.enforce_spam_patterns);
    assert_eq!(config.replies.reply_style(), ReplyStyle::Builder);
    assert_eq!(config.selection.global_top, 3);
    assert_eq!(config.x.query_strategy, QueryStrategy::Accounts);
    let names: Vec<&str> = config.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["tech", "crypto", "ai"]);
    config.validate().unwrap();
}

#[test]
fn custom_categories_replace_defaults() {
    let config = MonitorConfig::from_toml(
        r#"
[[categories]]
name = "gaming"
keywords = ["speedrun"]
subreddits = ["gaming"]
"#,
    )
    .unwrap();
    assert_eq!(config.categories.len(), 1);
    assert_eq!(config.categories[0].name, "gaming");
    assert!(config.categories[0].accounts.is_empty());
}

#[test]
fn env_overrides_win_over_file() {
    let mut config = MonitorConfig::default();
    config
        .apply_overrides(lookup(&[
            ("MONITOR_SOURCE", "reddit"),
            ("MIN_ENGAGEMENT", "50"),
            ("MIN_FOLLOWERS", " "),
            ("ENFORCE_SPAM_PATTERNS", "false"),
            ("REPLY_STYLE", "neutral"),
            ("XAI_MODEL", "grok-beta"),
            ("X_TIMEOUT_MS", "2500"),
            ("MONITOR_STATUS_PATH", "/tmp/monitor.status"),
        ]))
        .unwrap();

    assert_eq!(config.source, SourceKind::Reddit);
    assert_eq!(config.filter.min_engagement, 50);
    assert_eq!(config.filter.min_followers, 100);
    assert_eq!(config.x.timeout_ms, 2_500);
    assert!(!config.filter.enforce_spam_patterns);
    assert_eq!(config.replies.reply_style(), ReplyStyle::Neutral);
    assert_eq!(config.replies.model, "grok-beta");
    assert_eq!(config.status.path.to_str(), Some("/tmp/monitor.status"));
}

#[test]
fn malformed_overrides_name_the_key() {
    for (key, value) in [
        ("MIN_ENGAGEMENT", "fifty"),
        ("MONITOR_SOURCE", "twiter"),
        ("ENFORCE_SPAM_PATTERNS", "maybe"),
        ("REDDIT_TIMEOUT_MS", "-1"),
    ] {
        let mut config = MonitorConfig::default();
        let err = config.apply_overrides(lookup(&[(key, value)])).unwrap_err();
        match err {
            MonitorError::Config(message) => {
                assert!(message.contains(key), "{} missing from {:?}", key, message);
                assert!(message.contains(value), "{} missing from {:?}", value, message);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}

#[test]
fn validate_rejects_empty_selection_and_bad_hours() {
    let mut config = MonitorConfig::default();
    config.selection.global_top = 0;
    assert!(matches!(config.validate(), Err(MonitorError::Config(_))));

    let mut config = MonitorConfig::default();
    config.schedule.active_hours_utc = Some([0, 24]);
    assert!(config.validate().is_err());

    let mut config = MonitorConfig::default();
    config.categories.clear();
    assert!(config.validate().is_err());

    let mut config = MonitorConfig::default();
    config.x.timeout_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn written_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config").join("monitor.toml");
    let mut config = MonitorConfig::default();
    config.filter.min_followers = 777;
    config.write(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let loaded = MonitorConfig::from_toml(&contents).unwrap();
    assert_eq!(loaded.filter.min_followers, 777);
    assert_eq!(loaded.categories.len(), config.categories.len());
}

#[test]
fn active_hours_window() {
    let schedule = ScheduleConfig::default();
    assert!(schedule.is_active(0));
    assert!(schedule.is_active(4));
    assert!(!schedule.is_active(5));
    assert_eq!(schedule.local_hour(20), 3);

    let wrapping = ScheduleConfig {
        active_hours_utc: Some([22, 2]),
        ..ScheduleConfig::default()
    };
    assert!(wrapping.is_active(23));
    assert!(wrapping.is_active(1));
    assert!(!wrapping.is_active(12));

    let always = ScheduleConfig {
        active_hours_utc: None,
        ..ScheduleConfig::default()
    };
    assert!(always.is_active(15));
}

#[test]
fn missing_credentials_are_all_reported() {
    let err = Credentials::from_lookup(
        SourceKind::X,
        DiscordUse::Required,
        lookup(&[("DISCORD_BOT_TOKEN", "token")]),
    )
    .unwrap_err();
    match err {
        MonitorError::MissingSettings(missing) => {
            assert_eq!(missing, vec!["X_API_BEARER_TOKEN", "XAI_API_KEY", "DISCORD_CHANNEL_ID"]);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn reddit_source_needs_no_x_token() {
    let credentials = Credentials::from_lookup(
        SourceKind::Reddit,
        DiscordUse::Required,
        lookup(&[
            ("XAI_API_KEY", "xai"),
            ("DISCORD_BOT_TOKEN", "token"),
            ("DISCORD_CHANNEL_ID", "123456789"),
        ]),
    )
    .unwrap();
    assert!(credentials.x.is_none());
    assert_eq!(credentials.discord().unwrap().channel_id, 123_456_789);
}

#[test]
fn dry_run_credentials_skip_discord() {
    let credentials = Credentials::from_lookup(
        SourceKind::X,
        DiscordUse::IfConfigured,
        lookup(&[("X_BEARER_TOKEN", "bearer"), ("XAI_API_KEY", "xai")]),
    )
    .unwrap();
    assert!(credentials.discord.is_none());
    assert!(matches!(credentials.discord(), Err(MonitorError::MissingSettings(_))));

    let err = Credentials::from_lookup(SourceKind::X, DiscordUse::IfConfigured, lookup(&[])).unwrap_err();
    match err {
        MonitorError::MissingSettings(missing) => assert_eq!(missing, vec!["X_API_BEARER_TOKEN", "XAI_API_KEY"]),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn discord_credentials_alone() {
    let discord = DiscordCredentials::from_lookup(lookup(&[
        ("DISCORD_BOT_TOKEN", "token"),
        ("DISCORD_CHANNEL_ID", "42"),
    ]))
    .unwrap();
    assert_eq!(discord.channel_id, 42);

    let err = DiscordCredentials::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, MonitorError::MissingSettings(missing) if missing.len() == 2));
}

#[test]
fn non_numeric_channel_id_is_rejected() {
    let err = Credentials::from_lookup(
        SourceKind::Reddit,
        DiscordUse::Required,
        lookup(&[
            ("XAI_API_KEY", "xai"),
            ("DISCORD_BOT_TOKEN", "token"),
            ("DISCORD_CHANNEL_ID", "general"),
        ]),
    )
    .unwrap_err();
    assert!(matches!(err, MonitorError::Config(_)));
}

#[test]
fn bearer_token_preferred_over_oauth() {
    let credentials = XCredentials::from_lookup(lookup(&[
        ("X_BEARER_TOKEN", "bearer"),
        ("X_OAUTH_CLIENT_ID", "id"),
        ("X_OAUTH_CLIENT_SECRET", "secret"),
    ]));
    assert!(matches!(credentials, Some(XCredentials::Bearer(token)) if token == "bearer"));

    let oauth = XCredentials::from_lookup(lookup(&[
        ("X_OAUTH_CLIENT_ID", "id"),
        ("X_OAUTH_CLIENT_SECRET", "secret"),
    ]));
    assert!(matches!(oauth, Some(XCredentials::OAuthClient { .. })));
    assert!(XCredentials::from_lookup(lookup(&[("X_OAUTH_CLIENT_ID", "id")])).is_none());
}
