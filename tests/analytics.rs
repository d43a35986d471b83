use std::time::Duration;

use viral_monitor::analytics::PerformanceSummary;
use viral_monitor::backoff::{is_retryable, BackoffPolicy};
use viral_monitor::{Author, EngagementFormula, Post, PostMetrics};

fn own_post(id: &str, text: &str, likes: u64, reposts: u64) -> Post {
    Post::new(
        id,
        text,
        format!("https://twitter.com/me/status/{}", id),
        Some(Author::new("me").with_followers(10_000)),
        PostMetrics {
            likes,
            reposts,
            ..PostMetrics::default()
        },
        None,
        EngagementFormula::Reposts,
    )
}

#[test]
fn ranks_by_velocity_and_splits_performers() {
    let posts = vec![
        own_post("1", "gm", 20, 0),
        own_post("2", "a short but punchy take on oracles", 400, 40),
        own_post("3", "another quick one", 150, 5),
    ];
    let summary = PerformanceSummary::from_posts(&posts, 100, 2);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.high_performers, 2);
    assert_eq!(summary.low_performers, 1);
    let top: Vec<&str> = summary.top.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(top, vec!["2", "3"]);
    // 10k followers: velocity = (likes + 2 * reposts) / 4
    assert!((summary.top[0].velocity - 120.0).abs() < 1e-6);
    assert_eq!(summary.sweet_spot.as_deref(), Some("under 50 chars"));
}

#[test]
fn empty_history_has_no_sweet_spot() {
    let summary = PerformanceSummary::from_posts(&[], 100, 5);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.mean_velocity, 0.0);
    assert!(summary.sweet_spot.is_none());
    assert!(summary.top.is_empty());
}

#[test]
fn backoff_doubles_up_to_the_cap() {
    let policy = BackoffPolicy {
        initial_backoff_ms: 1_000,
        max_backoff_ms: 5_000,
        ..BackoffPolicy::default()
    };
    assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1_000));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4_000));
    assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(5_000));
    assert_eq!(policy.delay_for_attempt(64), Duration::from_millis(5_000));
}

#[test]
fn retries_only_throttling_and_server_errors() {
    let policy = BackoffPolicy::default();
    assert!(is_retryable(429));
    assert!(is_retryable(503));
    assert!(!is_retryable(401));
    assert!(policy.should_retry(0, 429));
    assert!(policy.should_retry(1, 500));
    assert!(!policy.should_retry(2, 500));
    assert!(!BackoffPolicy::immediate().should_retry(0, 429));
}
