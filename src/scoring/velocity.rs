use crate::Post;

const FOLLOWER_FLOOR: u64 = 1_000;

/// Follower-normalized engagement: `(likes + 2 * reposts) / log10(max(followers, 1000))`.
///
/// Used for growth analytics only. Per-run selection ranks on
/// [`Post::engagement_score`] and never calls this.
pub fn viral_velocity(post: &Post) -> f64 {
    let followers = post
        .author_followers()
        .unwrap_or(FOLLOWER_FLOOR)
        .max(FOLLOWER_FLOOR);
    let engagement = post.metrics.likes as f64 + 2.0 * post.metrics.reposts as f64;
    engagement / (followers as f64).log10()
}
