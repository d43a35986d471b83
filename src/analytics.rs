use serde::{Deserialize, Serialize};

use crate::scoring::viral_velocity;
use crate::Post;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPost {
    pub id: String,
    pub url: String,
    pub text: String,
    pub likes: u64,
    pub reposts: u64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total: usize,
    pub high_performers: usize,
    pub low_performers: usize,
    pub mean_velocity: f64,
    /// Character-length bucket most of the high performers fall into.
    pub sweet_spot: Option<String>,
    pub top: Vec<RankedPost>,
}

const LENGTH_BUCKETS: &[(usize, &str)] = &[
    (50, "under 50 chars"),
    (100, "50-100 chars"),
    (200, "100-200 chars"),
    (usize::MAX, "over 200 chars"),
];

impl PerformanceSummary {
    pub fn from_posts(posts: &[Post], min_likes: u64, top_n: usize) -> Self {
        let (high, low): (Vec<&Post>, Vec<&Post>) =
            posts.iter().partition(|post| post.metrics.likes >= min_likes);

        let mut ranked: Vec<RankedPost> = posts
            .iter()
            .map(|post| RankedPost {
                id: post.id.clone(),
                url: post.url.clone(),
                text: post.text.clone(),
                likes: post.metrics.likes,
                reposts: post.metrics.reposts,
                velocity: viral_velocity(post),
            })
            .collect();

        let mean_velocity = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(|post| post.velocity).sum::<f64>() / ranked.len() as f64
        };

        ranked.sort_by(|a, b| b.velocity.total_cmp(&a.velocity));
        ranked.truncate(top_n);

        Self {
            total: posts.len(),
            high_performers: high.len(),
            low_performers: low.len(),
            mean_velocity,
            sweet_spot: sweet_spot(&high).map(str::to_string),
            top: ranked,
        }
    }
}

fn sweet_spot(posts: &[&Post]) -> Option<&'static str> {
    let mut counts = [0usize; 4];
    for post in posts {
        let len = post.text.chars().count();
        if let Some(index) = LENGTH_BUCKETS.iter().position(|(limit, _)| len < *limit) {
            counts[index] += 1;
        }
    }
    // First bucket wins ties.
    let mut best: Option<(usize, usize)> = None;
    for (index, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if best_count >= *count => {}
            _ => best = Some((index, *count)),
        }
    }
    best.map(|(index, _)| LENGTH_BUCKETS[index].1)
}
