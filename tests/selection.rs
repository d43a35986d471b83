use viral_monitor::scoring::{
    viral_velocity, Category, CategoryBatch, CategoryCatalog, CategorySelector, QualityFilter,
    QualityFilterConfig, SelectionConfig, SelectionOutcome, GENERAL_CATEGORY,
};
use viral_monitor::{Author, EngagementFormula, Post, PostMetrics};

fn post(id: &str, likes: u64, reposts: u64) -> Post {
    Post::new(
        id,
        format!("post {}", id),
        format!("https://twitter.com/user/status/{}", id),
        Some(Author::new("user").with_followers(5_000)),
        PostMetrics {
            likes,
            reposts,
            ..PostMetrics::default()
        },
        None,
        EngagementFormula::Reposts,
    )
}

fn selector(top_per_category: usize, global_top: usize) -> CategorySelector {
    let filter = QualityFilter::new(QualityFilterConfig::default()).unwrap();
    CategorySelector::new(
        filter,
        SelectionConfig {
            top_per_category,
            global_top,
        },
    )
}

fn ids(outcome: &SelectionOutcome) -> Vec<&str> {
    outcome.posts().iter().map(|post| post.id.as_str()).collect()
}

#[test]
fn merges_categories_by_descending_score() {
    let batches = vec![
        CategoryBatch::new("tech", vec![post("t1", 60, 10)]),
        CategoryBatch::new("crypto", vec![post("c1", 75, 10)]),
    ];
    let outcome = selector(1, 3).select(batches);

    let scores: Vec<u64> = outcome.posts().iter().map(|p| p.engagement_score()).collect();
    assert_eq!(scores, vec![95, 80]);
    assert_eq!(outcome.posts()[0].category(), Some("crypto"));
    assert_eq!(outcome.posts()[1].category(), Some("tech"));
}

#[test]
fn respects_per_category_and_global_limits() {
    let batches = vec![
        CategoryBatch::new("tech", (0..5).map(|i| post(&format!("t{}", i), 100 + i, 0)).collect()),
        CategoryBatch::new("crypto", (0..5).map(|i| post(&format!("c{}", i), 200 + i, 0)).collect()),
        CategoryBatch::new("ai", (0..5).map(|i| post(&format!("a{}", i), 300 + i, 0)).collect()),
    ];
    let (outcome, stats) = selector(2, 3).select_with_stats(batches);

    assert_eq!(ids(&outcome), vec!["a4", "a3", "c4"]);
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| s.fetched == 5 && s.passed == 5 && s.selected == 2));
}

#[test]
fn fewer_candidates_than_limit_returns_all() {
    let batches = vec![CategoryBatch::new("tech", vec![post("t1", 50, 0)])];
    let outcome = selector(1, 3).select(batches);
    assert_eq!(ids(&outcome), vec!["t1"]);
}

#[test]
fn empty_after_filtering_is_no_qualifying_posts() {
    let batches = vec![
        CategoryBatch::new("tech", vec![post("t1", 1, 0)]),
        CategoryBatch::empty("crypto"),
    ];
    let outcome = selector(1, 3).select(batches);
    assert_eq!(outcome, SelectionOutcome::NoQualifyingPosts);
    assert!(outcome.is_empty());
    assert!(selector(1, 3).select(Vec::new()).is_empty());
}

#[test]
fn ties_keep_fetch_order() {
    let batches = vec![
        CategoryBatch::new("tech", vec![post("first", 40, 0), post("second", 40, 0)]),
        CategoryBatch::new("crypto", vec![post("third", 40, 0)]),
    ];
    let outcome = selector(2, 3).select(batches);
    assert_eq!(ids(&outcome), vec!["first", "second", "third"]);
}

#[test]
fn selection_is_deterministic() {
    let batches = || {
        vec![
            CategoryBatch::new("tech", vec![post("t1", 30, 5), post("t2", 30, 5), post("t3", 90, 1)]),
            CategoryBatch::new("ai", vec![post("a1", 30, 5), post("a2", 12, 0)]),
        ]
    };
    let first = selector(2, 3).select(batches());
    let second = selector(2, 3).select(batches());
    assert_eq!(first, second);
}

#[test]
fn post_tagged_for_another_category_is_skipped() {
    let stray = post("x1", 500, 0).with_category("ai");
    let batches = vec![CategoryBatch::new("tech", vec![stray, post("t1", 40, 0)])];
    let (outcome, stats) = selector(1, 3).select_with_stats(batches);

    assert_eq!(ids(&outcome), vec!["t1"]);
    assert_eq!(outcome.posts()[0].category(), Some("tech"));
    assert_eq!(stats[0].selected, 1);
}

#[test]
fn duplicate_ids_across_categories_keep_first() {
    let batches = vec![
        CategoryBatch::new("tech", vec![post("dup", 80, 0)]),
        CategoryBatch::new("crypto", vec![post("dup", 80, 0), post("c2", 20, 0)]),
    ];
    let outcome = selector(2, 3).select(batches);
    assert_eq!(ids(&outcome), vec!["dup", "c2"]);
    assert_eq!(outcome.posts()[0].category(), Some("tech"));
}

#[test]
fn engagement_score_is_fixed_at_construction() {
    let post = post("p", 60, 10);
    assert_eq!(post.engagement_score(), 80);
    assert_eq!(post.engagement_score(), EngagementFormula::Reposts.score(&post.metrics));

    let reddit = Post::new(
        "r",
        "title",
        "https://reddit.com/r/x/1",
        None,
        PostMetrics {
            likes: 120,
            replies: 8,
            ..PostMetrics::default()
        },
        None,
        EngagementFormula::Upvotes,
    );
    assert_eq!(reddit.engagement_score(), 160);
}

#[test]
fn category_can_only_be_assigned_once() {
    let mut post = post("p", 10, 0);
    assert!(post.assign_category("tech").is_ok());
    assert!(post.assign_category("tech").is_ok());
    let conflict = post.assign_category("ai").unwrap_err();
    assert_eq!(conflict.existing, "tech");
    assert_eq!(conflict.requested, "ai");
}

#[test]
fn velocity_damps_large_accounts() {
    let small = post("s", 100, 50);
    let mut large = post("l", 100, 50);
    large.author = Some(Author::new("big").with_followers(1_000_000));

    // 200 / log10(5000) vs 200 / log10(1e6) = 200 / 6
    assert!(viral_velocity(&small) > viral_velocity(&large));
    assert!((viral_velocity(&large) - 200.0 / 6.0).abs() < 1e-6);

    let mut anonymous = post("a", 100, 50);
    anonymous.author = None;
    assert!((viral_velocity(&anonymous) - 200.0 / 3.0).abs() < 1e-6);
}

#[test]
fn velocity_floors_small_accounts_at_one_thousand_followers() {
    let mut tiny = post("tiny", 100, 50);
    tiny.author = Some(Author::new("tiny").with_followers(10));
    let mut floor = post("floor", 100, 50);
    floor.author = Some(Author::new("floor").with_followers(1_000));

    // log10(max(10, 1000)) = 3
    assert!((viral_velocity(&tiny) - 200.0 / 3.0).abs() < 1e-6);
    assert!((viral_velocity(&tiny) - viral_velocity(&floor)).abs() < 1e-9);
}

fn keyword_category(name: &str, keywords: &[&str]) -> Category {
    Category {
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        ..Category::new(name)
    }
}

fn untagged(id: &str, text: &str, likes: u64) -> Post {
    let mut post = post(id, likes, 0);
    post.text = text.to_string();
    post
}

#[test]
fn mixed_batch_posts_are_placed_by_content() {
    let catalog = CategoryCatalog::new(vec![
        keyword_category("crypto", &["bitcoin"]),
        keyword_category("ai", &["llm"]),
    ]);
    let batches = vec![
        CategoryBatch::new("crypto", vec![post("c1", 30, 0).with_category("crypto")]),
        CategoryBatch::mixed(vec![
            untagged("m1", "Bitcoin ETF flows keep climbing", 90),
            untagged("m2", "New open-weights LLM tops the charts", 70),
            untagged("m3", "Sunset over the bay tonight", 50),
        ]),
    ];
    let (outcome, stats) = selector(1, 3)
        .with_catalog(catalog)
        .select_with_stats(batches);

    let placed: Vec<(&str, Option<&str>)> = outcome
        .posts()
        .iter()
        .map(|post| (post.id.as_str(), post.category()))
        .collect();
    assert_eq!(
        placed,
        vec![
            ("m1", Some("crypto")),
            ("m2", Some("ai")),
            ("m3", Some(GENERAL_CATEGORY)),
        ]
    );

    let names: Vec<&str> = stats.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, vec!["crypto", "ai", GENERAL_CATEGORY]);
    assert_eq!(stats[0].fetched, 2);
}

#[test]
fn mixed_batch_without_catalog_lands_in_general() {
    let batches = vec![CategoryBatch::mixed(vec![untagged("m1", "bitcoin", 60)])];
    let outcome = selector(1, 3).select(batches);
    assert_eq!(outcome.posts()[0].category(), Some(GENERAL_CATEGORY));
}

#[test]
fn stored_score_is_recomputed_on_load() {
    let original = post("p", 60, 10).with_category("tech");
    let mut stored = serde_json::to_value(&original).unwrap();
    assert_eq!(stored["engagement_score"], 80);
    stored["engagement_score"] = serde_json::json!(1_000_000);

    let loaded: Post = serde_json::from_value(stored).unwrap();
    assert_eq!(loaded.engagement_score(), 80);
    assert_eq!(loaded.category(), Some("tech"));
    assert_eq!(loaded, original);
}
