mod common;

use common::FakeApi;
use helpcenter::aggregation::{build_index, Aggregator, FetchTarget, RetryPolicy, SubCategoryKey};
use helpcenter::api::HelpCenterApi;
use helpcenter::search;
use std::collections::BTreeSet;
use std::sync::Arc;

fn ids<'a>(articles: impl IntoIterator<Item = &'a helpcenter::models::ArticleSummary>) -> Vec<&'a str> {
    articles.into_iter().map(|a| a.id.as_str()).collect()
}

#[tokio::test]
async fn test_index_covers_every_category_and_sub_category() {
    let (api, _) = FakeApi::with_memory_tokens();
    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert!(index.is_complete());
    assert_eq!(index.categories().len(), 2);
    assert!(index.detail("guides").is_some());
    assert!(index.detail("faq").is_some());

    let keys: BTreeSet<SubCategoryKey> = index.sub_category_keys().cloned().collect();
    assert_eq!(
        keys,
        BTreeSet::from([
            SubCategoryKey::new("guides", "billing"),
            SubCategoryKey::new("guides", "setup"),
        ])
    );

    assert_eq!(ids(index.sub_category_articles("guides", "billing")), vec!["a2", "a4"]);
    assert_eq!(ids(index.articles("faq")), vec!["f1"]);
    assert!(index.sub_category_articles("faq", "setup").is_empty());
}

#[tokio::test]
async fn test_duplicate_articles_are_dropped() {
    let (api, _) = FakeApi::with_memory_tokens();
    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert_eq!(ids(index.articles("guides")), vec!["a1", "a2", "a3"]);
}

#[tokio::test]
async fn test_uncategorized_articles_are_the_set_difference() {
    let (api, _) = FakeApi::with_memory_tokens();
    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert_eq!(ids(index.uncategorized_articles("guides").unwrap()), vec!["a3"]);
    assert_eq!(ids(index.uncategorized_articles("faq").unwrap()), vec!["f1"]);
}

#[tokio::test]
async fn test_uncategorized_is_unknown_while_a_section_is_missing() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("articles:guides:billing", 1).await;

    let mut aggregator = Aggregator::new(api.clone(), RetryPolicy::no_retry());
    let index = aggregator.refresh().await.unwrap();

    // a2 belongs to billing and must not be reported as uncategorized.
    assert!(!index.is_category_complete("guides"));
    assert_eq!(index.uncategorized_articles("guides"), None);
    assert!(index.is_category_complete("faq"));
    assert_eq!(ids(index.uncategorized_articles("faq").unwrap()), vec!["f1"]);

    let index = aggregator.retry_failed().await.unwrap();
    assert_eq!(ids(index.uncategorized_articles("guides").unwrap()), vec!["a3"]);
}

#[tokio::test]
async fn test_uncategorized_is_unknown_without_detail() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("detail:guides", 1).await;

    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert_eq!(index.uncategorized_articles("guides"), None);
    assert_eq!(ids(index.articles("guides")), vec!["a1", "a2", "a3"]);
}

#[tokio::test]
async fn test_sub_category_fetch_waits_for_its_detail() {
    let (api, _) = FakeApi::with_memory_tokens();
    build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    let calls = api.calls().await;
    let position = |name: &str| calls.iter().position(|c| c == name).unwrap();

    assert_eq!(calls[0], "categories");
    assert!(position("detail:guides") < position("articles:guides:setup"));
    assert!(position("detail:guides") < position("articles:guides:billing"));
    assert_eq!(calls.len(), 1 + 2 * 2 + 2);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (api, _) = FakeApi::with_memory_tokens();
    let mut aggregator = Aggregator::new(api.clone(), RetryPolicy::no_retry());

    let first = aggregator.refresh().await.unwrap().clone();
    let second = aggregator.refresh().await.unwrap().clone();

    assert_eq!(first, second);
    assert_eq!(api.count("categories").await, 2);
}

#[tokio::test]
async fn test_category_list_failure_fails_the_build() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("categories", 1).await;

    let mut aggregator = Aggregator::new(api.clone(), RetryPolicy::no_retry());
    assert!(aggregator.refresh().await.is_err());
    assert!(aggregator.index().is_none());

    // Only the list was requested.
    assert_eq!(api.calls().await, vec!["categories"]);
}

#[tokio::test]
async fn test_branch_failures_are_recorded_not_hidden() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("detail:guides", 10).await;
    api.fail("articles:faq", 10).await;

    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert!(!index.is_complete());
    let failed: Vec<&FetchTarget> = index.failures().iter().map(|f| &f.target).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&&FetchTarget::CategoryDetail("guides".into())));
    assert!(failed.contains(&&FetchTarget::CategoryArticles("faq".into())));

    // No detail means no sub-category fetches for that category.
    assert_eq!(index.sub_category_keys().count(), 0);
    assert_eq!(api.count("articles:guides:setup").await, 0);

    // Unaffected branches still settle.
    assert_eq!(ids(index.articles("guides")), vec!["a1", "a2", "a3"]);
    assert!(index.detail("faq").is_some());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("articles:guides:setup", 1).await;

    let policy = RetryPolicy {
        attempts: 2,
        delay: std::time::Duration::ZERO,
    };
    let index = build_index(api.as_ref(), &policy).await.unwrap();

    assert!(index.is_complete());
    assert_eq!(api.count("articles:guides:setup").await, 2);
    assert_eq!(ids(index.sub_category_articles("guides", "setup")), vec!["a1"]);
}

#[tokio::test]
async fn test_retry_failed_fills_the_holes() {
    let (api, _) = FakeApi::with_memory_tokens();
    api.fail("detail:guides", 1).await;
    api.fail("articles:faq", 1).await;

    let mut aggregator = Aggregator::new(api.clone(), RetryPolicy::no_retry());
    assert_eq!(aggregator.refresh().await.unwrap().failures().len(), 2);

    let index = aggregator.retry_failed().await.unwrap();
    assert!(index.is_complete());
    assert!(index.detail("guides").is_some());
    assert_eq!(index.sub_category_keys().count(), 2);
    assert_eq!(ids(index.articles("faq")), vec!["f1"]);

    // The category list is not re-fetched.
    assert_eq!(api.count("categories").await, 1);
    assert_eq!(api.count("articles:guides").await, 1);
}

#[tokio::test]
async fn test_mismatched_detail_counts_as_failure() {
    let tokens = Arc::new(helpcenter::storage::MemoryStore::new());
    let mut fake = FakeApi::new(tokens);
    fake.details
        .insert("faq".into(), common::detail("guides", "Guides", &["setup"]));
    let api: Arc<dyn HelpCenterApi> = Arc::new(fake);

    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    assert_eq!(
        index.failures()[0].target,
        FetchTarget::CategoryDetail("faq".into())
    );
    assert!(index.detail("faq").is_none());
    assert!(index.sub_category_articles("faq", "setup").is_empty());
    assert_eq!(index.detail("guides").unwrap().id, "guides");
}

#[tokio::test]
async fn test_search_groups_by_category() {
    let (api, _) = FakeApi::with_memory_tokens();
    let index = build_index(api.as_ref(), &RetryPolicy::no_retry()).await.unwrap();

    let all = search::search_entries(&index);
    assert_eq!(all.len(), 5);

    let groups = search::search(&index, "  PAY ");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].category_name, "Guides");
    assert_eq!(groups[0].entries.len(), 1);
    assert_eq!(groups[0].entries[0].id, "a2");

    let refunds = search::search(&index, "refund");
    assert_eq!(refunds[0].entries[0].id, "a4");

    assert_eq!(search::search(&index, "").len(), 2);
    assert!(search::search(&index, "nothing like this").is_empty());
}
