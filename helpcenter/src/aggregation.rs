//! Navigation index over categories, sub-categories and articles.
//!
//! The backend has no tree endpoint, so the index is assembled from a
//! three-stage fan-out:
//!
//! 1. the category list;
//! 2. for every category, concurrently, its detail (carrying sub-categories)
//!    and its articles;
//! 3. once a category's detail resolves, the articles of each of its
//!    sub-categories.
//!
//! Stage 1 failing fails the build. Stage 2 and 3 fetches are retried per
//! [`RetryPolicy`]; whatever still fails is recorded in
//! [`ContentIndex::failures`] instead of silently leaving a hole.

use futures::future::join_all;
use log::{debug, info, warn};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    sync::Arc,
    time::Duration,
};

use crate::api::HelpCenterApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{ArticleQuery, ArticleSummary, CategoryDetail, CategorySummary};

/// Lookup key for the articles of one sub-category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubCategoryKey {
    pub category_id: String,
    pub sub_category_id: String,
}

impl SubCategoryKey {
    pub fn new(category_id: &str, sub_category_id: &str) -> Self {
        Self {
            category_id: category_id.to_string(),
            sub_category_id: sub_category_id.to_string(),
        }
    }
}

impl fmt::Display for SubCategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.category_id, self.sub_category_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    CategoryDetail(String),
    CategoryArticles(String),
    SubCategoryArticles(SubCategoryKey),
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::CategoryDetail(id) => write!(f, "detail of category {}", id),
            FetchTarget::CategoryArticles(id) => write!(f, "articles of category {}", id),
            FetchTarget::SubCategoryArticles(key) => write!(f, "articles of sub-category {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub target: FetchTarget,
    pub error: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentIndex {
    categories: Vec<CategorySummary>,
    details: HashMap<String, CategoryDetail>,
    articles: HashMap<String, Vec<ArticleSummary>>,
    sub_category_articles: HashMap<SubCategoryKey, Vec<ArticleSummary>>,
    failures: Vec<FetchFailure>,
}

impl ContentIndex {
    /// Categories in backend order.
    pub fn categories(&self) -> &[CategorySummary] {
        &self.categories
    }

    pub fn detail(&self, category_id: &str) -> Option<&CategoryDetail> {
        self.details.get(category_id)
    }

    /// Every article of a category, regardless of sub-category.
    pub fn articles(&self, category_id: &str) -> &[ArticleSummary] {
        self.articles
            .get(category_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn sub_category_articles(&self, category_id: &str, sub_category_id: &str) -> &[ArticleSummary] {
        self.sub_category_articles
            .get(&SubCategoryKey::new(category_id, sub_category_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn sub_category_keys(&self) -> impl Iterator<Item = &SubCategoryKey> {
        self.sub_category_articles.keys()
    }

    /// Whether every fetch belonging to this category settled successfully.
    pub fn is_category_complete(&self, category_id: &str) -> bool {
        !self.failures.iter().any(|failure| match &failure.target {
            FetchTarget::CategoryDetail(id) | FetchTarget::CategoryArticles(id) => id == category_id,
            FetchTarget::SubCategoryArticles(key) => key.category_id == category_id,
        })
    }

    /// Articles of the category that none of its sub-categories list.
    /// `None` while a fetch of this category is failed, since the difference
    /// would then be taken against incomplete lists.
    pub fn uncategorized_articles(&self, category_id: &str) -> Option<Vec<&ArticleSummary>> {
        if !self.is_category_complete(category_id) {
            return None;
        }

        let in_sub_categories: HashSet<&str> = self
            .detail(category_id)
            .map(|detail| detail.sub_categories.as_slice())
            .unwrap_or_default()
            .iter()
            .flat_map(|sub| self.sub_category_articles(category_id, &sub.id))
            .map(|article| article.id.as_str())
            .collect();

        Some(
            self.articles(category_id)
                .iter()
                .filter(|article| !in_sub_categories.contains(article.id.as_str()))
                .collect(),
        )
    }

    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    /// True when every stage 2 and stage 3 fetch succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn apply(&mut self, outcome: Outcome) {
        let target = outcome.target();
        self.failures.retain(|failure| failure.target != target);

        match outcome {
            Outcome::Detail(_, Ok(detail)) => {
                self.details.insert(detail.id.clone(), detail);
            }
            Outcome::Articles(category_id, Ok(articles)) => {
                self.articles.insert(category_id, dedupe_by_id(articles));
            }
            Outcome::SubArticles(key, Ok(articles)) => {
                self.sub_category_articles.insert(key, dedupe_by_id(articles));
            }
            Outcome::Detail(_, Err(failure))
            | Outcome::Articles(_, Err(failure))
            | Outcome::SubArticles(_, Err(failure)) => self.failures.push(failure),
        }
    }
}

fn dedupe_by_id(articles: Vec<ArticleSummary>) -> Vec<ArticleSummary> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| seen.insert(article.id.clone()))
        .collect()
}

enum Outcome {
    Detail(String, Result<CategoryDetail, FetchFailure>),
    Articles(String, Result<Vec<ArticleSummary>, FetchFailure>),
    SubArticles(SubCategoryKey, Result<Vec<ArticleSummary>, FetchFailure>),
}

impl Outcome {
    fn target(&self) -> FetchTarget {
        match self {
            Outcome::Detail(id, _) => FetchTarget::CategoryDetail(id.clone()),
            Outcome::Articles(id, _) => FetchTarget::CategoryArticles(id.clone()),
            Outcome::SubArticles(key, _) => FetchTarget::SubCategoryArticles(key.clone()),
        }
    }
}

async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    target: &FetchTarget,
    mut fetch: F,
) -> Result<T, FetchFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                debug!("{} failed (attempt {}/{}): {}", target, attempt, attempts, e);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} failed after {} attempt(s): {}", target, attempt, e);
                return Err(FetchFailure {
                    target: target.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}

async fn fetch_detail(api: &dyn HelpCenterApi, category_id: &str) -> ApiResult<CategoryDetail> {
    let detail = api.category(category_id).await?.into_data()?;
    if detail.id != category_id {
        return Err(ApiError::UnexpectedCategory {
            expected: category_id.to_string(),
            actual: detail.id,
        });
    }
    Ok(detail)
}

async fn fetch_articles(
    api: &dyn HelpCenterApi,
    query: &ArticleQuery,
) -> ApiResult<Vec<ArticleSummary>> {
    Ok(api.articles(query).await?.into_data()?.articles)
}

async fn category_articles_outcome(
    api: &dyn HelpCenterApi,
    policy: &RetryPolicy,
    category_id: &str,
) -> Outcome {
    let target = FetchTarget::CategoryArticles(category_id.to_string());
    let query = ArticleQuery::in_category(category_id);
    let result = with_retry(policy, &target, || fetch_articles(api, &query)).await;
    Outcome::Articles(category_id.to_string(), result)
}

async fn sub_category_outcome(
    api: &dyn HelpCenterApi,
    policy: &RetryPolicy,
    key: SubCategoryKey,
) -> Outcome {
    let target = FetchTarget::SubCategoryArticles(key.clone());
    let query = ArticleQuery::in_category(&key.category_id).with_sub_category(&key.sub_category_id);
    let result = with_retry(policy, &target, || fetch_articles(api, &query)).await;
    Outcome::SubArticles(key, result)
}

/// Stage 2 detail fetch followed by the stage 3 fetches it unlocks.
async fn detail_branch(
    api: &dyn HelpCenterApi,
    policy: &RetryPolicy,
    category_id: &str,
) -> Vec<Outcome> {
    let target = FetchTarget::CategoryDetail(category_id.to_string());
    let detail = with_retry(policy, &target, || fetch_detail(api, category_id)).await;

    let sub_fetches: Vec<_> = match &detail {
        Ok(detail) => detail
            .sub_categories
            .iter()
            .map(|sub| sub_category_outcome(api, policy, SubCategoryKey::new(category_id, &sub.id)))
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut outcomes = vec![Outcome::Detail(category_id.to_string(), detail)];
    outcomes.extend(join_all(sub_fetches).await);
    outcomes
}

async fn category_branch(
    api: &dyn HelpCenterApi,
    policy: &RetryPolicy,
    category_id: &str,
) -> Vec<Outcome> {
    let (mut outcomes, articles) = futures::join!(
        detail_branch(api, policy, category_id),
        category_articles_outcome(api, policy, category_id),
    );
    outcomes.push(articles);
    outcomes
}

/// Runs the full fan-out and returns the settled index.
pub async fn build_index(api: &dyn HelpCenterApi, policy: &RetryPolicy) -> ApiResult<ContentIndex> {
    let categories = api.categories().await?.into_data()?;
    info!("building content index for {} categories", categories.len());

    let branches = join_all(
        categories
            .iter()
            .map(|category| category_branch(api, policy, &category.id)),
    )
    .await;

    let mut index = ContentIndex {
        categories,
        ..ContentIndex::default()
    };
    for outcome in branches.into_iter().flatten() {
        index.apply(outcome);
    }

    if !index.is_complete() {
        warn!(
            "content index settled with {} failed fetch(es)",
            index.failures.len()
        );
    }
    Ok(index)
}

/// Holds the last settled [`ContentIndex`] and rebuilds it on demand.
pub struct Aggregator {
    api: Arc<dyn HelpCenterApi>,
    policy: RetryPolicy,
    index: Option<ContentIndex>,
}

impl Aggregator {
    pub fn new(api: Arc<dyn HelpCenterApi>, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            index: None,
        }
    }

    /// Last settled index; `None` until the first refresh completes.
    pub fn index(&self) -> Option<&ContentIndex> {
        self.index.as_ref()
    }

    /// Rebuilds from scratch and replaces the settled index. On a stage 1
    /// failure the previous index is kept.
    pub async fn refresh(&mut self) -> ApiResult<&ContentIndex> {
        let index = build_index(self.api.as_ref(), &self.policy).await?;
        Ok(&*self.index.insert(index))
    }

    /// Re-issues only the fetches recorded as failed and merges the results.
    pub async fn retry_failed(&mut self) -> Option<&ContentIndex> {
        let targets: Vec<FetchTarget> = self
            .index
            .as_ref()?
            .failures
            .iter()
            .map(|failure| failure.target.clone())
            .collect();

        if !targets.is_empty() {
            info!("retrying {} failed fetch(es)", targets.len());
            let api = self.api.as_ref();
            let policy = &self.policy;

            let outcomes = join_all(targets.iter().map(|target| async move {
                match target {
                    FetchTarget::CategoryDetail(id) => detail_branch(api, policy, id).await,
                    FetchTarget::CategoryArticles(id) => {
                        vec![category_articles_outcome(api, policy, id).await]
                    }
                    FetchTarget::SubCategoryArticles(key) => {
                        vec![sub_category_outcome(api, policy, key.clone()).await]
                    }
                }
            }))
            .await;

            if let Some(index) = self.index.as_mut() {
                for outcome in outcomes.into_iter().flatten() {
                    index.apply(outcome);
                }
            }
        }

        self.index.as_ref()
    }
}
