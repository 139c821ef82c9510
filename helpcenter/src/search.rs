use std::collections::HashSet;

use crate::aggregation::ContentIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub id: String,
    pub title: String,
    pub category_id: String,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchGroup {
    pub category_id: String,
    pub category_name: String,
    pub entries: Vec<SearchEntry>,
}

/// Every article reachable from the index, once per category, in category order.
pub fn search_entries(index: &ContentIndex) -> Vec<SearchEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for category in index.categories() {
        let sub_category_articles = index
            .detail(&category.id)
            .into_iter()
            .flat_map(|detail| &detail.sub_categories)
            .flat_map(|sub| index.sub_category_articles(&category.id, &sub.id));

        for article in index.articles(&category.id).iter().chain(sub_category_articles) {
            if !seen.insert((category.id.as_str(), article.id.as_str())) {
                continue;
            }
            entries.push(SearchEntry {
                id: article.id.clone(),
                title: article.title.clone(),
                category_id: category.id.clone(),
                category_name: category.name.clone(),
            });
        }
    }

    entries
}

/// Case-insensitive title match; an empty query keeps everything.
pub fn filter_entries<'a>(entries: &'a [SearchEntry], query: &str) -> Vec<&'a SearchEntry> {
    let query = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| query.is_empty() || entry.title.to_lowercase().contains(&query))
        .collect()
}

/// Groups matches by category, keeping category order and dropping empty groups.
pub fn search(index: &ContentIndex, query: &str) -> Vec<SearchGroup> {
    let entries = search_entries(index);
    let matches = filter_entries(&entries, query);

    index
        .categories()
        .iter()
        .filter_map(|category| {
            let entries: Vec<SearchEntry> = matches
                .iter()
                .filter(|entry| entry.category_id == category.id)
                .map(|entry| (*entry).clone())
                .collect();
            (!entries.is_empty()).then(|| SearchGroup {
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                entries,
            })
        })
        .collect()
}
