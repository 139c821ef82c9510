use regex::Regex;
use std::{collections::HashMap, sync::LazyLock};

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn rewrite(pattern: &str, replacement: &'static str) -> Rewrite {
    Rewrite {
        pattern: Regex::new(pattern).expect("Invalid markdown pattern"),
        replacement,
    }
}

// Order matters: code goes before emphasis, links before italics.
static MARKDOWN_REWRITES: LazyLock<Vec<Rewrite>> = LazyLock::new(|| {
    vec![
        rewrite(r"(?s)```.*?```", ""),
        rewrite(r"`[^`]*`", ""),
        rewrite(r"!\[([^\]]*)\]\([^)]*\)", ""),
        rewrite(r"\[([^\]]+)\]\([^)]+\)", "$1"),
        rewrite(r"(?m)^#{1,6}\s+(.+)$", "$1"),
        rewrite(r"\*\*([^*]+)\*\*", "$1"),
        rewrite(r"__([^_]+)__", "$1"),
        rewrite(r"\*([^*]+)\*", "$1"),
        rewrite(r"_([^_]+)_", "$1"),
        rewrite(r"~~([^~]+)~~", "$1"),
        rewrite(r"(?m)^>\s+(.+)$", "$1"),
        rewrite(r"(?m)^[-*_]{3,}$", ""),
        rewrite(r"(?m)^[ \t]*[-*+]\s+(.+)$", "$1"),
        rewrite(r"(?m)^[ \t]*\d+\.\s+(.+)$", "$1"),
        rewrite(r"\|", ""),
        rewrite(r"\n{3,}", "\n\n"),
        rewrite(r"[ \t]+", " "),
    ]
});

/// Plain-text rendition of markdown, used for article previews and summaries.
pub fn strip_markdown(text: &str) -> String {
    MARKDOWN_REWRITES
        .iter()
        .fold(text.to_string(), |acc, r| {
            r.pattern.replace_all(&acc, r.replacement).into_owned()
        })
        .trim()
        .to_string()
}

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Invalid slug regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid slug regex"));
static DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("Invalid slug regex"));

pub fn slugify(text: &str) -> String {
    let slug = text.to_lowercase();
    let slug = NON_SLUG.replace_all(&slug, "");
    let slug = WHITESPACE.replace_all(&slug, "-");
    let slug = DASHES.replace_all(&slug, "-");
    slug.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub id: String,
    pub text: String,
    pub level: u8,
}

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("Invalid heading regex"));

/// ATX headings of an article, skipping fenced code.
pub fn table_of_contents(markdown: &str) -> Vec<TocItem> {
    let mut items = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let Some(caps) = HEADING.captures(line) else {
            continue;
        };
        let text = strip_markdown(&caps[2]);
        let base = match slugify(&text) {
            slug if slug.is_empty() => format!("heading-{}", items.len()),
            slug => slug,
        };

        let count = seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;

        items.push(TocItem {
            id,
            text,
            level: caps[1].len() as u8,
        });
    }

    items
}
