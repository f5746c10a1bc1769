//! KB retriever/ranker. Scores published articles against ticket text and
//! the predicted category, returns the top five with generated snippets.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::kb::{Article, ArticleId, ArticleSource};
use crate::lexicon::Lexicon;
use crate::ticket::Category;

/// Maximum number of ranked articles returned.
pub const MAX_RESULTS: usize = 5;

/// Snippet budget in characters (before the ellipsis marker).
pub const SNIPPET_CHARS: usize = 250;

/// Normalization cap for turning raw relevance scores into the <0,1> boost
/// term used by confidence fusion. Tunable; fixed by test expectations.
pub const RELEVANCE_NORM_CAP: f32 = 25.0;

const EMPTY_BODY_SNIPPET: &str = "No content available.";

/// One retrieval hit: article identity plus relevance and a body preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedArticle {
    pub article_id: ArticleId,
    pub title: String,
    pub score: i32,
    pub snippet: String,
}

/// Rank the published corpus against the ticket. Read-only; the snapshot is
/// whatever `source` serves at call time.
pub fn retrieve(
    lexicon: &Lexicon,
    source: &dyn ArticleSource,
    title: &str,
    description: &str,
    category: Category,
) -> Result<Vec<RankedArticle>> {
    let search_text = format!("{} {}", title, description).to_lowercase();
    let search_words: Vec<&str> = search_text
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .collect();

    let articles = source.published()?;
    if articles.is_empty() {
        return Ok(Vec::new());
    }

    let mut ranked: Vec<RankedArticle> = articles
        .iter()
        .map(|article| RankedArticle {
            article_id: article.id,
            title: article.title.clone(),
            score: relevance_score(lexicon, &search_text, &search_words, article, category),
            snippet: make_snippet(&article.body),
        })
        .filter(|r| r.score > 0)
        .collect();

    // Stable sort: equal scores keep corpus enumeration order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(MAX_RESULTS);
    Ok(ranked)
}

/// Additive relevance heuristic:
/// +10 category tag, +5 per search word in the title, +2 per word-prefix
/// occurrence in the body, +4 per tag found in the ticket text, +3 per
/// category lexicon keyword found in the body.
fn relevance_score(
    lexicon: &Lexicon,
    search_text: &str,
    search_words: &[&str],
    article: &Article,
    category: Category,
) -> i32 {
    let title_lc = article.title.to_lowercase();
    let body_lc = article.body.to_lowercase();
    let tags_lc: Vec<String> = article.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut score = 0i32;

    // 1) Category/tag agreement (high weight)
    if tags_lc.iter().any(|t| t == category.as_str()) {
        score += 10;
    }

    // 2) Search words in the article title
    for word in search_words {
        if title_lc.contains(word) {
            score += 5;
        }
    }

    // 3) Word-prefix occurrences in the body
    for word in search_words {
        if let Ok(re) = Regex::new(&format!(r"\b{}\w*", regex::escape(word))) {
            score += re.find_iter(&body_lc).count() as i32 * 2;
        }
    }

    // 4) Article tags mentioned literally in the ticket
    for tag in &tags_lc {
        if !tag.is_empty() && search_text.contains(tag.as_str()) {
            score += 4;
        }
    }

    // 5) Category keyword presence in the body
    for m in lexicon.keywords_for(category) {
        if body_lc.contains(m.keyword()) {
            score += 3;
        }
    }

    score
}

/// Mean of per-article scores normalized by `RELEVANCE_NORM_CAP`, clamped
/// per article to 1.0. Zero for an empty slice.
pub fn normalized_mean_relevance(ranked: &[RankedArticle]) -> f32 {
    if ranked.is_empty() {
        return 0.0;
    }
    let sum: f32 = ranked
        .iter()
        .map(|r| (r.score as f32 / RELEVANCE_NORM_CAP).min(1.0))
        .sum();
    sum / ranked.len() as f32
}

/// Body preview: at most `SNIPPET_CHARS` characters, backing off to the last
/// space when the cut would split a word, with an ellipsis marker appended.
pub fn make_snippet(body: &str) -> String {
    if body.is_empty() {
        return EMPTY_BODY_SNIPPET.to_string();
    }
    let chars: Vec<char> = body.chars().collect();
    if chars.len() <= SNIPPET_CHARS {
        return body.to_string();
    }
    let truncated: String = chars[..SNIPPET_CHARS].iter().collect();
    match truncated.rfind(' ') {
        Some(pos) => format!("{}...", &truncated[..pos]),
        None => format!("{truncated}..."),
    }
}
