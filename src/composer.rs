//! Draft reply composer. Deterministic template over the ticket title,
//! predicted category, and ranked articles; no randomness, no I/O.

use serde::{Deserialize, Serialize};

use crate::kb::ArticleId;
use crate::retrieval::RankedArticle;
use crate::ticket::Category;

/// How many articles are quoted inline (and cited).
pub const MAX_QUOTED_ARTICLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub citation_ids: Vec<ArticleId>,
}

fn category_opening(category: Category) -> &'static str {
    match category {
        Category::Billing => "I can help you with your billing inquiry.",
        Category::Tech => "I can assist you with your technical issue.",
        Category::Shipping => "I can help you with your shipping question.",
        Category::Other => "I'm here to help with your request.",
    }
}

/// Render the templated reply. Citations are the ids of the articles
/// actually quoted (at most three; empty when nothing was retrieved).
pub fn compose(title: &str, articles: &[RankedArticle], category: Category) -> Draft {
    let quoted = &articles[..articles.len().min(MAX_QUOTED_ARTICLES)];
    let citation_ids: Vec<ArticleId> = quoted.iter().map(|a| a.article_id).collect();

    let mut reply = format!("Thank you for contacting support regarding \"{title}\". ");
    reply.push_str(category_opening(category));
    reply.push_str("\n\n");

    if articles.is_empty() {
        reply.push_str(
            "I understand you're experiencing an issue. Our support team will review \
             your request and provide personalized assistance shortly.\n\n",
        );
    } else {
        reply.push_str(
            "Based on your description, I found some relevant information that should help:\n\n",
        );
        for (index, article) in quoted.iter().enumerate() {
            reply.push_str(&format!("**{}. {}**\n", index + 1, article.title));
            reply.push_str(&article.snippet);
            reply.push_str("\n\n");
        }
        if articles.len() > MAX_QUOTED_ARTICLES {
            reply.push_str(&format!(
                "I also found {} additional resources that might be helpful.\n\n",
                articles.len() - MAX_QUOTED_ARTICLES
            ));
        }
        reply.push_str(
            "Please review these solutions. If they resolve your issue, you can close \
             this ticket. Otherwise, our support team will provide additional assistance.\n\n",
        );
    }

    reply.push_str("If you need immediate assistance, please don't hesitate to reply with more details.\n\n");
    reply.push_str("Best regards,\nAI Support Assistant");

    Draft {
        text: reply,
        citation_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(title: &str, score: i32) -> RankedArticle {
        RankedArticle {
            article_id: ArticleId::generate(),
            title: title.to_string(),
            score,
            snippet: format!("{title} snippet"),
        }
    }

    #[test]
    fn empty_corpus_gives_generic_draft() {
        let d = compose("Broken page", &[], Category::Tech);
        assert!(d.citation_ids.is_empty());
        assert!(d.text.contains("Our support team will review your request"));
        assert!(d.text.contains("\"Broken page\""));
        assert!(d.text.contains("technical issue"));
        assert!(d.text.ends_with("Best regards,\nAI Support Assistant"));
    }

    #[test]
    fn quotes_at_most_three_and_cites_them() {
        let articles: Vec<RankedArticle> =
            (0..5).map(|i| ranked(&format!("A{i}"), 20 - i)).collect();
        let d = compose("Late delivery", &articles, Category::Shipping);

        assert_eq!(d.citation_ids.len(), 3);
        assert_eq!(d.citation_ids[0], articles[0].article_id);
        assert!(d.text.contains("**1. A0**"));
        assert!(d.text.contains("**3. A2**"));
        assert!(!d.text.contains("**4."));
        assert!(d.text.contains("2 additional resources"));
        assert!(d.text.contains("shipping question"));
    }

    #[test]
    fn no_additional_note_for_three_or_fewer() {
        let articles = vec![ranked("Only one", 9)];
        let d = compose("Refund", &articles, Category::Billing);
        assert_eq!(d.citation_ids.len(), 1);
        assert!(!d.text.contains("additional resources"));
        assert!(d.text.contains("Only one snippet"));
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let articles = vec![ranked("Stable", 7)];
        let a = compose("Same ticket", &articles, Category::Other);
        let b = compose("Same ticket", &articles, Category::Other);
        assert_eq!(a, b);
    }
}
