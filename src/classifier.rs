//! Ticket classifier. Pure logic that maps `(title, description, prior
//! category)` → `Classification`; no I/O, suitable for unit tests and
//! offline evaluation.
//!
//! Policy: weighted keyword scoring per category picks the winner;
//! confidence blends score intensity, keyword diversity, and agreement
//! bonuses, capped at 0.95.

use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;
use crate::ticket::Category;

/// Hard ceiling for any fused or boosted confidence.
pub const CONFIDENCE_CEILING: f32 = 0.95;

/// Confidence reported when no keyword matches at all.
pub const NO_MATCH_CONFIDENCE: f32 = 0.1;

/// Classification result with explainability payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub predicted_category: Category,
    /// Confidence in <0.0, 0.95>, rounded to two decimals.
    pub confidence: f32,
    /// One human-readable line per category with at least one keyword hit.
    pub reasons: Vec<String>,
    /// Per-category totals in lexicon declaration order.
    pub scores: Vec<(Category, i32)>,
}

struct CategoryMatch {
    category: Category,
    score: i32,
    matched: Vec<String>,
    total_keywords: usize,
}

/// Score ticket text against the lexicon and pick a category.
///
/// `prior` is the ticket's user-supplied category; it is the fallback when
/// nothing matches and earns an agreement bonus when the prediction
/// confirms it.
pub fn classify(lexicon: &Lexicon, title: &str, description: &str, prior: Category) -> Classification {
    let text = format!("{} {}", title, description).to_lowercase();
    let title_lc = title.to_lowercase();

    let mut matches: Vec<CategoryMatch> = Vec::with_capacity(lexicon.categories().len());
    let mut reasons = Vec::new();

    for cat in lexicon.categories() {
        let mut score = 0i32;
        let mut matched = Vec::new();

        for m in cat.matchers() {
            let hits = m.weighted_hits(&text);
            if hits == 0 {
                continue;
            }
            score += hits as i32;
            matched.push(m.keyword().to_string());
            // Flat bonus when the keyword also shows up in the title alone.
            if title_lc.contains(m.keyword()) {
                score += 3;
            }
        }

        if !matched.is_empty() {
            let shown: Vec<&str> = matched.iter().take(5).map(|s| s.as_str()).collect();
            reasons.push(format!(
                "Contains {} keywords: {}",
                cat.category(),
                shown.join(", ")
            ));
        }

        matches.push(CategoryMatch {
            category: cat.category(),
            score,
            matched,
            total_keywords: cat.len(),
        });
    }

    let scores: Vec<(Category, i32)> = matches.iter().map(|m| (m.category, m.score)).collect();

    // Strictly-greater comparison keeps the first maximum: ties resolve to
    // lexicon declaration order.
    let mut best: Option<&CategoryMatch> = None;
    for m in &matches {
        if best.map_or(true, |b| m.score > b.score) {
            best = Some(m);
        }
    }

    let Some(best) = best.filter(|m| m.score > 0) else {
        // Nothing matched anywhere: fall back to the user's own category.
        return Classification {
            predicted_category: prior,
            confidence: NO_MATCH_CONFIDENCE,
            reasons,
            scores,
        };
    };

    let predicted = best.category;

    // Base confidence: intensity + diversity + many-matches bonus.
    let intensity = (best.score as f32 / 10.0).min(1.0);
    let diversity = best.matched.len() as f32 / best.total_keywords.max(1) as f32;
    let many_bonus = if best.matched.len() > 3 { 0.1 } else { 0.0 };
    let mut confidence =
        (0.2 + intensity * 0.4 + diversity * 0.3 + many_bonus).min(CONFIDENCE_CEILING);

    // Agreement bonus: the user already filed it under the predicted category.
    if prior == predicted {
        confidence = (confidence * 1.2).min(CONFIDENCE_CEILING);
    }

    // Title-overlap bonus: any title word shares a substring with any
    // predicted-category keyword, in either direction.
    let title_overlap = title_lc.split_whitespace().any(|word| {
        lexicon
            .keywords_for(predicted)
            .iter()
            .any(|m| word.contains(m.keyword()) || m.keyword().contains(word))
    });
    if title_overlap {
        confidence = (confidence * 1.15).min(CONFIDENCE_CEILING);
    }

    Classification {
        predicted_category: predicted,
        confidence: round2(confidence),
        reasons,
        scores,
    }
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> std::sync::Arc<Lexicon> {
        Lexicon::builtin()
    }

    #[test]
    fn refund_ticket_classifies_as_billing() {
        let c = classify(
            &lex(),
            "Refund for double charge",
            "I was charged twice for my subscription, please refund",
            Category::Other,
        );
        assert_eq!(c.predicted_category, Category::Billing);
        assert!(c.confidence > 0.5, "confidence {} should exceed 0.5", c.confidence);
        assert!(c
            .reasons
            .iter()
            .any(|r| r.starts_with("Contains billing keywords:")));
    }

    #[test]
    fn zero_match_falls_back_to_prior_with_fixed_confidence() {
        let c = classify(&lex(), "Hello", "Just wanted to say thanks", Category::Shipping);
        assert_eq!(c.predicted_category, Category::Shipping);
        assert_eq!(c.confidence, NO_MATCH_CONFIDENCE);
        assert!(c.reasons.is_empty());
        assert!(c.scores.iter().all(|(_, s)| *s == 0));
    }

    #[test]
    fn confidence_never_exceeds_ceiling() {
        // Keyword-stuffed text pushes every term to its maximum.
        let desc = "payment charge refund invoice bill credit debit subscription \
                    plan upgrade cancel money cost price fee transaction receipt \
                    statement billing account card paypal bank dispute balance";
        let c = classify(&lex(), "billing payment refund charge", desc, Category::Billing);
        assert_eq!(c.predicted_category, Category::Billing);
        assert!(c.confidence <= CONFIDENCE_CEILING);
    }

    #[test]
    fn agreement_with_prior_raises_confidence() {
        let title = "Refund for double charge";
        let desc = "I was charged twice for my subscription, please refund";
        let neutral = classify(&lex(), title, desc, Category::Other);
        let agreeing = classify(&lex(), title, desc, Category::Billing);
        assert!(agreeing.confidence > neutral.confidence);
    }

    #[test]
    fn reasons_list_at_most_five_keywords() {
        let desc = "payment charge refund invoice bill credit debit subscription";
        let c = classify(&lex(), "billing question", desc, Category::Billing);
        let billing_reason = c
            .reasons
            .iter()
            .find(|r| r.starts_with("Contains billing keywords:"))
            .expect("billing reason present");
        let listed = billing_reason.split(':').nth(1).unwrap();
        assert!(listed.split(',').count() <= 5, "reason lists too many: {billing_reason}");
    }

    #[test]
    fn tie_breaks_to_declaration_order() {
        // A lexicon where two categories score identically on the same word.
        let lex = Lexicon::from_json_str(
            r#"[
                {"category": "tech", "keywords": ["widget"]},
                {"category": "shipping", "keywords": ["widget"]}
            ]"#,
        )
        .unwrap();
        let c = classify(&lex, "widget", "widget", Category::Other);
        assert_eq!(c.predicted_category, Category::Tech);
    }

    #[test]
    fn confidence_is_two_decimals() {
        let c = classify(
            &lex(),
            "Refund for double charge",
            "I was charged twice for my subscription, please refund",
            Category::Other,
        );
        let scaled = c.confidence * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-4);
    }
}
