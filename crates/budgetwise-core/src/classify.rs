//! Expense classification
//!
//! Turns a free-text expense description into a category. Classifiers are
//! pluggable: anything implementing [`Classifier`] can sit in front of the
//! import pipeline. [`KeywordClassifier`] is the always-available rule-based
//! one; [`ThresholdClassifier`] puts a confidence-gated primary classifier
//! (a trained model, say) in front of a fallback.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Category;

/// Confidence for a keyword rule hit
pub const KEYWORD_CONFIDENCE: f64 = 0.9;

/// Confidence for the catch-all `Other` label
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Default threshold below which a primary classifier's label is ignored
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// A predicted category with the classifier's confidence in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
}

impl Classification {
    pub fn new(category: Category, confidence: f64) -> Self {
        Self {
            category,
            confidence,
        }
    }
}

/// Anything that can label an expense description
///
/// `None` means "no opinion"; callers fall back to something else.
pub trait Classifier: Send + Sync {
    fn predict(&self, text: &str) -> Option<Classification>;

    /// Predict, treating "no opinion" as `Other`
    fn classify(&self, text: &str) -> Classification {
        self.predict(text)
            .unwrap_or_else(|| Classification::new(Category::Other, FALLBACK_CONFIDENCE))
    }
}

/// Built-in keyword rules, checked in order
const DEFAULT_RULES: &[(&[&str], Category)] = &[
    (&["coffee", "food", "restaurant", "dinner", "lunch"], Category::Food),
    (&["taxi", "bus", "train", "flight"], Category::Transport),
    (&["fuel", "gas station"], Category::GasFuel),
    (&["movie", "concert", "game", "ticket"], Category::Entertainment),
    (&["grocery", "supermarket", "milk", "bread"], Category::Groceries),
    (&["electricity", "water", "internet", "phone"], Category::Utilities),
    (&["clothing", "electronics", "store", "mall"], Category::Shopping),
];

struct KeywordRule {
    pattern: Regex,
    category: Category,
}

/// Rule-based classifier matching keywords anywhere in the text,
/// case-insensitively, so "movies" and "flights" hit "movie" and "flight"
///
/// Always returns a classification: a rule hit at 0.9 confidence, or `Other`
/// at 0.8 when nothing matches.
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new() -> Result<Self> {
        let rules: Vec<(Vec<&str>, Category)> = DEFAULT_RULES
            .iter()
            .map(|(words, category)| (words.to_vec(), category.clone()))
            .collect();
        Self::with_rules(&rules)
    }

    /// Build from custom `(keywords, category)` rules; earlier rules win
    pub fn with_rules<S: AsRef<str>>(rules: &[(Vec<S>, Category)]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (words, category) in rules {
            let alternatives: Vec<String> = words
                .iter()
                .map(|w| regex::escape(w.as_ref().trim()))
                .filter(|w| !w.is_empty())
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            let pattern = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;
            compiled.push(KeywordRule {
                pattern,
                category: category.clone(),
            });
        }
        Ok(Self { rules: compiled })
    }
}

impl Classifier for KeywordClassifier {
    fn predict(&self, text: &str) -> Option<Classification> {
        let hit = self.rules.iter().find(|rule| rule.pattern.is_match(text));
        Some(match hit {
            Some(rule) => Classification::new(rule.category.clone(), KEYWORD_CONFIDENCE),
            None => {
                warn!("No keyword rule matched {:?}, using Other", text);
                Classification::new(Category::Other, FALLBACK_CONFIDENCE)
            }
        })
    }
}

/// Primary classifier gated on confidence, with a fallback
///
/// The primary's label is used only when its confidence meets the
/// threshold. Anything else (low confidence, no prediction) goes to the
/// fallback.
pub struct ThresholdClassifier<P, F> {
    primary: P,
    fallback: F,
    threshold: f64,
}

impl<P: Classifier, F: Classifier> ThresholdClassifier<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self::with_threshold(primary, fallback, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn with_threshold(primary: P, fallback: F, threshold: f64) -> Self {
        Self {
            primary,
            fallback,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<P: Classifier, F: Classifier> Classifier for ThresholdClassifier<P, F> {
    fn predict(&self, text: &str) -> Option<Classification> {
        match self.primary.predict(text) {
            Some(c) if c.confidence >= self.threshold => Some(c),
            Some(c) => {
                debug!(
                    "Primary classifier confidence {:.2} below {:.2} for {:?}, falling back",
                    c.confidence, self.threshold, text
                );
                self.fallback.predict(text)
            }
            None => self.fallback.predict(text),
        }
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn predict(&self, text: &str) -> Option<Classification> {
        (**self).predict(text)
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn predict(&self, text: &str) -> Option<Classification> {
        (**self).predict(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classifier returning a fixed answer, for exercising fallbacks
    struct Fixed(Option<Classification>);

    impl Classifier for Fixed {
        fn predict(&self, _text: &str) -> Option<Classification> {
            self.0.clone()
        }
    }

    #[test]
    fn test_keyword_rules() {
        let c = KeywordClassifier::new().unwrap();
        let cases = [
            ("Morning coffee", Category::Food),
            ("Taxi to airport", Category::Transport),
            ("Shell gas station", Category::GasFuel),
            ("Concert tickets", Category::Entertainment),
            ("Movie night", Category::Entertainment),
            ("Weekly grocery run", Category::Groceries),
            ("Internet bill", Category::Utilities),
            ("New phone case from the mall", Category::Utilities),
            ("Electronics store", Category::Shopping),
        ];
        for (text, expected) in cases {
            assert_eq!(c.classify(text).category, expected, "text: {}", text);
        }
    }

    #[test]
    fn test_keyword_confidence() {
        let c = KeywordClassifier::new().unwrap();
        assert_eq!(c.classify("LUNCH with team").confidence, KEYWORD_CONFIDENCE);

        let other = c.classify("Birthday present");
        assert_eq!(other.category, Category::Other);
        assert_eq!(other.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_keyword_matches_inside_words() {
        let c = KeywordClassifier::new().unwrap();
        let cases = [
            ("Movies with friends", Category::Entertainment),
            ("Flights to Paris", Category::Transport),
            ("Weekend groceries at supermarkets", Category::Groceries),
            ("Dinners out", Category::Food),
            ("Bookstore", Category::Shopping),
        ];
        for (text, expected) in cases {
            assert_eq!(c.classify(text).category, expected, "text: {}", text);
        }
    }

    #[test]
    fn test_custom_rules() {
        let c = KeywordClassifier::with_rules(&[(vec!["vet", "kibble"], Category::from("Pets"))])
            .unwrap();
        assert_eq!(
            c.classify("Kibble refill").category,
            Category::Custom("Pets".into())
        );
        assert_eq!(c.classify("coffee").category, Category::Other);
    }

    #[test]
    fn test_threshold_accepts_confident_primary() {
        let primary = Fixed(Some(Classification::new(Category::Shopping, 0.95)));
        let c = ThresholdClassifier::new(primary, KeywordClassifier::new().unwrap());
        let result = c.classify("coffee");
        assert_eq!(result.category, Category::Shopping);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let primary = Fixed(Some(Classification::new(Category::Shopping, 0.7)));
        let c = ThresholdClassifier::new(primary, KeywordClassifier::new().unwrap());
        assert_eq!(c.classify("coffee").category, Category::Shopping);
    }

    #[test]
    fn test_threshold_falls_back_on_low_confidence() {
        let primary = Fixed(Some(Classification::new(Category::Shopping, 0.5)));
        let c = ThresholdClassifier::new(primary, KeywordClassifier::new().unwrap());
        let result = c.classify("coffee");
        assert_eq!(result.category, Category::Food);
        assert_eq!(result.confidence, KEYWORD_CONFIDENCE);
    }

    #[test]
    fn test_threshold_falls_back_on_no_prediction() {
        let c = ThresholdClassifier::new(Fixed(None), KeywordClassifier::new().unwrap());
        assert_eq!(c.classify("taxi").category, Category::Transport);
    }

    #[test]
    fn test_no_opinion_becomes_other() {
        let c = Fixed(None);
        let result = c.classify("anything");
        assert_eq!(result.category, Category::Other);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_boxed_classifier() {
        let c: Box<dyn Classifier> = Box::new(KeywordClassifier::new().unwrap());
        assert_eq!(c.classify("train ticket").category, Category::Transport);
    }
}
