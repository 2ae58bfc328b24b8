//! Catalog & Classifier: what messages say, and which ones break the law
//!
//! The catalog is a fixed table of candidate texts per category. The
//! classifier is a pure keyword matcher that marks a handful of texts as
//! escalatable and attaches the law they break:
//!
//! ```text
//! text ──lowercase──▶ rule 1 "fix alt"          → Disability Act
//!                     rule 2 "input validation" → Laws of Tort
//!                     rule 3 "user login"       → Bankruptcy Court
//!                     rule 4 "secure database"  → Laws of Tort
//!                     (no match)                → not escalatable
//! ```
//!
//! First match wins. The same function runs when arrivals are fabricated
//! and when records loaded from the store are missing their violation.

use crate::message::{Category, Message};
use rand::Rng;
use serde::{Deserialize, Serialize};

const BOSS_TEXTS: &[&str] = &[
    "Are you done with sprint 1?",
    "Status on the release notes?",
    "Fix the title colour to Red",
];

const FAMILY_TEXTS: &[&str] = &[
    "Can you pick up the kids after work?",
    "Don't forget to call your mother",
];

const AGILE_TEXTS: &[&str] = &[
    "Fix alt in img1",
    "Fix input validation",
    "Refactor the login form spacing",
    "Fix User login",
    "Fix Secure Database",
];

/// A keyword rule that makes a message escalatable
#[derive(Debug, Clone, Copy)]
pub struct EscalationRule {
    /// Lowercase substring to look for
    pub needle: &'static str,
    pub law: &'static str,
    pub reason: &'static str,
}

/// Ordered rule table; first match wins.
pub const RULES: &[EscalationRule] = &[
    EscalationRule {
        needle: "fix alt",
        law: "Disability Act",
        reason: "Missing alt text impacts accessibility",
    },
    EscalationRule {
        needle: "input validation",
        law: "Laws of Tort",
        reason: "Known input validation flaw led to breach",
    },
    EscalationRule {
        needle: "user login",
        law: "Bankruptcy Court",
        reason: "Declared bankruptcy: critical login broken — no users, no revenue",
    },
    EscalationRule {
        needle: "secure database",
        law: "Laws of Tort",
        reason: "You got hacked: insecure database led to damages",
    },
];

/// Result of classifying a message text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Escalatable { law_broken: String, reason: String },
    Benign,
}

impl Classification {
    pub fn is_escalatable(&self) -> bool {
        matches!(self, Self::Escalatable { .. })
    }
}

/// Candidate texts for a category
pub fn candidates(category: Category) -> &'static [&'static str] {
    match category {
        Category::Boss => BOSS_TEXTS,
        Category::Family => FAMILY_TEXTS,
        Category::Agile => AGILE_TEXTS,
    }
}

/// Uniformly pick a category.
pub fn random_category<R: Rng + ?Sized>(rng: &mut R) -> Category {
    Category::ALL[rng.gen_range(0..Category::ALL.len())]
}

/// Uniformly pick one of the category's candidate texts.
pub fn pick<R: Rng + ?Sized>(rng: &mut R, category: Category) -> &'static str {
    let texts = candidates(category);
    texts[rng.gen_range(0..texts.len())]
}

/// Classify a text against the rule table.
pub fn classify(text: &str) -> Classification {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| lower.contains(rule.needle))
        .map(|rule| Classification::Escalatable {
            law_broken: rule.law.to_string(),
            reason: rule.reason.to_string(),
        })
        .unwrap_or(Classification::Benign)
}

/// Re-derive a missing violation for an escalatable record.
///
/// Empty strings count as missing. Non-escalatable records are left alone
/// so they never acquire a violation. Returns true if anything changed.
pub fn backfill(message: &mut Message) -> bool {
    if !message.escalatable {
        return false;
    }
    let has_law = message
        .law_broken
        .as_deref()
        .is_some_and(|law| !law.is_empty());
    if has_law {
        return false;
    }

    match classify(&message.text) {
        Classification::Escalatable { law_broken, reason } => {
            message.law_broken = Some(law_broken);
            message.reason = Some(reason);
            true
        }
        Classification::Benign => false,
    }
}
