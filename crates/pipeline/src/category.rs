//! Topic category
//!
//! Keyword rules, first match wins. Best effort only: the category is a label
//! for display and is not part of the cache key.

use research_agent_core::Category;

const RULES: &[(Category, &[&str])] = &[
    (
        Category::Nutrition,
        &["coffee", "caffeine", "diet", "food", "nutrition", "vitamin", "protein", "sugar", "eating"],
    ),
    (Category::Sleep, &["sleep", "sleeping", "insomnia", "nap", "melatonin"]),
    (
        Category::Psychology,
        &["depression", "anxiety", "stress", "psychology", "meditation", "mindfulness"],
    ),
    (
        Category::Sports,
        &["sport", "sports", "exercise", "running", "fitness", "workout"],
    ),
    (
        Category::Technology,
        &["artificial intelligence", "ai", "technology", "computer", "screen", "smartphone"],
    ),
    (
        Category::Environment,
        &["climate", "environment", "pollution", "emissions"],
    ),
    (Category::Education, &["education", "learning", "school", "students"]),
];

/// Classify a question; `Health` when nothing matches
pub fn detect_category(question: &str) -> Category {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    RULES
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|kw| {
                if kw.contains(' ') {
                    lowered.contains(kw)
                } else {
                    words.contains(kw)
                }
            })
        })
        .map(|(category, _)| *category)
        .unwrap_or_default()
}
