//! Token Estimation and Content Trimming
//!
//! Search pages arrive as arbitrarily large markdown. Before they reach a
//! prompt they are bounded twice: a per-page character cap, then a token
//! budget over the assembled bundle. Estimation is character-based
//! (4 chars ≈ 1 token), which overshoots slightly on prose - the safe
//! direction for context limits.

use crate::constants::tokens;

/// Estimate token count for a string (4 chars ≈ 1 token)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Cap one page's markdown at `max_chars`, cutting on a char boundary.
pub fn trim_content(content: &str, max_chars: usize) -> &str {
    if content.len() <= max_chars {
        return content;
    }
    let mut end = max_chars;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Trim `text` until it fits within `budget_tokens`, removing at least
/// [`tokens::MIN_TRIM_CHUNK`] characters per step so pathological inputs
/// terminate quickly.
pub fn trim_to_token_budget(text: &str, budget_tokens: usize) -> String {
    let mut current = text.to_string();

    while estimate_tokens(&current) > budget_tokens && !current.is_empty() {
        let over_tokens = estimate_tokens(&current) - budget_tokens;
        let cut = (over_tokens * 4).max(tokens::MIN_TRIM_CHUNK).min(current.len());
        let mut end = current.len() - cut;
        while end > 0 && !current.is_char_boundary(end) {
            end -= 1;
        }
        current.truncate(end);
    }

    current
}

/// Check whether `text` fits within `budget_tokens`
pub fn fits_budget(text: &str, budget_tokens: usize) -> bool {
    estimate_tokens(text) <= budget_tokens
}
