//! Prompt template rendering: substitutes article placeholders into a
//! `PromptTemplate`'s `user_prompt_template`, and enforces the mandated
//! AI-disclosure prefix on generated output.
//!
//! Uses plain, allocation-light string handling (`String::replace` chains,
//! `format!`) rather than pulling in a templating crate for what is a
//! closed, small placeholder set.

use std::collections::HashMap;

use crate::domain::WorkRecord;

/// Maximum length of a rendered article excerpt placeholder, in characters.
const EXCERPT_MAX_CHARS: usize = 280;

/// Maximum length of a generated comment, in characters.
const MAX_COMMENT_CHARS: usize = 2000;

/// Recognized placeholder tokens, in `{name}` form.
const PLACEHOLDERS: &[&str] = &[
    "article_title",
    "article_author",
    "article_content",
    "article_excerpt",
    "article_category",
    "current_date",
    "user_nickname",
];

/// Build the placeholder → value map for one `WorkRecord`.
///
/// Unknown placeholders are left untouched by [`render`]; values absent for
/// this record (e.g. no author) render as an empty string, per spec.
fn placeholder_values(record: &WorkRecord, user_nickname: Option<&str>) -> HashMap<&'static str, String> {
    let mut values = HashMap::with_capacity(PLACEHOLDERS.len());
    values.insert("article_title", record.article_title.clone());
    values.insert(
        "article_author",
        record.article_author.clone().unwrap_or_default(),
    );
    let content = record.article_content.clone().unwrap_or_default();
    values.insert("article_excerpt", excerpt(&content));
    values.insert("article_content", content);
    values.insert(
        "article_category",
        record.article_category.clone().unwrap_or_default(),
    );
    values.insert(
        "current_date",
        chrono::Utc::now().format("%Y-%m-%d").to_string(),
    );
    values.insert("user_nickname", user_nickname.unwrap_or_default().to_string());
    values
}

/// Truncate `content` to a bounded excerpt, breaking on a char boundary.
fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_MAX_CHARS {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(EXCERPT_MAX_CHARS).collect();
    truncated.push('…');
    truncated
}

/// Render `template` by substituting `{placeholder}` tokens with values
/// drawn from `record`. Placeholders not in [`PLACEHOLDERS`] are left
/// literal in the output.
pub fn render(template: &str, record: &WorkRecord, user_nickname: Option<&str>) -> String {
    let values = placeholder_values(record, user_nickname);
    let mut rendered = template.to_string();
    for name in PLACEHOLDERS {
        let value = values.get(name).map(String::as_str).unwrap_or("");
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

/// Ensure generated `text` begins with `prefix`, prepending it if missing.
///
/// The model is instructed to produce the prefix itself, but the output
/// is validated post-hoc rather than trusted.
pub fn ensure_disclosure_prefix(text: &str, prefix: &str) -> String {
    if text.starts_with(prefix) {
        text.to_string()
    } else {
        format!("{prefix} {text}")
    }
}

/// Whether a freshly generated comment is non-empty and within
/// [`MAX_COMMENT_CHARS`]. Checked before a model completion is persisted.
pub fn is_valid_comment_length(text: &str) -> bool {
    let len = text.trim().chars().count();
    len > 0 && len <= MAX_COMMENT_CHARS
}

/// Validate that a template string contains the AI-disclosure prefix
/// token. Called at template creation/update time by the API
/// collaborator, not by the generation worker (which validates the
/// model's *output*, not the template).
pub fn template_contains_disclosure_token(template: &str, prefix: &str) -> bool {
    template.contains(prefix)
}
