//! Markdown export of a conversation transcript.

use crate::models::ConversationDetail;

const MAX_FILE_STEM: usize = 80;

/// Render a conversation as a markdown document.
///
/// Blank messages are skipped. Each remaining message becomes a `## Role` section,
/// with the author name in parentheses when present.
pub fn to_markdown(detail: &ConversationDetail) -> String {
    let created = detail
        .create_time
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut out = format!("# {}\n\n", detail.title);
    out.push_str(&format!("**Model:** {} · **Created:** {}\n", detail.model_label(), created));

    for message in detail.visible_messages() {
        out.push_str("\n---\n\n## ");
        out.push_str(&message.role_label());
        if let Some(name) = message.name.as_deref().filter(|n| !n.is_empty()) {
            out.push_str(&format!(" ({})", name));
        }
        out.push_str("\n\n");
        out.push_str(message.content.trim_end());
        out.push('\n');
    }

    out
}

/// A filesystem-safe `.md` file name derived from the title (falls back to the id).
pub fn file_name(detail: &ConversationDetail) -> String {
    let mut slug = String::new();
    for c in detail.title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(MAX_FILE_STEM).collect();
    let stem = slug.trim_end_matches('-');

    if stem.is_empty() { format!("{}.md", detail.id) } else { format!("{}.md", stem) }
}
