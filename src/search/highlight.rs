use regex::RegexBuilder;

/// Wrap every case-insensitive occurrence of `query` in `<mark>` tags.
///
/// The query is matched literally. A blank query returns `text` unchanged.
pub fn highlight_text(text: &str, query: &str) -> String {
    if query.trim().is_empty() {
        return text.to_string();
    }
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern.replace_all(text, "<mark>$0</mark>").into_owned(),
        Err(error) => {
            tracing::debug!(error = %error, "Highlight pattern rejected");
            text.to_string()
        }
    }
}
