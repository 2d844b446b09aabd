use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("valid regex"));

/// Clean blog HTML with ammonia's whitelist: safe formatting tags are kept,
/// `<script>`, `<iframe>` and event-handler attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Strip every tag, keeping only the text. Used for comments.
pub fn strip_html(input: &str) -> String {
    ammonia::Builder::empty().clean(input).to_string()
}

/// Turns a title into a URL slug: lowercase ASCII words joined by hyphens.
/// Falls back to "blog" when nothing usable remains.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(&lowered, "");
    let joined = SLUG_SEPARATORS.replace_all(kept.trim(), "-");
    let slug = joined.trim_matches('-').to_string();

    if slug.is_empty() {
        "blog".to_string()
    } else {
        slug
    }
}

/// Slug candidate for the n-th collision (`n >= 2`).
pub fn numbered_slug(base: &str, n: u32) -> String {
    format!("{}-{}", base, n)
}

/// Escapes backslash, `%` and `_` so user input matches literally inside an
/// ILIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
