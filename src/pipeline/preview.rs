//! Preview rendering for the markup fragment returned by the service.
//!
//! The service returns a small HTML fragment (`<p>`, `<strong>`, `<em>`,
//! `<u>`). The session stores it untouched. This module offers two
//! deterministic passes over it:
//!
//! - [`sanitize`]: opt-in removal of active content (`<script>`/`<style>`
//!   blocks, `on*=` handlers, `javascript:` URLs). Off by default.
//! - [`to_plain_text`]: terminal rendering: block ends become line breaks,
//!   remaining tags are dropped, and common entities are decoded.

use once_cell::sync::Lazy;
use regex::Regex;

/// Markup ready for display, applying [`sanitize`] only when asked to.
pub fn prepare(markup: &str, sanitize_markup: bool) -> String {
    if sanitize_markup {
        sanitize(markup)
    } else {
        markup.to_string()
    }
}

// ── Sanitising ───────────────────────────────────────────────────────────────

static RE_ACTIVE_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});

static RE_EVENT_ATTRS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());

static RE_JS_URLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src)\s*=\s*("\s*javascript:[^"]*"|'\s*javascript:[^']*')"#).unwrap()
});

/// Strip script-capable constructs from a markup fragment.
pub fn sanitize(markup: &str) -> String {
    let s = RE_ACTIVE_BLOCKS.replace_all(markup, "");
    let s = RE_EVENT_ATTRS.replace_all(&s, "");
    RE_JS_URLS.replace_all(&s, r##"$1="#""##).into_owned()
}

// ── Plain-text rendering ─────────────────────────────────────────────────────

static RE_BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</p\s*>|<br\s*/?>|</h[1-6]\s*>|</li\s*>|</div\s*>|</tr\s*>").unwrap()
});

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Render a markup fragment as plain text, one block per line.
pub fn to_plain_text(markup: &str) -> String {
    let s = sanitize(markup);
    let s = RE_BLOCK_END.replace_all(&s, "\n");
    let s = RE_TAG.replace_all(&s, "");
    let s = decode_entities(&s);
    let s: Vec<&str> = s.lines().map(str::trim_end).collect();
    let s = RE_BLANK_RUNS.replace_all(&s.join("\n"), "\n\n").into_owned();
    s.trim().to_string()
}

fn decode_entities(input: &str) -> String {
    // `&amp;` last so `&amp;lt;` stays `&lt;`.
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
