// src/news/clean.rs
//! Excerpt cleaning: bylines, ad copy, and links are stripped before
//! classification, and text is trimmed to a length band at a sentence
//! boundary so the bounded enhancer payload stays bounded.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

fn re_links() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn re_byline() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // "By Jane Doe," and "By JANE DOE and JOHN ROE -" lead-ins.
    RE.get_or_init(|| Regex::new(r"(?i)^by\s+[A-Z][\w.'-]+(\s+[A-Z][\w.'-]+){0,3}(\s+and\s+[A-Z][\w.'-]+(\s+[A-Z][\w.'-]+){0,3})?\s*[,:\u{2013}\u{2014}-]\s*").unwrap())
}

fn re_ad_copy() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(advertisement|sponsored content|subscribe (now|today)[^.]*|sign up for [^.]*newsletter[^.]*)\b\.?")
            .unwrap()
    })
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize raw feed/article text into clean prose.
pub fn clean_text(raw: &str) -> String {
    let mut out = html_escape::decode_html_entities(raw).to_string();
    out = re_tags().replace_all(&out, " ").to_string();
    out = re_links().replace_all(&out, "").to_string();
    out = re_ad_copy().replace_all(&out, " ").to_string();
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    out = re_ws().replace_all(&out, " ").trim().to_string();
    out = re_byline().replace(&out, "").to_string();
    out
}

/// Trim to at most `max_chars`, preferring the last sentence boundary and
/// never cutting mid-word. Short inputs pass through untouched.
pub fn trim_at_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();

    if let Some(pos) = head.rfind(['.', '!', '?']) {
        let cut = head[..=pos].trim_end().to_string();
        // A boundary in the first few chars is noise, not a sentence.
        if cut.chars().count() > max_chars / 4 {
            return cut;
        }
    }
    match head.rfind(' ') {
        Some(pos) => head[..pos].trim_end().to_string(),
        None => head,
    }
}
