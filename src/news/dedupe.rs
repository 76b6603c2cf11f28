// src/news/dedupe.rs
//! Tier-1 deduplication: deterministic token-set Jaccard similarity.
//! This tier is total and always runs; the optional semantic tier can only
//! refine its output, never replace the guarantee.

use std::collections::HashSet;

/// Two bullets are duplicates above this similarity.
pub const JACCARD_THRESHOLD: f64 = 0.8;

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for c in ch.to_lowercase() {
                out.push(c);
            }
            prev_space = false;
        } else if !prev_space && !out.is_empty() {
            out.push(' ');
            prev_space = true;
        }
    }
    out.trim_end().to_string()
}

fn token_set(text: &str) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Token-set Jaccard similarity. Identical normalized strings score 1.0,
/// disjoint token sets 0.0. Two empty sets are treated as identical.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let sa = token_set(a);
    let sb = token_set(b);
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.len() + sb.len() - intersection;
    if union == 0 {
        return 1.0;
    }
    intersection as f64 / union as f64
}

/// First-seen-wins dedup: a bullet is dropped when its similarity to any
/// kept bullet exceeds the threshold. Idempotent by construction.
pub fn simple_dedupe(bullets: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(bullets.len());
    let mut kept_sets: Vec<HashSet<String>> = Vec::with_capacity(bullets.len());

    for bullet in bullets {
        let set = token_set(bullet);
        let duplicate = kept_sets.iter().any(|existing| {
            if existing.is_empty() && set.is_empty() {
                return true;
            }
            let intersection = existing.intersection(&set).count();
            let union = existing.len() + set.len() - intersection;
            if union == 0 {
                return true;
            }
            intersection as f64 / union as f64 > JACCARD_THRESHOLD
        });
        if !duplicate {
            kept.push(bullet.clone());
            kept_sets.push(set);
        }
    }
    kept
}
