//! Differential analyzer: compares a baseline response against a probe response
//! and produces the list of `Reason`s explaining any divergence.
//!
//! Grounded on the teacher's `wildcard.rs` (`once_cell::Lazy<Regex>` HTML-tag
//! counting, the `TITLE_REGEX`/`HTML_TAG_REGEX` idiom), repurposed from a
//! many-sample wildcard *profile* into an exact one-baseline-vs-one-probe
//! *comparison* — this analyzer's job is narrower than the teacher's, so the
//! fuzzy-match scoring and `sha2` hashing it used are not carried forward.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::canary::Canary;
use crate::executor::ExecutedResponse;
use crate::request::BaselineResponse;
use crate::surface::{Reason, ReasonKind, SurfaceTag};

static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?\w+[^>]*>").unwrap());

/// Normalizes a `Content-Type` value for comparison: lowercase, trimmed, and with
/// its parameters (e.g. `charset=utf-8`) sorted so that parameter reordering
/// alone never produces a spurious `diff_content_type` (§9 open question).
fn normalize_content_type(raw: &str) -> String {
    let mut segments: Vec<String> = raw
        .split(';')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return String::new();
    }
    let media_type = segments.remove(0);
    segments.sort();
    let mut out = media_type;
    for seg in segments {
        out.push(';');
        out.push_str(&seg);
    }
    out
}

/// True if `haystack[pos..]` (the byte offset where a literal match started) is
/// preceded by `https?://` or a bare `//`, i.e. the canary is embedded inside an
/// absolute or protocol-relative URL rather than genuinely reflected.
///
/// Policy resolved in SPEC_FULL.md §9: both prefixes are excluded.
fn preceded_by_url_prefix(haystack: &str, pos: usize) -> bool {
    let before = &haystack[..pos];
    // Look back far enough to catch "https://" (8 chars) plus a little slack.
    let window_start = before.len().saturating_sub(16);
    let mut window_start = window_start;
    while window_start > 0 && !before.is_char_boundary(window_start) {
        window_start -= 1;
    }
    let window = &before[window_start..];
    window.ends_with("http://") || window.ends_with("https://") || window.ends_with("//")
}

/// Counts occurrences of `needle` in `haystack`, excluding ones immediately
/// preceded by an absolute or protocol-relative URL prefix.
fn count_reflections_excluding_urls(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut start = 0;
    while let Some(found) = haystack[start..].find(needle) {
        let pos = start + found;
        if !preceded_by_url_prefix(haystack, pos) {
            count += 1;
        }
        start = pos + needle.len();
    }
    count
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

pub fn html_tag_count(body: &str) -> usize {
    HTML_TAG_REGEX.find_iter(body).count()
}

/// Which literal-match policy to use for a given surface's reflection check:
/// URL/body surfaces exclude URL-embedded occurrences; header/cookie surfaces
/// count every literal occurrence in headers (servers rarely emit canary-shaped
/// absolute URLs inside headers, and the spec scopes the URL-prefix exclusion to
/// "URL/body params" specifically).
fn reflection_reason_kind(surface: SurfaceTag) -> ReasonKind {
    match surface {
        SurfaceTag::Header => ReasonKind::HeaderValueReflection,
        SurfaceTag::Cookie => ReasonKind::CookieValueReflection,
        SurfaceTag::Url | SurfaceTag::BodyForm | SurfaceTag::BodyJson => ReasonKind::ParamValueReflection,
    }
}

/// Computes the list of reasons explaining any divergence between `baseline` and
/// `probe`. An empty list means DISCARD upstream (spec §4.2).
///
/// `baseline_tag_count` is the baseline body's HTML tag count computed once
/// after the baseline fetch (`RequestInfo::baseline_html_tag_count`) — passed
/// in rather than recomputed here, since this runs once per probed chunk.
pub fn analyze(
    baseline: &BaselineResponse,
    baseline_tag_count: usize,
    probe: &ExecutedResponse,
    canary: &Canary,
    surface: SurfaceTag,
) -> Vec<Reason> {
    let mut reasons = Vec::new();

    if baseline.status != probe.status {
        reasons.push(Reason::new(
            ReasonKind::DiffStatusCode,
            format!("{} ({})", probe.status, baseline.status),
        ));
    }

    let baseline_ct = baseline.content_type.as_deref().unwrap_or("");
    let probe_ct = probe.content_type.as_deref().unwrap_or("");
    if normalize_content_type(baseline_ct) != normalize_content_type(probe_ct) {
        reasons.push(Reason::new(
            ReasonKind::DiffContentType,
            format!("{probe_ct} ({baseline_ct})"),
        ));
    }

    let baseline_is_html = baseline.is_html();
    if !baseline_is_html {
        if baseline.content_length != probe.content_length {
            reasons.push(Reason::new(
                ReasonKind::DiffContentLength,
                format!(
                    "{} ({})",
                    probe.content_length.map(|v| v.to_string()).unwrap_or_else(|| "?".into()),
                    baseline.content_length.map(|v| v.to_string()).unwrap_or_else(|| "?".into())
                ),
            ));
        }
    } else {
        let probe_tags = html_tag_count(&probe.body);
        if baseline_tag_count != probe_tags {
            reasons.push(Reason::new(
                ReasonKind::DiffHtmlTagsCount,
                format!("{probe_tags} ({baseline_tag_count})"),
            ));
        }
    }

    let reflection_kind = reflection_reason_kind(surface);
    let (probe_count, baseline_count) = match surface {
        SurfaceTag::Header => (
            count_occurrences(&probe.raw_with_headers(), &canary.base_value),
            count_occurrences(&baseline.raw_with_headers(), &canary.base_value),
        ),
        SurfaceTag::Cookie => (
            count_occurrences(&probe.raw_with_headers(), &canary.base_value),
            count_occurrences(&baseline.raw_with_headers(), &canary.base_value),
        ),
        SurfaceTag::Url | SurfaceTag::BodyForm | SurfaceTag::BodyJson => (
            count_reflections_excluding_urls(&probe.body, &canary.base_value),
            count_reflections_excluding_urls(&baseline.body, &canary.base_value),
        ),
    };
    if probe_count != baseline_count {
        reasons.push(Reason::new(
            reflection_kind,
            format!("{probe_count} ({baseline_count})"),
        ));
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn baseline(status: u16, body: &str, content_type: Option<&str>) -> BaselineResponse {
        BaselineResponse {
            status,
            headers: vec![],
            content_type: content_type.map(|s| s.to_string()),
            content_length: Some(body.len() as u64),
            body: body.to_string(),
        }
    }

    fn probe(status: u16, body: &str, content_type: Option<&str>) -> ExecutedResponse {
        ExecutedResponse {
            status,
            headers: vec![],
            content_type: content_type.map(|s| s.to_string()),
            content_length: Some(body.len() as u64),
            body: body.to_string(),
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn identical_responses_yield_no_reasons() {
        let b = baseline(200, "hello", Some("text/plain"));
        let p = probe(200, "hello", Some("text/plain"));
        let canary = Canary::generate();
        let reasons = analyze(&b, b.html_tag_count(), &p, &canary, SurfaceTag::Url);
        assert!(reasons.is_empty());
    }

    #[test]
    fn url_reflection_is_detected() {
        let b = baseline(200, "hello", Some("text/plain"));
        let canary = Canary::generate();
        let body = format!("hello {}", canary.base_value);
        let p = probe(200, &body, Some("text/plain"));
        let reasons = analyze(&b, b.html_tag_count(), &p, &canary, SurfaceTag::Url);
        assert!(reasons.iter().any(|r| r.kind == ReasonKind::ParamValueReflection));
    }

    #[test]
    fn url_embedded_canary_is_not_a_reflection() {
        let b = baseline(200, "hello", Some("text/plain"));
        let canary = Canary::generate();
        let body = format!("see https://example.com/{} for details", canary.base_value);
        let p = probe(200, &body, Some("text/plain"));
        let reasons = analyze(&b, b.html_tag_count(), &p, &canary, SurfaceTag::Url);
        assert!(!reasons.iter().any(|r| r.kind == ReasonKind::ParamValueReflection));
    }

    #[test]
    fn protocol_relative_embedded_canary_is_not_a_reflection() {
        let b = baseline(200, "hello", Some("text/plain"));
        let canary = Canary::generate();
        let body = format!("see //example.com/{} for details", canary.base_value);
        let p = probe(200, &body, Some("text/plain"));
        let reasons = analyze(&b, b.html_tag_count(), &p, &canary, SurfaceTag::Url);
        assert!(!reasons.iter().any(|r| r.kind == ReasonKind::ParamValueReflection));
    }

    #[test]
    fn content_length_suppressed_on_html_with_same_tag_count() {
        let b = baseline(
            200,
            "<html><body><p>a</p></body></html>",
            Some("text/html"),
        );
        let p = probe(
            200,
            "<html>\n  <body><p>a</p></body>\n</html>",
            Some("text/html"),
        );
        let reasons = analyze(&b, b.html_tag_count(), &p, &Canary::generate(), SurfaceTag::Url);
        assert!(!reasons.iter().any(|r| r.kind == ReasonKind::DiffContentLength));
        assert!(!reasons.iter().any(|r| r.kind == ReasonKind::DiffHtmlTagsCount));
        assert!(reasons.is_empty());
    }

    #[test]
    fn content_type_charset_ordering_is_not_flagged() {
        let b = baseline(200, "x", Some("text/html; charset=utf-8; boundary=1"));
        let p = probe(200, "x", Some("text/html; boundary=1; charset=UTF-8"));
        let reasons = analyze(&b, b.html_tag_count(), &p, &Canary::generate(), SurfaceTag::Url);
        assert!(!reasons.iter().any(|r| r.kind == ReasonKind::DiffContentType));
    }

    #[test]
    fn status_code_divergence_is_reported() {
        let b = baseline(200, "ok", Some("text/plain"));
        let p = probe(500, "err", Some("text/plain"));
        let reasons = analyze(&b, b.html_tag_count(), &p, &Canary::generate(), SurfaceTag::Url);
        assert!(reasons.iter().any(|r| r.kind == ReasonKind::DiffStatusCode));
    }
}
