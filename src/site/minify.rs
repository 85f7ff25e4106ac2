use regex::Regex;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static BETWEEN_TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid between-tags regex"));

/// Strip comments and collapse whitespace.
///
/// Idempotent: minifying already minified output returns it unchanged. Inline scripts
/// must not rely on line breaks (no `//` comments).
pub fn minify_html(html: &str) -> String {
    let mut out = html.to_string();
    // Removing one comment can expose another (`<!-<!-- -->- -->`)
    loop {
        let next = COMMENT_RE.replace_all(&out, "").into_owned();
        if next == out {
            break;
        }
        out = next;
    }

    let out = WHITESPACE_RE.replace_all(&out, " ");
    let out = BETWEEN_TAGS_RE.replace_all(&out, "><");
    out.trim().to_string()
}
