//! Path normalization and the naming rules for operation ids, tags and summaries.

use crate::document::Method;
use regex::Regex;
use std::sync::LazyLock;

/// `{name}`, `{name?}` and `{name:constraint}`
static BRACE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\??(?::[^}]*)?\}").expect("valid brace regex")
});

/// `<name>` and `<converter:name>`
static ANGLE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[^:<>]+:)?([A-Za-z_][A-Za-z0-9_]*)>").expect("valid angle regex")
});

static TEMPLATE_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("valid template regex"));

/// Normalize a registered route pattern into an OpenAPI path template.
///
/// The result always starts with `/`, has no empty or trailing segments, and writes
/// every parameter as `{name}` whatever the framework syntax was.
///
/// # Examples
///
/// ```
/// use openapi_from_routes::naming::normalize_path;
///
/// assert_eq!(normalize_path("api/users/{id?}"), "/api/users/{id}");
/// assert_eq!(normalize_path("/users/:id/posts/"), "/users/{id}/posts");
/// assert_eq!(normalize_path("files/<path:name>"), "/files/{name}");
/// ```
pub fn normalize_path(pattern: &str) -> String {
    let segments: Vec<String> = pattern
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(normalize_segment)
        .collect();

    format!("/{}", segments.join("/"))
}

fn normalize_segment(segment: &str) -> String {
    if let Some(name) = segment.strip_prefix(':') {
        return format!("{{{}}}", name.trim_end_matches('?'));
    }
    let segment = BRACE_PARAM_RE.replace_all(segment, "{$1}");
    ANGLE_PARAM_RE.replace_all(&segment, "{$1}").into_owned()
}

/// Template variable names of a normalized path, in order of appearance
pub fn template_parameters(path: &str) -> Vec<String> {
    TEMPLATE_VAR_RE
        .captures_iter(path)
        .map(|c| c[1].to_string())
        .collect()
}

/// Deterministic operation id: lowercase method, then the path with `/` as `_` and
/// braces dropped (`get_api_users_id`).
pub fn operation_id(method: Method, path: &str) -> String {
    let flattened: String = path
        .trim_start_matches('/')
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .map(|c| if c == '/' { '_' } else { c })
        .collect();

    let flattened = if flattened.is_empty() {
        "root".to_string()
    } else {
        flattened
    };
    format!("{}_{}", method.as_str(), flattened)
}

/// Tag for an operation: the first non-parameter path segment, title-cased
pub fn tag_for_path(path: &str) -> String {
    literal_segments(path)
        .next()
        .map(title_case)
        .unwrap_or_else(|| "Default".to_string())
}

/// Human summary such as "Get User".
///
/// The resource comes from the handler name when it carries one (a `UserController@show`
/// class or a `users::show` module), otherwise from the first path segment after the
/// configured prefix.
pub fn summary(method: Method, handler_name: &str, path: &str, prefix: &str) -> String {
    let resource = resource_from_handler(handler_name)
        .or_else(|| resource_from_path(path, prefix))
        .unwrap_or_else(|| "Root".to_string());

    format!("{} {}", title_case(method.as_str()), resource)
}

fn resource_from_handler(handler_name: &str) -> Option<String> {
    if let Some((class, _action)) = handler_name.split_once('@') {
        let class = class.rsplit(['\\', ':', '.']).next().unwrap_or(class);
        let resource = class.strip_suffix("Controller").unwrap_or(class);
        return (!resource.is_empty()).then(|| title_case(resource));
    }

    let mut modules: Vec<&str> = handler_name.split("::").filter(|s| !s.is_empty()).collect();
    if modules.len() < 2 {
        return None;
    }
    modules.pop();
    modules
        .last()
        .filter(|m| !matches!(**m, "crate" | "self" | "super" | "handlers" | "routes"))
        .map(|m| title_case(m))
}

fn resource_from_path(path: &str, prefix: &str) -> Option<String> {
    let prefix: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let rest = if segments.len() > prefix.len() && segments[..prefix.len()] == prefix[..] {
        &segments[prefix.len()..]
    } else {
        &segments[..]
    };

    rest.iter()
        .find(|s| !s.starts_with('{'))
        .map(|s| title_case(s))
}

fn literal_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
}

/// Split on separators and camel-case humps, then capitalize each word
/// (`user_profiles` and `userProfiles` both become "User Profiles").
pub fn title_case(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in input.chars() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
