//! Relative to absolute URL resolution for `Location:` headers.
//!
//! A merge-and-remove-dot-segments resolver restricted to http(s). An empty
//! string result means the reference was rejected (non-http scheme or an
//! unparsable absolute URL).

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::compile_regex_unsafe;

const SCHEME_PREFIX_PATTERN: &str = r"^[a-zA-Z0-9]+:";

static SCHEME_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(SCHEME_PREFIX_PATTERN, "SCHEME_PREFIX_RE"));

/// Components of an absolute `scheme://authority/path?query#fragment` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlParts<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

/// Path, query and fragment of a reference, split without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference<'a> {
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn split_reference(input: &str) -> Reference<'_> {
    let (rest, fragment) = match input.split_once('#') {
        Some((r, f)) => (r, Some(f)),
        None => (input, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    Reference {
        path,
        query,
        fragment,
    }
}

fn parse_absolute(url: &str) -> Option<UrlParts<'_>> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    if authority.is_empty() {
        return None;
    }
    let reference = split_reference(&rest[authority_end..]);
    Some(UrlParts {
        scheme,
        authority,
        path: reference.path,
        query: reference.query,
        fragment: reference.fragment,
    })
}

fn push_query_fragment(out: &mut String, query: Option<&str>, fragment: Option<&str>) {
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
}

/// Resolves `reference` against `base`, returning an absolute http(s) URL or
/// `""` when the reference is rejected.
///
/// # Examples
///
/// ```
/// use h2c_proxy::proxy::resolve;
///
/// assert_eq!(resolve("http://a.com/p/q", "../r"), "http://a.com/r");
/// assert_eq!(resolve("http://a.com/p/", "./r"), "http://a.com/p/r");
/// assert_eq!(resolve("http://a.com/", "ftp://x/y"), "");
/// ```
pub fn resolve(base: &str, reference: &str) -> String {
    // Protocol-relative
    if reference.starts_with("//") {
        return format!("http:{reference}");
    }

    if SCHEME_PREFIX_RE.is_match(reference) {
        let Some(parts) = parse_absolute(reference) else {
            return String::new();
        };
        if !parts.scheme.eq_ignore_ascii_case("http") && !parts.scheme.eq_ignore_ascii_case("https")
        {
            return String::new();
        }

        let mut relative = parts.path.to_string();
        push_query_fragment(&mut relative, parts.query, parts.fragment);

        let new_base = format!("{}://{}", parts.scheme, parts.authority);
        if relative.starts_with("//") {
            // Would be read as protocol-relative on the next pass
            return merge_paths(&new_base, &relative);
        }
        return resolve(&new_base, &relative);
    }

    if reference.starts_with('?') || reference.starts_with('#') {
        return format!("{base}{reference}");
    }

    merge_paths(base, reference)
}

fn merge_paths(base: &str, reference: &str) -> String {
    let Some(base_parts) = parse_absolute(base) else {
        return String::new();
    };

    let target = split_reference(reference);
    let is_directory = target.path.ends_with('/');

    // Drop the last segment of the base path
    let base_dir = if reference.starts_with('/') {
        ""
    } else {
        match base_parts.path.rfind('/') {
            Some(idx) => &base_parts.path[..idx],
            None => "",
        }
    };

    let merged = format!("{}/{}", base_dir, target.path).replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in merged.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = format!(
        "{}://{}/{}",
        base_parts.scheme,
        base_parts.authority,
        segments.join("/")
    );
    if is_directory && !segments.is_empty() {
        out.push('/');
    }
    push_query_fragment(&mut out, target.query, target.fragment);
    out
}
