use std::sync::OnceLock;

use regex::Regex;

/// First `{{name}}` occurrence in a fragment, with the text around it.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct Placeholder<'a> {
    pub(super) prefix: &'a str,
    pub(super) name: &'a str,
    pub(super) suffix: &'a str,
}

fn placeholder_re() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"(?s)^(.*?)\{\{(.*?)\}\}(.*)$").expect("invalid built-in placeholder regex")
    })
}

/// Split `text` around its first placeholder. The name is trimmed.
pub(super) fn split_first(text: &str) -> Option<Placeholder<'_>> {
    let caps = placeholder_re().captures(text)?;
    Some(Placeholder {
        prefix: caps.get(1)?.as_str(),
        name: caps.get(2)?.as_str().trim(),
        suffix: caps.get(3)?.as_str(),
    })
}

pub(super) fn count_placeholders(text: &str) -> usize {
    let mut count = 0;
    let mut rest = text;
    while let Some(found) = split_first(rest) {
        count += 1;
        rest = found.suffix;
    }
    count
}
