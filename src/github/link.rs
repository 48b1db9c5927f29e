// Link header parsing.
// GitHub reports pagination cursors as `<url>; rel="next"` entries.

use reqwest::header::{HeaderMap, LINK};

/// URL of the next page, from a response's `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    find_rel(value, "next")
}

/// Find the target of the first link whose `rel` includes `rel`.
pub fn find_rel(header: &str, rel: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;

        let matches = parts.any(|param| {
            let Some((name, value)) = param.split_once('=') else {
                return false;
            };
            name.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case(rel))
        });

        matches.then(|| target.to_string())
    })
}
