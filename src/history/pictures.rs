// Picture index for a user's picture repository.
// Walks the repository tree and maps commit keys to raw-content URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::github::{ContentItem, ContentKind, GitHubApi, contents_endpoint};

/// Decides which files are pictures and which commit each one stands for.
pub trait PicturePolicy: Send + Sync {
    /// Commit key `item` is a picture of, or `None` if it is not a picture.
    fn picture_key(&self, item: &ContentItem) -> Option<String>;
}

impl<F> PicturePolicy for F
where
    F: Fn(&ContentItem) -> Option<String> + Send + Sync,
{
    fn picture_key(&self, item: &ContentItem) -> Option<String> {
        self(item)
    }
}

/// Commit key to picture URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PictureIndex {
    pictures: BTreeMap<String, String>,
}

impl PictureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.pictures.insert(key.into(), url.into())
    }

    /// Picture for a commit: the first key, in key order, that prefixes `sha`.
    pub fn find(&self, sha: &str) -> Option<&str> {
        self.pictures
            .iter()
            .find(|(key, _)| !key.is_empty() && sha.starts_with(key.as_str()))
            .map(|(_, url)| url.as_str())
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pictures.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Where the raw files of a scanned repository are served from.
struct RawLocation<'a> {
    base: &'a str,
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
}

impl RawLocation<'_> {
    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.base, self.owner, self.repo, self.branch, path
        )
    }
}

/// Find every picture in `owner/repo`, walking subdirectories.
///
/// A failed listing stops the scan; whatever was found before it is kept.
pub fn scan_pictures(
    api: &dyn GitHubApi,
    policy: &dyn PicturePolicy,
    raw_base: &str,
    owner: &str,
    repo: &str,
    branch: &str,
) -> PictureIndex {
    let location = RawLocation {
        base: raw_base.trim_end_matches('/'),
        owner,
        repo,
        branch,
    };
    let mut found = PictureIndex::new();

    match scan_subtree(api, policy, &location, &contents_endpoint(owner, repo), &mut found) {
        Ok(()) => debug!(owner, repo, pictures = found.len(), "picture scan complete"),
        Err(err) => warn!(
            owner,
            repo,
            pictures = found.len(),
            error = %err,
            "picture scan stopped early"
        ),
    }

    found
}

fn scan_subtree(
    api: &dyn GitHubApi,
    policy: &dyn PicturePolicy,
    location: &RawLocation<'_>,
    url: &str,
    found: &mut PictureIndex,
) -> Result<()> {
    for item in api.contents(url)? {
        match item.kind {
            ContentKind::Dir => scan_subtree(api, policy, location, &item.url, found)?,
            ContentKind::File => {
                if let Some(key) = policy.picture_key(&item) {
                    found.insert(key, location.url_for(&item.path));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::stub::{StubApi, dir, file, stem_policy};

    const RAW: &str = "https://raw.example/";

    #[test]
    fn test_find_by_prefix() {
        let mut index = PictureIndex::new();
        index.insert("a0b1c2d3e4", "https://raw.example/a.jpg");
        index.insert("ffff", "https://raw.example/f.png");

        assert_eq!(
            index.find("a0b1c2d3e4f5a6b7c8d9"),
            Some("https://raw.example/a.jpg")
        );
        assert_eq!(index.find("ffff0000"), Some("https://raw.example/f.png"));
        assert_eq!(index.find("a0b1c2"), None);
        assert_eq!(index.find("0000"), None);
    }

    #[test]
    fn test_empty_key_never_matches() {
        let mut index = PictureIndex::new();
        index.insert("", "https://raw.example/anything.jpg");
        assert_eq!(index.find("abc"), None);
    }

    #[test]
    fn test_scan_walks_subdirectories() {
        let mut api = StubApi::default();
        api.contents.insert(
            contents_endpoint("alice", "lulz-pics"),
            vec![
                file("abc123.jpg"),
                file("README.md"),
                dir("2013", "listing:2013"),
            ],
        );
        api.contents
            .insert("listing:2013".into(), vec![file("2013/def456.png")]);

        let index = scan_pictures(&api, &stem_policy, RAW, "alice", "lulz-pics", "main");

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.find("abc123999"),
            Some("https://raw.example/alice/lulz-pics/main/abc123.jpg")
        );
        assert_eq!(
            index.find("def456000"),
            Some("https://raw.example/alice/lulz-pics/main/2013/def456.png")
        );
    }

    #[test]
    fn test_scan_keeps_partial_results_on_failure() {
        let mut api = StubApi::default();
        api.contents.insert(
            contents_endpoint("alice", "lulz-pics"),
            vec![
                file("abc123.jpg"),
                dir("gone", "listing:gone"),
                file("def456.png"),
            ],
        );

        let index = scan_pictures(&api, &stem_policy, RAW, "alice", "lulz-pics", "main");

        assert_eq!(
            index.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            vec!["abc123"]
        );
        assert_eq!(api.call_count("contents"), 2);
    }

    #[test]
    fn test_scan_of_missing_repository_is_empty() {
        let api = StubApi::default();
        let index = scan_pictures(&api, &stem_policy, RAW, "bob", "lulz-pics", "main");
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_serializes_as_a_map() {
        let mut index = PictureIndex::new();
        index.insert("abc", "https://raw.example/abc.jpg");

        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(value, serde_json::json!({"abc": "https://raw.example/abc.jpg"}));
    }
}
