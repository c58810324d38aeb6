//! Discovery of candidate download URLs.
//!
//! Each vendor publishes its drivers differently. A [`Listing`] knows how to turn one
//! listing URL into a flat list of archive URLs; choosing among them is left to the
//! resolver.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::WebDriverError;
use crate::http::{HttpClient, parse_url};

/// File extensions that identify a downloadable driver artifact.
pub const ARTIFACT_EXTENSIONS: &[&str] = &[".zip", ".tar.gz", ".tar.bz2", ".msi", ".exe", ".jar"];

const MAX_MIRROR_DEPTH: usize = 4;
const MAX_BUCKET_PAGES: usize = 50;

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Key>([^<]+)</Key>").expect("valid regex"));
static TRUNCATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("valid regex"));
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// The discovery mechanisms used by the supported drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// S3-style XML bucket listing; every `<Key>` is joined onto the bucket URL.
    S3Bucket,
    /// GitHub releases API; every asset's `browser_download_url`.
    GitHubReleases,
    /// Chrome for Testing `known-good-versions-with-downloads.json`.
    ChromeForTesting,
    /// A single HTML page whose links point at artifacts.
    HtmlPage,
    /// A directory-index mirror, crawled recursively.
    MirrorTree,
}

impl Listing {
    pub async fn list(&self, http: &HttpClient, url: &Url) -> Result<Vec<Url>, WebDriverError> {
        debug!("Listing candidates from {} ({:?})", url, self);
        let urls = match self {
            Listing::S3Bucket => list_s3_bucket(http, url).await?,
            Listing::GitHubReleases => list_github_releases(http, url).await?,
            Listing::ChromeForTesting => list_chrome_for_testing(http, url).await?,
            Listing::HtmlPage => list_html_page(http, url).await?,
            Listing::MirrorTree => crawl_mirror(http, url).await?,
        };
        trace!("All URLs: {:?}", urls);
        Ok(urls)
    }
}

pub fn is_artifact(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    ARTIFACT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

async fn list_s3_bucket(http: &HttpClient, url: &Url) -> Result<Vec<Url>, WebDriverError> {
    let mut out = Vec::new();
    let mut page_url = url.clone();

    for _ in 0..MAX_BUCKET_PAGES {
        let body = http.get_text(&page_url).await?;
        let keys = parse_bucket_keys(&body);
        for key in &keys {
            match url.join(key) {
                Ok(u) => out.push(u),
                Err(e) => trace!("Skipping bucket key {}: {}", key, e),
            }
        }

        let Some(last) = keys.last() else { break };
        if !TRUNCATED_RE.is_match(&body) {
            break;
        }
        page_url = url.clone();
        page_url.query_pairs_mut().append_pair("marker", last);
    }
    Ok(out)
}

/// Extracts every `<Key>` of an S3 `ListBucketResult` document.
pub fn parse_bucket_keys(body: &str) -> Vec<String> {
    KEY_RE
        .captures_iter(body)
        .map(|c| c[1].trim().to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

async fn list_github_releases(http: &HttpClient, url: &Url) -> Result<Vec<Url>, WebDriverError> {
    let releases: Vec<GitHubRelease> = http.get_json(url).await?;
    Ok(releases
        .into_iter()
        .flat_map(|r| r.assets)
        .filter_map(|a| Url::parse(&a.browser_download_url).ok())
        .collect())
}

/// Represents a single download URL for a specific platform.
#[derive(Debug, Deserialize)]
struct Download {
    url: String,
}

/// Represents the available downloads for a specific Chromedriver version.
#[derive(Debug, Deserialize)]
struct VersionDownloads {
    chromedriver: Option<Vec<Download>>, // must be optional, versions before 115 have no key 'chromedriver'
}

/// Represents a single version entry in the main JSON response.
#[derive(Debug, Deserialize)]
struct Version {
    downloads: VersionDownloads,
}

/// The top-level structure of the JSON response.
#[derive(Debug, Deserialize)]
struct KnownGoodVersions {
    versions: Vec<Version>,
}

async fn list_chrome_for_testing(http: &HttpClient, url: &Url) -> Result<Vec<Url>, WebDriverError> {
    let response: KnownGoodVersions = http.get_json(url).await?;
    Ok(response
        .versions
        .into_iter()
        .filter_map(|v| v.downloads.chromedriver)
        .flatten()
        .filter_map(|d| Url::parse(&d.url).ok())
        .collect())
}

/// Returns the absolute targets of every `href` in an HTML document.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|c| base.join(c[1].trim()).ok())
        .collect()
}

async fn list_html_page(http: &HttpClient, url: &Url) -> Result<Vec<Url>, WebDriverError> {
    let html = http.get_text(url).await?;
    let mut seen = HashSet::new();
    Ok(extract_links(url, &html)
        .into_iter()
        .filter(|u| is_artifact(u.path()))
        .filter(|u| seen.insert(u.clone()))
        .collect())
}

async fn crawl_mirror(http: &HttpClient, root: &Url) -> Result<Vec<Url>, WebDriverError> {
    let root = if root.path().ends_with('/') {
        root.clone()
    } else {
        parse_url(&format!("{root}/"))?
    };
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([(root.clone(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let html = match http.get_text(&dir).await {
            Ok(html) => html,
            // The root failing means the mirror is unusable; a broken subdirectory is not.
            Err(e) if dir == root => return Err(e),
            Err(e) => {
                warn!("Skipping mirror directory {}: {}", dir, e);
                continue;
            }
        };

        for link in extract_links(&dir, &html) {
            if !link.as_str().starts_with(root.as_str()) || link == dir {
                continue;
            }
            if link.path().ends_with('/') {
                if depth < MAX_MIRROR_DEPTH && link.as_str().len() > dir.as_str().len() {
                    queue.push_back((link, depth + 1));
                }
            } else if is_artifact(link.path()) && !out.contains(&link) {
                out.push(link);
            }
        }
    }
    debug!("Crawled {} candidates from mirror {}", out.len(), root);
    Ok(out)
}
