//! Per-browser driver strategies and the URL helpers they share.

pub mod chromedriver;
pub mod edgedriver;
pub mod geckodriver;
pub mod iedriver;
pub mod operadriver;
pub mod phantomjs;
pub mod selenium_server;

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::Config;
use crate::error::WebDriverError;
use crate::http::HttpClient;
use crate::listing::ARTIFACT_EXTENSIONS;
use crate::platform::BrowserType;
use crate::WebDriverManager;

/// What a strategy may use while talking to the outside world.
#[derive(Debug, Clone, Copy)]
pub struct ListingContext<'a> {
    pub http: &'a HttpClient,
    pub config: &'a Config,
    pub use_mirror: bool,
}

/// Returns the strategy for a browser family.
pub fn for_browser(browser: BrowserType) -> Result<Box<dyn WebDriverManager>, WebDriverError> {
    Ok(match browser {
        BrowserType::Chrome => Box::new(chromedriver::ChromeDriver),
        BrowserType::Firefox => Box::new(geckodriver::FirefoxDriver),
        BrowserType::Edge => Box::new(edgedriver::EdgeDriver),
        BrowserType::Opera => Box::new(operadriver::OperaDriver),
        BrowserType::IExplorer => Box::new(iedriver::InternetExplorerDriver),
        BrowserType::PhantomJs => Box::new(phantomjs::PhantomJsDriver),
        BrowserType::SeleniumServerStandalone => Box::new(selenium_server::SeleniumServerStandalone),
        BrowserType::Void => return Err(WebDriverError::UnsupportedBrowser(browser.to_string())),
    })
}

/// Last path segment of a URL.
pub fn file_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
}

/// Path segment holding the file, e.g. `2.21` for `/2.21/chromedriver_linux64.zip`.
pub fn parent_segment(url: &Url) -> Option<&str> {
    let mut segments = url.path_segments()?;
    segments.next_back()?;
    segments.next_back().filter(|s| !s.is_empty())
}

/// File name without its artifact extension.
pub fn strip_extension(file: &str) -> &str {
    let lower = file.to_ascii_lowercase();
    ARTIFACT_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &file[..file.len() - ext.len()])
        .unwrap_or(file)
}

/// Version between the first and last dash of a file name, without a leading `v`:
/// `geckodriver-v0.26.0-linux64.tar.gz` → `0.26.0`.
pub fn dash_version(file: &str) -> Option<String> {
    let first = file.find('-')?;
    let last = file.rfind('-')?;
    if last <= first {
        return None;
    }
    let version = &file[first + 1..last];
    let version = version.strip_prefix('v').unwrap_or(version);
    (!version.is_empty()).then(|| version.to_string())
}

/// Cache location for an artifact: `<root>/<name>/<platform...>/<version>/<file>`.
///
/// `.../2.21/chromedriver_linux64.zip` lands in `chromedriver/linux64/2.21/`, and
/// `geckodriver-v0.26.0-linux64.tar.gz` in `geckodriver/linux64/0.26.0/`.
pub fn generic_target_path(root: &Path, version: &str, url: &Url) -> PathBuf {
    let file = file_name(url);
    let stem = strip_extension(file);

    let position = if version.is_empty() { None } else { stem.find(version) };
    let (name, platform) = match position {
        Some(idx) => {
            let prefix = &stem[..idx];
            let prefix = prefix.strip_suffix('v').unwrap_or(prefix);
            let prefix = prefix.trim_end_matches(['-', '_', '.']);
            let suffix = stem[idx + version.len()..].trim_start_matches(['-', '_', '.']);
            if suffix.is_empty() {
                prefix.split_once('_').unwrap_or((prefix, ""))
            } else {
                (prefix, suffix)
            }
        }
        None => stem.split_once(['_', '-']).unwrap_or((stem, "")),
    };

    let mut path = root.join(name);
    for part in platform.split(['-', '_']).filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path.join(version).join(file)
}
