use async_trait::async_trait;
use url::Url;

use crate::drivers::parent_segment;
use crate::listing::Listing;
use crate::platform::BrowserType;
use crate::WebDriverManager;

/// OperaChromiumDriver, released on GitHub under tags such as `v.2.45`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperaDriver;

#[async_trait]
impl WebDriverManager for OperaDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::Opera
    }

    fn driver_name(&self) -> &str {
        "operadriver"
    }

    fn listing(&self) -> Listing {
        Listing::GitHubReleases
    }

    fn current_version(&self, url: &Url) -> Option<String> {
        let tag = parent_segment(url)?;
        let version = tag.trim_start_matches('v').trim_start_matches('.');
        (!version.is_empty()).then(|| version.to_string())
    }
}
