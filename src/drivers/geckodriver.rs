use async_trait::async_trait;
use url::Url;

use crate::drivers::{dash_version, file_name};
use crate::listing::Listing;
use crate::platform::BrowserType;
use crate::WebDriverManager;

/// Geckodriver, published as GitHub release assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirefoxDriver;

#[async_trait]
impl WebDriverManager for FirefoxDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::Firefox
    }

    fn driver_name(&self) -> &str {
        "geckodriver"
    }

    fn listing(&self) -> Listing {
        Listing::GitHubReleases
    }

    fn current_version(&self, url: &Url) -> Option<String> {
        dash_version(file_name(url))
    }
}
