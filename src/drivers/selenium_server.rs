use async_trait::async_trait;
use url::Url;

use crate::drivers::{file_name, strip_extension};
use crate::listing::Listing;
use crate::platform::BrowserType;
use crate::WebDriverManager;

const PREFIX: &str = "selenium-server-standalone-";

/// The Selenium standalone server jar. Not a driver, but cached and resolved the same way.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeleniumServerStandalone;

#[async_trait]
impl WebDriverManager for SeleniumServerStandalone {
    fn browser_type(&self) -> BrowserType {
        BrowserType::SeleniumServerStandalone
    }

    fn driver_name(&self) -> &str {
        "selenium-server-standalone"
    }

    fn os_agnostic(&self) -> bool {
        true
    }

    fn listing(&self) -> Listing {
        Listing::S3Bucket
    }

    fn current_version(&self, url: &Url) -> Option<String> {
        let stem = strip_extension(file_name(url));
        let version = stem.strip_prefix(PREFIX)?;
        (!version.is_empty()).then(|| version.to_string())
    }
}
