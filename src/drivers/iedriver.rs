use async_trait::async_trait;
use url::Url;

use crate::drivers::{file_name, strip_extension};
use crate::listing::Listing;
use crate::platform::{BrowserType, OperatingSystem};
use crate::WebDriverManager;

/// IEDriverServer, published in the Selenium release bucket. Windows only, so the OS filter
/// is skipped and the binary always carries `.exe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InternetExplorerDriver;

#[async_trait]
impl WebDriverManager for InternetExplorerDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::IExplorer
    }

    fn driver_name(&self) -> &str {
        "IEDriverServer"
    }

    fn binary_name(&self, _os: OperatingSystem) -> String {
        format!("{}.exe", self.driver_name())
    }

    fn os_agnostic(&self) -> bool {
        true
    }

    fn listing(&self) -> Listing {
        Listing::S3Bucket
    }

    fn current_version(&self, url: &Url) -> Option<String> {
        let stem = strip_extension(file_name(url));
        let (_, version) = stem.rsplit_once('_')?;
        version
            .starts_with(|c: char| c.is_ascii_digit())
            .then(|| version.to_string())
    }
}
