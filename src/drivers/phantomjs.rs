use async_trait::async_trait;
use url::Url;

use crate::drivers::file_name;
use crate::listing::Listing;
use crate::platform::BrowserType;
use crate::WebDriverManager;

const BETA: &str = "beta";

/// PhantomJS, scraped from its downloads page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhantomJsDriver;

#[async_trait]
impl WebDriverManager for PhantomJsDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::PhantomJs
    }

    fn driver_name(&self) -> &str {
        "phantomjs"
    }

    fn listing(&self) -> Listing {
        Listing::HtmlPage
    }

    /// `phantomjs-2.1.1-linux-x86_64.tar.bz2` → `2.1.1`; a `beta-` infix is kept as part of
    /// the version: `phantomjs-2.5.0-beta-linux-ubuntu-xenial-x86_64.tar.gz` → `2.5.0-beta`.
    fn current_version(&self, url: &Url) -> Option<String> {
        let file = file_name(url);
        let start = file.find(self.driver_name())? + self.driver_name().len() + 1;
        let rest = file.get(start..)?;

        let mut dash = rest.find('-')?;
        let after = &rest[dash + 1..];
        if after.len() >= BETA.len() && after[..BETA.len()].eq_ignore_ascii_case(BETA) {
            dash = match after.find('-') {
                Some(next) => dash + 1 + next,
                None => rest.len(),
            };
        }
        let version = &rest[..dash];
        (!version.is_empty()).then(|| version.to_string())
    }

    fn distro_specific_version(&self) -> Option<&str> {
        Some("2.5.0")
    }
}
