//! Microsoft Edge driver.
//!
//! Chromium-based Edge drivers are scraped from the Edge WebDriver page. Legacy EdgeHTML
//! drivers ship with Windows and are selected with the `pre-installed` version.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::drivers::{dash_version, file_name, parent_segment};
use crate::listing::Listing;
use crate::platform::{Architecture, BrowserType};
use crate::WebDriverManager;

#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeDriver;

/// Chromium-based Edge versions have four components (`79.0.309.71`), legacy ones at most
/// two (`6.17134`), so more than one dot means Chromium.
pub fn is_chromium_based(version: &str) -> bool {
    version.matches('.').count() > 1
}

#[async_trait]
impl WebDriverManager for EdgeDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::Edge
    }

    fn driver_name(&self) -> &str {
        "msedgedriver"
    }

    fn listing_name(&self) -> &str {
        "edgedriver"
    }

    fn os_agnostic(&self) -> bool {
        true
    }

    fn listing(&self) -> Listing {
        Listing::HtmlPage
    }

    fn current_version(&self, url: &Url) -> Option<String> {
        let file = file_name(url);
        if file.matches('-').count() >= 2 {
            return dash_version(file);
        }
        let dir = parent_segment(url)?;
        Some(dir.strip_prefix('v').unwrap_or(dir).to_string())
    }

    fn target_path(&self, root: &Path, version: &str, url: &Url, arch: Architecture) -> PathBuf {
        let mut target = root.join(self.driver_name());
        if is_chromium_based(version) {
            target.push(arch.label());
        }
        target.join(version).join(file_name(url))
    }

    fn preinstalled_driver(&self) -> Option<PathBuf> {
        let system_root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        Some(
            PathBuf::from(system_root)
                .join("System32")
                .join("MicrosoftWebDriver.exe"),
        )
    }
}
