//! Resolves, downloads and caches browser automation drivers.

// Top-level public modules
pub mod error;
pub mod browser;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod drivers;
pub mod filter;
pub mod http;
pub mod listing;
pub mod manager;
pub mod platform;
pub mod preferences;
pub mod server;
pub mod version;
pub mod versions;

pub use config::Config;
pub use error::WebDriverError;
pub use manager::{DriverRequest, Resolution, ResolvedDriver, Resolver};
pub use platform::{Architecture, BrowserType, OperatingSystem};

// Per-browser strategy trait
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

use crate::drivers::{ListingContext, generic_target_path};
use crate::listing::Listing;

/// Everything the resolver needs to know about one driver family.
///
/// Implementations are plain strategy objects: they describe where a driver is published and
/// how its download URLs encode versions. The resolution algorithm itself lives in
/// [`Resolver`] and is shared by every browser.
#[async_trait]
pub trait WebDriverManager: Send + Sync {
    /// The browser family this driver serves.
    fn browser_type(&self) -> BrowserType;

    /// Gets the name of the driver (e.g., "chromedriver").
    fn driver_name(&self) -> &str;

    /// Substring a listing URL must contain to belong to this driver.
    fn listing_name(&self) -> &str {
        self.driver_name()
    }

    /// Name of the executable inside a downloaded archive.
    fn binary_name(&self, os: OperatingSystem) -> String {
        if os == OperatingSystem::Win {
            format!("{}.exe", self.driver_name())
        } else {
            self.driver_name().to_string()
        }
    }

    /// Drivers packaged the same way for every OS skip OS filtering.
    fn os_agnostic(&self) -> bool {
        false
    }

    /// How the vendor's primary listing is published.
    fn listing(&self) -> Listing;

    /// Extracts the driver version encoded in a candidate URL.
    fn current_version(&self, url: &Url) -> Option<String>;

    /// The listing mechanism and URL to consult, honouring the mirror flag.
    fn listing_source(&self, config: &Config, use_mirror: bool) -> Result<(Listing, Url), WebDriverError> {
        let settings = config.driver(self.browser_type())?;
        match (&settings.mirror_url, use_mirror) {
            (Some(mirror), true) => Ok((Listing::MirrorTree, http::parse_url(mirror)?)),
            _ => Ok((self.listing(), http::parse_url(&settings.url)?)),
        }
    }

    /// Fetches every candidate download URL.
    async fn list_candidates(&self, ctx: &ListingContext<'_>) -> Result<Vec<Url>, WebDriverError> {
        let (listing, url) = self.listing_source(ctx.config, ctx.use_mirror)?;
        listing.list(ctx.http, &url).await
    }

    /// Asks the vendor for its latest driver version, if it publishes one.
    async fn latest_version(&self, _ctx: &ListingContext<'_>) -> Result<Option<String>, WebDriverError> {
        Ok(None)
    }

    /// Maps an installed browser major version to a driver version when the
    /// versions-properties table has no entry for it.
    async fn driver_version_for_browser(
        &self,
        _ctx: &ListingContext<'_>,
        _browser_version: &str,
    ) -> Result<Option<String>, WebDriverError> {
        Ok(None)
    }

    /// Where the downloaded artifact is stored inside the cache root.
    fn target_path(&self, root: &Path, version: &str, url: &Url, _arch: Architecture) -> PathBuf {
        generic_target_path(root, version, url)
    }

    /// Location of a driver shipped with the operating system, for the `pre-installed`
    /// version sentinel.
    fn preinstalled_driver(&self) -> Option<PathBuf> {
        None
    }

    /// Version whose Linux builds are split per distro.
    fn distro_specific_version(&self) -> Option<&str> {
        None
    }
}
