//! Chromedriver, published in the legacy storage bucket and in Chrome for Testing.

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::drivers::ListingContext;
use crate::error::WebDriverError;
use crate::http::parse_url;
use crate::listing::Listing;
use crate::platform::BrowserType;
use crate::WebDriverManager;

const LATEST_RELEASE: &str = "LATEST_RELEASE";

/// Public struct for managing Chromedriver.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeDriver;

impl ChromeDriver {
    async fn read_release_file(
        &self,
        ctx: &ListingContext<'_>,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        let base = parse_url(&ctx.config.chrome.url)?;
        let url = base.join(name).map_err(|e| WebDriverError::InvalidUrl {
            url: format!("{base}{name}"),
            source: e,
        })?;
        let version = ctx.http.get_text(&url).await?.trim().to_string();
        debug!("Version of chromedriver according to {} is '{}'", url, version);
        Ok((!version.is_empty()).then_some(version))
    }
}

#[async_trait]
impl WebDriverManager for ChromeDriver {
    fn browser_type(&self) -> BrowserType {
        BrowserType::Chrome
    }

    fn driver_name(&self) -> &str {
        "chromedriver"
    }

    fn listing(&self) -> Listing {
        Listing::S3Bucket
    }

    /// The version is the deepest directory that starts with a digit, which covers both
    /// `/2.21/chromedriver_linux64.zip` and
    /// `/chrome-for-testing-public/138.0.7204.158/linux64/chromedriver-linux64.zip`.
    fn current_version(&self, url: &Url) -> Option<String> {
        let segments: Vec<&str> = url.path_segments()?.collect();
        let (_, dirs) = segments.split_last()?;
        dirs.iter()
            .rev()
            .find(|s| s.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .map(|s| s.to_string())
    }

    async fn list_candidates(&self, ctx: &ListingContext<'_>) -> Result<Vec<Url>, WebDriverError> {
        let (listing, url) = self.listing_source(ctx.config, ctx.use_mirror)?;
        let mut urls = listing.list(ctx.http, &url).await?;

        let cft = ctx.config.chrome_driver_cft_url.trim();
        if !ctx.use_mirror && !cft.is_empty() {
            let cft_url = parse_url(cft)?;
            match Listing::ChromeForTesting.list(ctx.http, &cft_url).await {
                Ok(more) => urls.extend(more),
                Err(e) => warn!("Could not read Chrome for Testing listing {}: {}", cft_url, e),
            }
        }
        Ok(urls)
    }

    async fn latest_version(&self, ctx: &ListingContext<'_>) -> Result<Option<String>, WebDriverError> {
        self.read_release_file(ctx, LATEST_RELEASE).await
    }

    async fn driver_version_for_browser(
        &self,
        ctx: &ListingContext<'_>,
        browser_version: &str,
    ) -> Result<Option<String>, WebDriverError> {
        self.read_release_file(ctx, &format!("{LATEST_RELEASE}_{browser_version}"))
            .await
    }
}

// --- Tests ---
