//! The resolution engine shared by every browser.
//!
//! [`Resolver::resolve`] decides which artifact satisfies a [`DriverRequest`]: an explicit
//! version, a version derived from the installed browser, the vendor's latest release, a
//! cached binary, or the best match in the vendor listing. [`Resolver::setup`] also downloads
//! the winner, retrying once with the cache and mirror forced on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::browser::{BrowserProbe, SystemBrowserProbe};
use crate::cache::CacheIndex;
use crate::config::Config;
use crate::downloader;
use crate::drivers::{self, ListingContext, file_name};
use crate::error::WebDriverError;
use crate::filter;
use crate::http::HttpClient;
use crate::platform::{Architecture, BrowserType, OperatingSystem};
use crate::preferences::PreferenceStore;
use crate::version::{max_version, version_compare};
use crate::versions::VersionsProperties;
use crate::WebDriverManager;

/// Version sentinel selecting the driver shipped with the operating system.
pub const PREINSTALLED: &str = "pre-installed";

const LATEST: &str = "latest";
const BETA: &str = "beta";

/// What the caller asks for. Immutable for the duration of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRequest {
    browser: BrowserType,
    version: Option<String>,
    architecture: Architecture,
    os: OperatingSystem,
    forced_architecture: bool,
    forced_os: bool,
}

impl DriverRequest {
    pub fn new(browser: BrowserType) -> Self {
        Self {
            browser,
            version: None,
            architecture: Architecture::Default,
            os: OperatingSystem::current(),
            forced_architecture: false,
            forced_os: false,
        }
    }

    /// Pins a driver version. Empty and `latest` leave the version to be resolved.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self.forced_architecture = true;
        self
    }

    pub fn os(mut self, os: OperatingSystem) -> Self {
        self.os = os;
        self.forced_os = true;
        self
    }

    pub fn browser(&self) -> BrowserType {
        self.browser
    }

    /// The pinned version, if it is a concrete one.
    pub fn requested_version(&self) -> Option<&str> {
        concrete(self.version.as_deref())
    }
}

fn concrete(version: Option<&str>) -> Option<&str> {
    version
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(LATEST))
}

/// Outcome of the resolution pipeline, before anything is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The operating system already ships the driver.
    Preinstalled { path: PathBuf },
    /// A usable binary is already in the cache.
    CacheHit { path: PathBuf, version: String },
    /// Download URLs for `version`, best first.
    Candidates { version: String, urls: Vec<Url> },
}

/// A driver binary ready to be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    pub browser: BrowserType,
    pub version: String,
    pub path: PathBuf,
    pub from_cache: bool,
    /// Variable conventionally pointing at this driver (`webdriver.chrome.driver`); `None`
    /// when exporting is disabled.
    pub export_variable: Option<String>,
}

impl ResolvedDriver {
    /// Sets [`ResolvedDriver::export_variable`] to the driver path in this process's
    /// environment.
    ///
    /// # Safety
    ///
    /// Mutates the process environment; see [`std::env::set_var`]. No other thread may read
    /// or write the environment concurrently.
    pub unsafe fn export_env(&self) {
        if let Some(variable) = &self.export_variable {
            debug!("Exporting {} as {}", variable, self.path.display());
            // SAFETY: upheld by the caller.
            unsafe { std::env::set_var(variable, &self.path) };
        }
    }
}

/// Versions remembered across calls on the same resolver.
#[derive(Debug, Default, Clone)]
pub struct SessionCache {
    latest: HashMap<BrowserType, String>,
    downloaded: HashMap<BrowserType, String>,
}

impl SessionCache {
    /// Latest version found by a previous listing sweep.
    pub fn latest_version(&self, browser: BrowserType) -> Option<&str> {
        self.latest.get(&browser).map(String::as_str)
    }

    /// Version of the last driver set up for `browser`.
    pub fn downloaded_version(&self, browser: BrowserType) -> Option<&str> {
        self.downloaded.get(&browser).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Pass {
    force_cache: bool,
    use_mirror: bool,
    retried: bool,
}

/// Everything one pass learned, beyond the [`Resolution`] itself.
struct Plan {
    resolution: Resolution,
    auto_resolved: bool,
    browser_version: Option<String>,
    os: OperatingSystem,
    architecture: Architecture,
}

struct Platform {
    os: OperatingSystem,
    architecture: Architecture,
    forced_architecture: bool,
}

pub struct Resolver {
    config: Config,
    baseline: Config,
    http: HttpClient,
    http_config: Config,
    probe: Box<dyn BrowserProbe>,
    preferences: PreferenceStore,
    versions: VersionsProperties,
    session: SessionCache,
    distro_codename: Option<String>,
}

impl Resolver {
    /// Creates a resolver probing the real browsers and persisting preferences to
    /// `wdm.preferencesPath` (in memory with `wdm.avoidPreferences`).
    pub fn new(config: Config) -> Result<Self, WebDriverError> {
        let http = HttpClient::new(&config)?;
        let preferences = if config.use_preferences() {
            PreferenceStore::open(&config.preferences_path, config.ttl)
        } else {
            PreferenceStore::in_memory(config.ttl)
        };
        Ok(Self {
            versions: VersionsProperties::new(&config),
            baseline: config.clone(),
            http_config: config.clone(),
            config,
            http,
            probe: Box::new(SystemBrowserProbe),
            preferences,
            session: SessionCache::default(),
            distro_codename: None,
        })
    }

    pub fn with_probe(mut self, probe: impl BrowserProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_preferences(mut self, preferences: PreferenceStore) -> Self {
        self.preferences = preferences;
        self
    }

    /// Uses `codename` instead of the one read from `/etc/*-release`.
    pub fn with_distro_codename(mut self, codename: impl Into<String>) -> Self {
        self.distro_codename = Some(codename.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configuration for the next call. Unless `wdm.avoidAutoReset` is set, changes are
    /// undone after every [`Resolver::setup`].
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn clear_preferences(&mut self) -> Result<(), WebDriverError> {
        self.preferences.clear()
    }

    /// Runs the resolution pipeline without downloading anything.
    pub async fn resolve(&mut self, request: &DriverRequest) -> Result<Resolution, WebDriverError> {
        self.refresh_clients()?;
        Ok(self.resolve_pass(request, Pass::default()).await?.resolution)
    }

    /// Resolves and downloads a driver.
    pub async fn setup(&mut self, request: &DriverRequest) -> Result<ResolvedDriver, WebDriverError> {
        let result = self.setup_with_retry(request).await;
        if !self.config.avoid_auto_reset {
            trace!("Resetting configuration");
            self.config = self.baseline.clone();
        }
        result
    }

    async fn setup_with_retry(
        &mut self,
        request: &DriverRequest,
    ) -> Result<ResolvedDriver, WebDriverError> {
        self.refresh_clients()?;
        let mut pass = Pass::default();
        loop {
            match self.manage(request, pass).await {
                Ok(driver) => return Ok(driver),
                Err(e) if e.is_retryable() && !pass.retried && !self.config.force_cache => {
                    warn!(
                        "There was an error managing {} ({}), trying again using cache and mirror",
                        request.browser(),
                        e
                    );
                    pass = Pass {
                        force_cache: true,
                        use_mirror: true,
                        retried: true,
                    };
                }
                Err(e) => {
                    let e = self.resolution_error(request, pass, e);
                    error!("{}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn manage(
        &mut self,
        request: &DriverRequest,
        pass: Pass,
    ) -> Result<ResolvedDriver, WebDriverError> {
        let strategy = drivers::for_browser(request.browser())?;
        let plan = self.resolve_pass(request, pass).await?;

        let settings = self.config.driver(request.browser())?;
        let export_variable = (!self.config.avoid_export && !settings.export.is_empty())
            .then(|| settings.export.clone());
        let resolved = |version: String, path: PathBuf, from_cache: bool| ResolvedDriver {
            browser: request.browser(),
            version,
            path: dunce::simplified(&path).to_path_buf(),
            from_cache,
            export_variable: export_variable.clone(),
        };

        let (version, urls) = match plan.resolution {
            Resolution::Preinstalled { path } => {
                return Ok(resolved(PREINSTALLED.to_string(), path, true));
            }
            Resolution::CacheHit { path, version } => {
                info!("Using {} {} (found in cache)", strategy.driver_name(), version);
                return Ok(resolved(version, path, true));
            }
            Resolution::Candidates { version, urls } => (version, urls),
        };

        let url = urls
            .first()
            .ok_or_else(|| self.not_found(&*strategy, &version, plan.os, plan.architecture, pass))?;
        let root = &self.config.target_path;
        let target = if self.config.avoid_output_tree {
            root.join(file_name(url))
        } else {
            strategy.target_path(root, &version, url, plan.architecture)
        };
        // A flat tree holds one binary per name whatever its version.
        let replace_existing = self.config.override_cache || self.config.avoid_output_tree;
        let path = downloader::download(
            &self.http,
            url,
            &target,
            &strategy.binary_name(plan.os),
            replace_existing,
        )
        .await?;
        info!("Using {} {} ({})", strategy.driver_name(), version, path.display());

        self.session
            .downloaded
            .insert(request.browser(), version.clone());
        if plan.auto_resolved && self.config.use_preferences() {
            if let Some(browser_version) = &plan.browser_version {
                let key = format!("{}{}", request.browser().key(), browser_version);
                if let Err(e) = self.preferences.put_if_absent(&key, &version) {
                    warn!("Could not store preference {}: {}", key, e);
                }
            }
        }

        Ok(resolved(version, path, false))
    }

    async fn resolve_pass(
        &mut self,
        request: &DriverRequest,
        pass: Pass,
    ) -> Result<Plan, WebDriverError> {
        let browser = request.browser();
        let strategy = drivers::for_browser(browser)?;
        let platform = self.platform(request);
        let use_mirror = pass.use_mirror || self.config.use_mirror;
        let mut force_cache = pass.force_cache || self.config.force_cache;

        // --- 1. Explicit version, from the request or the configuration.
        let configured = self.config.driver(browser)?.version.as_deref();
        let mut version = request
            .requested_version()
            .or_else(|| concrete(configured))
            .map(str::to_string);
        let auto_resolved = version.is_none();

        // --- 2. Driver shipped with the operating system.
        if version.as_deref() == Some(PREINSTALLED) {
            return self.preinstalled(&*strategy).map(|path| Plan {
                resolution: Resolution::Preinstalled { path },
                auto_resolved,
                browser_version: None,
                os: platform.os,
                architecture: platform.architecture,
            });
        }

        // --- 3. Version matching the installed browser.
        let mut browser_version = None;
        if version.is_none() && !self.config.avoid_auto_version {
            let (detected, driver_version) = self
                .version_for_installed_browser(&*strategy, use_mirror)
                .await;
            browser_version = detected;
            version = driver_version;
        }

        // --- 4. Vendor's latest release.
        if version.is_none() && !self.config.use_beta_versions && !use_mirror {
            let ctx = ListingContext {
                http: &self.http,
                config: &self.config,
                use_mirror,
            };
            match strategy.latest_version(&ctx).await {
                Ok(latest) => version = latest,
                Err(e) => warn!("Could not read latest version of {}: {}", strategy.driver_name(), e),
            }
        }
        if version.is_none() {
            if let Some(latest) = self.session.latest_version(browser) {
                debug!("Reusing latest version {} found earlier", latest);
                version = Some(latest.to_string());
                force_cache = true;
            }
        }
        let get_latest = version.is_none();

        // --- 5. Cache.
        if force_cache || !get_latest {
            let index = CacheIndex::scan(&self.config.target_path);
            let found = index.find(
                strategy.driver_name(),
                version.as_deref().unwrap_or(""),
                platform.os,
                platform.architecture,
                strategy.os_agnostic(),
            );
            if let Some(path) = found {
                if !self.config.override_cache {
                    let version = version
                        .clone()
                        .or_else(|| cached_version(&path))
                        .unwrap_or_default();
                    return Ok(Plan {
                        resolution: Resolution::CacheHit { path, version },
                        auto_resolved,
                        browser_version,
                        os: platform.os,
                        architecture: platform.architecture,
                    });
                }
                debug!("Ignoring cached {} since override is set", path.display());
            }
        }

        // --- 6. Listing.
        let ctx = ListingContext {
            http: &self.http,
            config: &self.config,
            use_mirror,
        };
        let listing_name = strategy.listing_name().to_ascii_lowercase();
        let mut pool: Vec<Url> = strategy
            .list_candidates(&ctx)
            .await?
            .into_iter()
            .filter(|url| file_name(url).to_ascii_lowercase().contains(&listing_name))
            .collect();
        trace!("{} candidate URLs for {}", pool.len(), strategy.driver_name());

        let distro = match strategy.distro_specific_version() {
            Some(special) if platform.os == OperatingSystem::Linux => self
                .distro_codename
                .clone()
                .or_else(filter::distro_codename)
                .map(|codename| (special, codename)),
            _ => None,
        };

        let (version, urls) = loop {
            let selected = if get_latest {
                latest_candidates(&*strategy, &pool, self.config.use_beta_versions)
            } else {
                let requested = version.as_deref().unwrap_or_default();
                exact_candidates(&*strategy, &pool, requested)
            };
            let (selected_version, mut urls) = match selected {
                Some(selected) => selected,
                None => break (version.clone().unwrap_or_else(|| LATEST.to_string()), Vec::new()),
            };

            if !strategy.os_agnostic() {
                urls = filter::filter_by_os(&urls, platform.os);
            }
            urls = filter::filter_by_arch(&urls, platform.architecture, platform.forced_architecture);
            if let Some((special, codename)) = &distro {
                if is_release_of(&selected_version, special) {
                    urls = filter::filter_by_distro(&urls, special, codename);
                }
            }
            urls = filter::filter_by_ignored_versions(&urls, &self.config.ignore_versions);

            if !urls.is_empty() || !get_latest {
                break (selected_version, urls);
            }
            debug!(
                "No {} {} for {}{}, trying the next version",
                strategy.driver_name(),
                selected_version,
                platform.os,
                platform.architecture
            );
            pool.retain(|url| {
                strategy.current_version(url).as_deref() != Some(selected_version.as_str())
            });
        };

        if urls.is_empty() {
            return Err(WebDriverError::DriverNotFound {
                driver: strategy.driver_name().to_string(),
                version,
                os: platform.os.to_string(),
                arch: platform.architecture.to_string(),
                url: self.consulted_url(&*strategy, use_mirror),
            });
        }
        if get_latest {
            info!("Latest version of {} is {}", strategy.driver_name(), version);
            self.session.latest.insert(browser, version.clone());
        }

        Ok(Plan {
            resolution: Resolution::Candidates { version, urls },
            auto_resolved,
            browser_version,
            os: platform.os,
            architecture: platform.architecture,
        })
    }

    /// Returns `(browser major version, driver version)` for the installed browser.
    ///
    /// Only the family key (`chrome` → `79`) is written here; the composite key is stored
    /// once a download succeeds.
    async fn version_for_installed_browser(
        &mut self,
        strategy: &dyn WebDriverManager,
        use_mirror: bool,
    ) -> (Option<String>, Option<String>) {
        let browser = strategy.browser_type();
        let family = browser.key();
        let use_preferences = self.config.use_preferences();

        let mut browser_version = if use_preferences {
            self.preferences.get(family)
        } else {
            None
        };
        if browser_version.is_none() {
            browser_version = match self.probe.detect_installed_version(browser).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("Could not detect installed {} version: {}", browser, e);
                    None
                }
            };
        }
        let Some(browser_version) = browser_version else {
            return (None, None);
        };

        let key = format!("{family}{browser_version}");
        let mut driver_version = if use_preferences {
            self.preferences.get(&key)
        } else {
            None
        };
        if driver_version.is_none() {
            driver_version = self.versions.get(&self.http, &key).await;
        }
        if driver_version.is_none() {
            let ctx = ListingContext {
                http: &self.http,
                config: &self.config,
                use_mirror,
            };
            driver_version = strategy
                .driver_version_for_browser(&ctx, &browser_version)
                .await
                .unwrap_or_else(|e| {
                    warn!("Could not map {} {} to a driver version: {}", browser, browser_version, e);
                    None
                });
        }

        if let Some(driver_version) = &driver_version {
            info!(
                "Using {} {} for {} {}",
                strategy.driver_name(),
                driver_version,
                browser,
                browser_version
            );
            if use_preferences {
                if let Err(e) = self.preferences.put_if_absent(family, &browser_version) {
                    warn!("Could not store preference {}: {}", family, e);
                }
            }
        }
        (Some(browser_version), driver_version)
    }

    fn preinstalled(&self, strategy: &dyn WebDriverManager) -> Result<PathBuf, WebDriverError> {
        let path = strategy.preinstalled_driver().ok_or_else(|| {
            WebDriverError::UnsupportedBrowser(format!(
                "{} has no pre-installed driver",
                strategy.browser_type()
            ))
        })?;
        if path.exists() {
            info!("Using pre-installed {}", path.display());
            Ok(path)
        } else {
            Err(WebDriverError::PreinstalledDriverMissing { path })
        }
    }

    fn platform(&self, request: &DriverRequest) -> Platform {
        let (architecture, forced_architecture) = if request.forced_architecture {
            (request.architecture, true)
        } else if let Some(architecture) = self.config.architecture {
            (architecture, true)
        } else {
            (Architecture::Default, false)
        };
        let os = if request.forced_os {
            request.os
        } else {
            self.config.os.unwrap_or(request.os)
        };
        Platform {
            os,
            architecture,
            forced_architecture,
        }
    }

    fn consulted_url(&self, strategy: &dyn WebDriverManager, use_mirror: bool) -> String {
        strategy
            .listing_source(&self.config, use_mirror)
            .map(|(_, url)| url.to_string())
            .or_else(|_| {
                self.config
                    .driver(strategy.browser_type())
                    .map(|settings| settings.url.clone())
            })
            .unwrap_or_default()
    }

    fn not_found(
        &self,
        strategy: &dyn WebDriverManager,
        version: &str,
        os: OperatingSystem,
        architecture: Architecture,
        pass: Pass,
    ) -> WebDriverError {
        WebDriverError::DriverNotFound {
            driver: strategy.driver_name().to_string(),
            version: version.to_string(),
            os: os.to_string(),
            arch: architecture.to_string(),
            url: self.consulted_url(strategy, pass.use_mirror || self.config.use_mirror),
        }
    }

    fn resolution_error(
        &self,
        request: &DriverRequest,
        pass: Pass,
        source: WebDriverError,
    ) -> WebDriverError {
        let platform = self.platform(request);
        let driver = drivers::for_browser(request.browser())
            .map(|s| s.driver_name().to_string())
            .unwrap_or_else(|_| request.browser().to_string());
        let url = match drivers::for_browser(request.browser()) {
            Ok(strategy) => self.consulted_url(&*strategy, pass.use_mirror || self.config.use_mirror),
            Err(_) => String::new(),
        };
        WebDriverError::Resolution {
            driver,
            version: request
                .requested_version()
                .map(str::to_string)
                .unwrap_or_else(|| LATEST.to_string()),
            os: platform.os.to_string(),
            arch: platform.architecture.to_string(),
            url,
            source: Box::new(source),
        }
    }

    /// Rebuilds the HTTP client and versions table after configuration changes.
    fn refresh_clients(&mut self) -> Result<(), WebDriverError> {
        if self.config != self.http_config {
            self.http = HttpClient::new(&self.config)?;
            self.versions = VersionsProperties::new(&self.config);
            self.http_config = self.config.clone();
        }
        Ok(())
    }
}

/// Candidates of the greatest version in `pool`. URLs mentioning `beta` are skipped unless
/// `use_beta` is set.
fn latest_candidates(
    strategy: &dyn WebDriverManager,
    pool: &[Url],
    use_beta: bool,
) -> Option<(String, Vec<Url>)> {
    let versioned: Vec<(String, &Url)> = pool
        .iter()
        .filter(|url| use_beta || !url.as_str().to_ascii_lowercase().contains(BETA))
        .filter_map(|url| strategy.current_version(url).map(|v| (v, url)))
        .collect();
    let latest = max_version(versioned.iter().map(|(v, _)| v.as_str()))?.to_string();
    let urls = versioned
        .iter()
        .filter(|(v, _)| version_compare(v, &latest).is_eq())
        .map(|(_, url)| (*url).clone())
        .collect();
    Some((latest, urls))
}

/// Candidates whose version equals `requested`, or else the greatest `<requested>.*` or
/// `<requested>-*` version.
fn exact_candidates(
    strategy: &dyn WebDriverManager,
    pool: &[Url],
    requested: &str,
) -> Option<(String, Vec<Url>)> {
    let versioned: Vec<(String, &Url)> = pool
        .iter()
        .filter_map(|url| strategy.current_version(url).map(|v| (v, url)))
        .collect();

    let exact: Vec<Url> = versioned
        .iter()
        .filter(|(v, _)| v == requested)
        .map(|(_, url)| (*url).clone())
        .collect();
    if !exact.is_empty() {
        return Some((requested.to_string(), exact));
    }

    let best = max_version(
        versioned
            .iter()
            .map(|(v, _)| v.as_str())
            .filter(|v| v.starts_with(&format!("{requested}.")) || is_release_of(v, requested)),
    )?
    .to_string();
    debug!("No exact match for {}, using {}", requested, best);
    let urls = versioned
        .iter()
        .filter(|(v, _)| *v == best)
        .map(|(_, url)| (*url).clone())
        .collect();
    Some((best, urls))
}

/// `2.5.0-beta` is a build of `2.5.0`.
fn is_release_of(version: &str, release: &str) -> bool {
    version == release
        || version
            .strip_prefix(release)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Version directory of a cached binary: `<root>/<name>/.../<version>/<binary>`.
fn cached_version(path: &Path) -> Option<String> {
    path.parent()?
        .file_name()?
        .to_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowserProbe;
    use crate::drivers::chromedriver::ChromeDriver;
    use crate::drivers::geckodriver::FirefoxDriver;
    use crate::drivers::phantomjs::PhantomJsDriver;
    use mockito::Server;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn offline_config(cache: &Path) -> Config {
        let mut config = Config::default();
        config.target_path = cache.to_path_buf();
        config.preferences_path = cache.join("preferences.json");
        config.avoid_preferences = true;
        config.versions_properties_online_first = false;
        config.versions_properties_url = "http://127.0.0.1:9/versions.properties".to_string();
        config.chrome_driver_cft_url = String::new();
        config.chrome.mirror_url = None;
        config
    }

    #[test]
    fn latest_and_empty_versions_are_not_concrete() {
        assert_eq!(DriverRequest::new(BrowserType::Chrome).requested_version(), None);
        assert_eq!(DriverRequest::new(BrowserType::Chrome).version("").requested_version(), None);
        assert_eq!(
            DriverRequest::new(BrowserType::Chrome).version("LATEST").requested_version(),
            None
        );
        assert_eq!(
            DriverRequest::new(BrowserType::Chrome).version("2.21").requested_version(),
            Some("2.21")
        );
    }

    #[test]
    fn latest_skips_betas_unless_enabled() {
        let pool = vec![
            url("https://host/geckodriver-v0.26.0-linux64.tar.gz"),
            url("https://host/geckodriver-v0.27.0-beta-linux64.tar.gz"),
            url("https://host/geckodriver-v0.9.0-linux64.tar.gz"),
        ];
        let (stable, _) = latest_candidates(&FirefoxDriver, &pool, false).unwrap();
        assert_eq!(stable, "0.26.0");
        let (beta, urls) = latest_candidates(&FirefoxDriver, &pool, true).unwrap();
        assert_eq!(beta, "0.27.0-beta");
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn exact_match_falls_back_to_highest_prefixed_version() {
        let pool = vec![
            url("https://host/79.0.3945.16/chromedriver_linux64.zip"),
            url("https://host/79.0.3945.36/chromedriver_linux64.zip"),
            url("https://host/2.21/chromedriver_linux64.zip"),
        ];
        let (version, urls) = exact_candidates(&ChromeDriver, &pool, "2.21").unwrap();
        assert_eq!(version, "2.21");
        assert_eq!(urls.len(), 1);

        let (version, _) = exact_candidates(&ChromeDriver, &pool, "79").unwrap();
        assert_eq!(version, "79.0.3945.36");

        assert!(exact_candidates(&ChromeDriver, &pool, "99").is_none());
    }

    #[test]
    fn cached_version_is_the_parent_directory() {
        assert_eq!(
            cached_version(Path::new("/cache/chromedriver/linux64/2.21/chromedriver")).as_deref(),
            Some("2.21")
        );
    }

    #[tokio::test]
    async fn explicit_version_is_served_from_cache() {
        let cache = tempfile::tempdir().unwrap();
        let binary = cache.path().join("chromedriver/linux64/2.21/chromedriver");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "bin").unwrap();

        let mut resolver = Resolver::new(offline_config(cache.path())).unwrap();
        let request = DriverRequest::new(BrowserType::Chrome)
            .version("2.21")
            .os(OperatingSystem::Linux)
            .architecture(Architecture::X64);
        let resolution = resolver.resolve(&request).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::CacheHit {
                path: binary,
                version: "2.21".to_string()
            }
        );
    }

    #[tokio::test]
    async fn latest_sweep_moves_on_when_platform_is_missing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/mozilla/geckodriver/releases")
            .with_status(200)
            .with_body(
                r#"[
                    {"assets": [{"browser_download_url": "https://github.com/mozilla/geckodriver/releases/download/v0.27.0/geckodriver-v0.27.0-win64.zip"}]},
                    {"assets": [{"browser_download_url": "https://github.com/mozilla/geckodriver/releases/download/v0.26.0/geckodriver-v0.26.0-linux64.tar.gz"}]}
                ]"#,
            )
            .create_async()
            .await;

        let cache = tempfile::tempdir().unwrap();
        let mut config = offline_config(cache.path());
        config.avoid_auto_version = true;
        config.gecko.url = format!("{}/repos/mozilla/geckodriver/releases", server.url());
        let mut resolver = Resolver::new(config).unwrap();

        let request = DriverRequest::new(BrowserType::Firefox).os(OperatingSystem::Linux);
        match resolver.resolve(&request).await.unwrap() {
            Resolution::Candidates { version, urls } => {
                assert_eq!(version, "0.26.0");
                assert_eq!(urls.len(), 1);
            }
            other => panic!("unexpected resolution {other:?}"),
        }
        assert_eq!(resolver.session().latest_version(BrowserType::Firefox), Some("0.26.0"));
    }

    #[test]
    fn beta_builds_belong_to_their_release() {
        assert!(is_release_of("2.5.0-beta", "2.5.0"));
        assert!(is_release_of("2.5.0", "2.5.0"));
        assert!(!is_release_of("2.5.01", "2.5.0"));
        assert!(!is_release_of("2.1.1", "2.5.0"));

        let pool = vec![url("https://host/phantomjs-2.5.0-beta-linux-ubuntu-xenial-x86_64.tar.gz")];
        let (version, urls) = exact_candidates(&PhantomJsDriver, &pool, "2.5.0").unwrap();
        assert_eq!(version, "2.5.0-beta");
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn distro_builds_follow_host_codename() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/ariya/phantomjs/downloads/")
            .with_status(200)
            .with_body(
                r#"<html><body>
                <a href="phantomjs-2.5.0-beta-linux-ubuntu-trusty-x86_64.tar.gz">trusty</a>
                <a href="phantomjs-2.5.0-beta-linux-ubuntu-bookworm-x86_64.tar.gz">bookworm</a>
                <a href="phantomjs-2.1.1-linux-x86_64.tar.bz2">2.1.1</a>
                </body></html>"#,
            )
            .create_async()
            .await;

        let cache = tempfile::tempdir().unwrap();
        let mut config = offline_config(cache.path());
        config.avoid_auto_version = true;
        config.use_beta_versions = true;
        config.phantomjs.url = format!("{}/ariya/phantomjs/downloads/", server.url());
        config.phantomjs.mirror_url = None;
        let mut resolver = Resolver::new(config).unwrap().with_distro_codename("bookworm");

        let request = DriverRequest::new(BrowserType::PhantomJs)
            .os(OperatingSystem::Linux)
            .architecture(Architecture::X64);
        let bookworm = url(&format!(
            "{}/ariya/phantomjs/downloads/phantomjs-2.5.0-beta-linux-ubuntu-bookworm-x86_64.tar.gz",
            server.url()
        ));

        let latest = resolver.resolve(&request).await.unwrap();
        assert_eq!(
            latest,
            Resolution::Candidates {
                version: "2.5.0-beta".to_string(),
                urls: vec![bookworm.clone()],
            }
        );

        let pinned = resolver.resolve(&request.clone().version("2.5.0")).await.unwrap();
        assert_eq!(
            pinned,
            Resolution::Candidates {
                version: "2.5.0-beta".to_string(),
                urls: vec![bookworm],
            }
        );
    }

    #[tokio::test]
    async fn installed_browser_is_remembered_by_family() {
        let cache = tempfile::tempdir().unwrap();
        let binary = cache.path().join("chromedriver/linux64/79.0.3945.36/chromedriver");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "bin").unwrap();

        let mut config = offline_config(cache.path());
        config.avoid_preferences = false;
        let mut resolver = Resolver::new(config)
            .unwrap()
            .with_probe(StaticBrowserProbe::new().with_version(BrowserType::Chrome, "79.0.3945.88"))
            .with_preferences(PreferenceStore::in_memory(3600));

        let request = DriverRequest::new(BrowserType::Chrome)
            .os(OperatingSystem::Linux)
            .architecture(Architecture::X64);
        let resolution = resolver.resolve(&request).await.unwrap();
        assert!(matches!(resolution, Resolution::CacheHit { ref version, .. } if version == "79.0.3945.36"));

        assert_eq!(resolver.preferences.get("chrome").as_deref(), Some("79"));
        assert_eq!(resolver.preferences.get("chrome79"), None);
    }

    #[tokio::test]
    async fn missing_preinstalled_driver_is_fatal() {
        let preinstalled = crate::drivers::edgedriver::EdgeDriver.preinstalled_driver();
        if preinstalled.is_some_and(|p| p.exists()) {
            return;
        }
        let cache = tempfile::tempdir().unwrap();
        let mut resolver = Resolver::new(offline_config(cache.path())).unwrap();
        let request = DriverRequest::new(BrowserType::Edge).version(PREINSTALLED);

        let err = resolver.setup(&request).await.unwrap_err();
        match err {
            WebDriverError::Resolution { source, .. } => {
                assert!(matches!(*source, WebDriverError::PreinstalledDriverMissing { .. }))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn configuration_is_reset_after_setup() {
        let cache = tempfile::tempdir().unwrap();
        let mut resolver = Resolver::new(offline_config(cache.path())).unwrap();
        resolver.config_mut().chrome.url = "not a url".to_string();
        resolver.config_mut().avoid_auto_version = true;

        let request = DriverRequest::new(BrowserType::Chrome);
        assert!(resolver.setup(&request).await.is_err());
        assert_eq!(resolver.config().chrome.url, Config::default().chrome.url);
        assert!(!resolver.config().avoid_auto_version);
    }
}
