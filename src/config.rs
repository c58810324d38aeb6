//! Typed configuration with layered loading.
//!
//! Values come from the compiled-in defaults, then an optional `webdrivermanager.properties`
//! file, then environment variables, merged with `figment`. Every key has the form
//! `wdm.<name>`; the matching environment variable is the key uppercased with dots replaced by
//! underscores (`wdm.targetPath` → `WDM_TARGETPATH`).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use figment::providers::Env;
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use tracing::{debug, trace};

use crate::error::WebDriverError;
use crate::platform::{Architecture, BrowserType, OperatingSystem};

/// Properties file looked up in the working directory.
pub const PROPERTIES_FILE: &str = "webdrivermanager.properties";

/// Environment variable pointing at an alternative properties file.
pub const PROPERTIES_ENV: &str = "WDM_PROPERTIES";

const KEY_PREFIX: &str = "wdm.";

const ENV_PREFIX: &str = "WDM_";

/// Default Chrome-for-Testing endpoint listing every chromedriver since 115.
pub const CHROME_FOR_TESTING_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/known-good-versions-with-downloads.json";

const SCALAR_KEYS: &[&str] = &[
    "targetPath",
    "forceCache",
    "override",
    "useMirror",
    "useBetaVersions",
    "avoidExport",
    "avoidOutputTree",
    "avoidAutoVersion",
    "avoidAutoReset",
    "avoidPreferences",
    "timeout",
    "ttl",
    "serverPort",
    "architecture",
    "os",
    "proxy",
    "proxyUser",
    "proxyPass",
    "ignoreVersions",
    "gitHubTokenName",
    "gitHubTokenSecret",
    "localRepositoryUser",
    "localRepositoryPassword",
    "versionsPropertiesOnlineFirst",
    "versionsPropertiesUrl",
    "preferencesPath",
    "chromeDriverCftUrl",
];

const DRIVER_SUFFIXES: &[&str] = &["Version", "Export", "Url", "MirrorUrl"];

/// Per-browser settings: pinned version, export variable, listing URL and mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub version: Option<String>,
    pub export: String,
    pub url: String,
    pub mirror_url: Option<String>,
}

impl DriverSettings {
    fn new(export: &str, url: &str, mirror_url: Option<&str>) -> Self {
        Self {
            version: None,
            export: export.to_string(),
            url: url.to_string(),
            mirror_url: mirror_url.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target_path: PathBuf,
    pub force_cache: bool,
    pub override_cache: bool,
    pub use_mirror: bool,
    pub use_beta_versions: bool,
    pub avoid_export: bool,
    pub avoid_output_tree: bool,
    pub avoid_auto_version: bool,
    pub avoid_auto_reset: bool,
    pub avoid_preferences: bool,
    /// HTTP timeout in seconds.
    pub timeout: u64,
    /// Preference time to live in seconds.
    pub ttl: u64,
    pub server_port: u16,
    pub architecture: Option<Architecture>,
    pub os: Option<OperatingSystem>,
    pub proxy: Option<String>,
    pub proxy_user: Option<String>,
    pub proxy_pass: Option<String>,
    pub ignore_versions: Vec<String>,
    pub github_token_name: Option<String>,
    pub github_token_secret: Option<String>,
    pub local_repository_user: Option<String>,
    pub local_repository_password: Option<String>,
    pub versions_properties_online_first: bool,
    pub versions_properties_url: String,
    pub preferences_path: PathBuf,
    pub chrome_driver_cft_url: String,
    pub chrome: DriverSettings,
    pub gecko: DriverSettings,
    pub edge: DriverSettings,
    pub opera: DriverSettings,
    pub phantomjs: DriverSettings,
    pub iexplorer: DriverSettings,
    pub selenium_server: DriverSettings,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let preferences_dir = dirs::config_dir().unwrap_or_else(|| home.clone());

        Self {
            target_path: home.join(".m2").join("repository").join("webdriver"),
            force_cache: false,
            override_cache: false,
            use_mirror: false,
            use_beta_versions: false,
            avoid_export: false,
            avoid_output_tree: false,
            avoid_auto_version: false,
            avoid_auto_reset: false,
            avoid_preferences: false,
            timeout: 30,
            ttl: 86_400,
            server_port: 4041,
            architecture: None,
            os: None,
            proxy: None,
            proxy_user: None,
            proxy_pass: None,
            ignore_versions: Vec::new(),
            github_token_name: None,
            github_token_secret: None,
            local_repository_user: None,
            local_repository_password: None,
            versions_properties_online_first: true,
            versions_properties_url: "https://raw.githubusercontent.com/bonigarcia/webdrivermanager/master/src/main/resources/versions.properties".to_string(),
            preferences_path: preferences_dir.join("webdrivermanager").join("preferences.json"),
            chrome_driver_cft_url: CHROME_FOR_TESTING_URL.to_string(),
            chrome: DriverSettings::new(
                "webdriver.chrome.driver",
                "https://chromedriver.storage.googleapis.com/",
                Some("https://registry.npmmirror.com/-/binary/chromedriver/"),
            ),
            gecko: DriverSettings::new(
                "webdriver.gecko.driver",
                "https://api.github.com/repos/mozilla/geckodriver/releases",
                Some("https://registry.npmmirror.com/-/binary/geckodriver/"),
            ),
            edge: DriverSettings::new(
                "webdriver.edge.driver",
                "https://developer.microsoft.com/en-us/microsoft-edge/tools/webdriver/",
                None,
            ),
            opera: DriverSettings::new(
                "webdriver.opera.driver",
                "https://api.github.com/repos/operasoftware/operachromiumdriver/releases",
                Some("https://registry.npmmirror.com/-/binary/operadriver/"),
            ),
            phantomjs: DriverSettings::new(
                "phantomjs.binary.path",
                "https://bitbucket.org/ariya/phantomjs/downloads/",
                Some("https://registry.npmmirror.com/-/binary/phantomjs/"),
            ),
            iexplorer: DriverSettings::new(
                "webdriver.ie.driver",
                "https://selenium-release.storage.googleapis.com/",
                None,
            ),
            selenium_server: DriverSettings::new(
                "selenium.server.standalone",
                "https://selenium-release.storage.googleapis.com/",
                None,
            ),
        }
    }
}

impl Config {
    /// Loads defaults, then the properties file, then `WDM_*` environment variables.
    pub fn load() -> Result<Self, WebDriverError> {
        let properties_path = std::env::var(PROPERTIES_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(PROPERTIES_FILE));
        let figment = Figment::new()
            .merge(PropertiesFile::new(properties_path))
            .merge(PrefixedEnv::new(Env::prefixed(ENV_PREFIX)));
        Self::from_figment(&figment)
    }

    /// Applies every value collected by `figment` over the defaults. Keys are option names
    /// without the `wdm.` prefix.
    pub fn from_figment(figment: &Figment) -> Result<Self, WebDriverError> {
        let values: BTreeMap<String, String> = figment.extract()?;
        let mut config = Config::default();
        for (name, value) in &values {
            trace!("Configuring {} from external source", name);
            config.set(name, value)?;
        }
        Ok(config)
    }

    /// Restores every value to its compiled-in default.
    pub fn reset(&mut self) {
        *self = Config::default();
    }

    /// Applies one `wdm.*` key. The `wdm.` prefix is optional.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), WebDriverError> {
        let name = key.strip_prefix(KEY_PREFIX).unwrap_or(key);
        let full_key = format!("{KEY_PREFIX}{name}");
        let value = value.trim();

        match name {
            "targetPath" => self.target_path = expand_home(value),
            "forceCache" => self.force_cache = parse_bool(&full_key, value)?,
            "override" => self.override_cache = parse_bool(&full_key, value)?,
            "useMirror" => self.use_mirror = parse_bool(&full_key, value)?,
            "useBetaVersions" => self.use_beta_versions = parse_bool(&full_key, value)?,
            "avoidExport" => self.avoid_export = parse_bool(&full_key, value)?,
            "avoidOutputTree" => self.avoid_output_tree = parse_bool(&full_key, value)?,
            "avoidAutoVersion" => self.avoid_auto_version = parse_bool(&full_key, value)?,
            "avoidAutoReset" => self.avoid_auto_reset = parse_bool(&full_key, value)?,
            "avoidPreferences" => self.avoid_preferences = parse_bool(&full_key, value)?,
            "timeout" => self.timeout = parse_number(&full_key, value)?,
            "ttl" => self.ttl = parse_number(&full_key, value)?,
            "serverPort" => self.server_port = parse_number(&full_key, value)?,
            "architecture" => {
                self.architecture = match value {
                    "" => None,
                    v => Some(v.parse()?),
                }
            }
            "os" => {
                self.os = match value {
                    "" => None,
                    v => Some(v.parse()?),
                }
            }
            "proxy" => self.proxy = non_empty(value),
            "proxyUser" => self.proxy_user = non_empty(value),
            "proxyPass" => self.proxy_pass = non_empty(value),
            "ignoreVersions" => {
                self.ignore_versions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "gitHubTokenName" => self.github_token_name = non_empty(value),
            "gitHubTokenSecret" => self.github_token_secret = non_empty(value),
            "localRepositoryUser" => self.local_repository_user = non_empty(value),
            "localRepositoryPassword" => self.local_repository_password = non_empty(value),
            "versionsPropertiesOnlineFirst" => {
                self.versions_properties_online_first = parse_bool(&full_key, value)?
            }
            "versionsPropertiesUrl" => self.versions_properties_url = value.to_string(),
            "preferencesPath" => self.preferences_path = expand_home(value),
            "chromeDriverCftUrl" => self.chrome_driver_cft_url = value.to_string(),
            _ => return self.set_driver_key(&full_key, name, value),
        }
        Ok(())
    }

    fn set_driver_key(&mut self, full_key: &str, name: &str, value: &str) -> Result<(), WebDriverError> {
        for (prefix, browser) in DRIVER_PREFIXES {
            let Some(suffix) = name.strip_prefix(prefix) else {
                continue;
            };
            let settings = self.driver_mut(*browser)?;
            match suffix {
                "Version" => settings.version = non_empty(value),
                "Export" => settings.export = value.to_string(),
                "Url" => settings.url = value.to_string(),
                "MirrorUrl" => settings.mirror_url = non_empty(value),
                _ => continue,
            }
            return Ok(());
        }
        Err(WebDriverError::config(full_key, value, "unknown configuration key"))
    }

    /// Settings of `browser`'s driver. `Void` has none.
    pub fn driver(&self, browser: BrowserType) -> Result<&DriverSettings, WebDriverError> {
        let settings = match browser {
            BrowserType::Chrome => &self.chrome,
            BrowserType::Firefox => &self.gecko,
            BrowserType::Edge => &self.edge,
            BrowserType::Opera => &self.opera,
            BrowserType::PhantomJs => &self.phantomjs,
            BrowserType::IExplorer => &self.iexplorer,
            BrowserType::SeleniumServerStandalone => &self.selenium_server,
            BrowserType::Void => return Err(WebDriverError::UnsupportedBrowser(browser.to_string())),
        };
        Ok(settings)
    }

    pub fn driver_mut(&mut self, browser: BrowserType) -> Result<&mut DriverSettings, WebDriverError> {
        let settings = match browser {
            BrowserType::Chrome => &mut self.chrome,
            BrowserType::Firefox => &mut self.gecko,
            BrowserType::Edge => &mut self.edge,
            BrowserType::Opera => &mut self.opera,
            BrowserType::PhantomJs => &mut self.phantomjs,
            BrowserType::IExplorer => &mut self.iexplorer,
            BrowserType::SeleniumServerStandalone => &mut self.selenium_server,
            BrowserType::Void => return Err(WebDriverError::UnsupportedBrowser(browser.to_string())),
        };
        Ok(settings)
    }

    pub fn use_preferences(&self) -> bool {
        !self.avoid_preferences
    }

    /// GitHub token pair, when both halves are configured.
    pub fn github_token(&self) -> Option<(&str, &str)> {
        match (&self.github_token_name, &self.github_token_secret) {
            (Some(name), Some(secret)) => Some((name, secret)),
            _ => None,
        }
    }

    pub fn local_repository_credentials(&self) -> Option<(&str, &str)> {
        match (&self.local_repository_user, &self.local_repository_password) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }
}

const DRIVER_PREFIXES: &[(&str, BrowserType)] = &[
    ("chromeDriver", BrowserType::Chrome),
    ("geckoDriver", BrowserType::Firefox),
    ("edgeDriver", BrowserType::Edge),
    ("operaDriver", BrowserType::Opera),
    ("phantomjs", BrowserType::PhantomJs),
    ("internetExplorerDriver", BrowserType::IExplorer),
    ("seleniumServerStandalone", BrowserType::SeleniumServerStandalone),
];

/// Every recognized key, prefixed with `wdm.`.
pub fn all_keys() -> Vec<String> {
    let scalar = SCALAR_KEYS.iter().map(|k| format!("{KEY_PREFIX}{k}"));
    let per_driver = DRIVER_PREFIXES.iter().flat_map(|(prefix, _)| {
        DRIVER_SUFFIXES
            .iter()
            .map(move |suffix| format!("{KEY_PREFIX}{prefix}{suffix}"))
    });
    scalar.chain(per_driver).collect()
}

/// Option name for an environment variable stripped of `WDM_`: `TARGETPATH` → `targetPath`.
pub fn option_for_env(var: &str) -> Option<String> {
    all_keys()
        .into_iter()
        .map(|key| key[KEY_PREFIX.len()..].to_string())
        .find(|name| name.eq_ignore_ascii_case(var))
}

/// Parses `key=value` lines; `#` and `!` start comments.
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// `key=value` properties file as a figment source. Only `wdm.*` keys are taken; a missing
/// file contributes nothing.
pub struct PropertiesFile {
    path: PathBuf,
}

impl PropertiesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Provider for PropertiesFile {
    fn metadata(&self) -> Metadata {
        Metadata::named("properties file")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        debug!("Reading configuration from {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("{}: {}", self.path.display(), e))?;
        let dict = parse_properties(&content)
            .into_iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(KEY_PREFIX)?.to_string();
                Some((name, Value::from(value)))
            })
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

/// `WDM_*` variables mapped onto option names. Values are kept as raw strings so versions
/// such as `2.40` reach [`Config::set`] untouched.
pub struct PrefixedEnv {
    env: Env,
}

impl PrefixedEnv {
    pub fn new(env: Env) -> Self {
        Self { env }
    }
}

impl Provider for PrefixedEnv {
    fn metadata(&self) -> Metadata {
        Metadata::named("WDM_ environment variables")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let dict = self
            .env
            .iter()
            .filter_map(|(key, value)| {
                let name = option_for_env(key.as_str())?;
                Some((name, Value::from(value)))
            })
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, WebDriverError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        _ => Err(WebDriverError::config(key, value, "expected true or false")),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, WebDriverError> {
    value
        .parse()
        .map_err(|_| WebDriverError::config(key, value, "expected a number"))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(value),
    }
}
