use std::fmt;
use std::str::FromStr;

use crate::error::WebDriverError;

/// Browser families a driver can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserType {
    Chrome,
    Firefox,
    Edge,
    Opera,
    IExplorer,
    PhantomJs,
    SeleniumServerStandalone,
    Void,
}

impl BrowserType {
    /// Lowercase family name, used to build preference and versions-properties keys.
    pub fn key(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "chrome",
            BrowserType::Firefox => "firefox",
            BrowserType::Edge => "edge",
            BrowserType::Opera => "opera",
            BrowserType::IExplorer => "iexplorer",
            BrowserType::PhantomJs => "phantomjs",
            BrowserType::SeleniumServerStandalone => "selenium_server_standalone",
            BrowserType::Void => "void",
        }
    }

    /// Maps a server path segment (`/chromedriver`, `/iedriver`, ...) to a browser.
    pub fn from_server_path(path: &str) -> Option<Self> {
        match path.trim_start_matches('/').to_ascii_lowercase().as_str() {
            "chromedriver" => Some(BrowserType::Chrome),
            "firefoxdriver" | "geckodriver" => Some(BrowserType::Firefox),
            "edgedriver" | "msedgedriver" => Some(BrowserType::Edge),
            "iedriver" => Some(BrowserType::IExplorer),
            "operadriver" => Some(BrowserType::Opera),
            "phantomjs" => Some(BrowserType::PhantomJs),
            "selenium-server-standalone" => Some(BrowserType::SeleniumServerStandalone),
            _ => None,
        }
    }
}

impl fmt::Display for BrowserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BrowserType {
    type Err = WebDriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(BrowserType::Chrome),
            "firefox" => Ok(BrowserType::Firefox),
            "edge" => Ok(BrowserType::Edge),
            "opera" => Ok(BrowserType::Opera),
            "iexplorer" | "ie" => Ok(BrowserType::IExplorer),
            "phantomjs" => Ok(BrowserType::PhantomJs),
            "selenium-server-standalone" | "selenium_server_standalone" => {
                Ok(BrowserType::SeleniumServerStandalone)
            }
            "void" => Ok(BrowserType::Void),
            other => Err(WebDriverError::UnsupportedBrowser(other.to_string())),
        }
    }
}

/// CPU architecture a driver is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Architecture {
    X32,
    X64,
    #[default]
    Default,
}

impl Architecture {
    /// The marker searched for in URLs and cache paths: `"32"` or `"64"`.
    pub fn token(&self) -> &'static str {
        match self {
            Architecture::X32 => "32",
            Architecture::X64 => "64",
            Architecture::Default => {
                if cfg!(target_pointer_width = "64") {
                    "64"
                } else {
                    "32"
                }
            }
        }
    }

    pub fn label(&self) -> String {
        format!("x{}", self.token())
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Architecture {
    type Err = WebDriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X32" | "32" => Ok(Architecture::X32),
            "X64" | "64" => Ok(Architecture::X64),
            "" | "DEFAULT" => Ok(Architecture::Default),
            _ => Err(WebDriverError::config("wdm.architecture", s, "expected X32 or X64")),
        }
    }
}

/// Operating system a driver is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Win,
    Linux,
    Mac,
}

impl OperatingSystem {
    /// Detects the host operating system, treating anything unknown as Linux.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OperatingSystem::Win,
            "macos" => OperatingSystem::Mac,
            _ => OperatingSystem::Linux,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            OperatingSystem::Win => "win",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Mac => "mac",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingSystem::Win => "WIN",
            OperatingSystem::Linux => "LINUX",
            OperatingSystem::Mac => "MAC",
        })
    }
}

impl FromStr for OperatingSystem {
    type Err = WebDriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WIN" | "WINDOWS" => Ok(OperatingSystem::Win),
            "LINUX" => Ok(OperatingSystem::Linux),
            "MAC" | "MACOS" | "OSX" => Ok(OperatingSystem::Mac),
            _ => Err(WebDriverError::config("wdm.os", s, "expected WIN, LINUX or MAC")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_type_parses_cli_names() {
        assert_eq!("chrome".parse::<BrowserType>().unwrap(), BrowserType::Chrome);
        assert_eq!("IE".parse::<BrowserType>().unwrap(), BrowserType::IExplorer);
        assert_eq!(
            "selenium-server-standalone".parse::<BrowserType>().unwrap(),
            BrowserType::SeleniumServerStandalone
        );
        assert!("netscape".parse::<BrowserType>().is_err());
    }

    #[test]
    fn server_paths_map_to_browsers() {
        assert_eq!(BrowserType::from_server_path("/chromedriver"), Some(BrowserType::Chrome));
        assert_eq!(BrowserType::from_server_path("geckodriver"), Some(BrowserType::Firefox));
        assert_eq!(BrowserType::from_server_path("/unknown"), None);
    }

    #[test]
    fn architecture_tokens() {
        assert_eq!(Architecture::X32.token(), "32");
        assert_eq!(Architecture::X64.token(), "64");
        assert_eq!(Architecture::X64.label(), "x64");
        assert!(["32", "64"].contains(&Architecture::Default.token()));
    }

    #[test]
    fn operating_system_round_trips_through_display() {
        for os in [OperatingSystem::Win, OperatingSystem::Linux, OperatingSystem::Mac] {
            assert_eq!(os.to_string().parse::<OperatingSystem>().unwrap(), os);
        }
        assert!("beos".parse::<OperatingSystem>().is_err());
    }
}
