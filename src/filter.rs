//! Narrowing of candidate download URLs.
//!
//! Every filter takes a slice and returns a new list; matching is done on the lowercase
//! URL path.

use std::path::Path;

use tracing::trace;
use url::Url;

use crate::platform::{Architecture, OperatingSystem};

const ARCH_MARKERS: &[&str] = &["x86", "64", "i686", "32"];

const KNOWN_DISTROS: &[&str] = &[
    "ubuntu", "debian", "fedora", "centos", "redhat", "suse", "arch", "alpine",
];

fn lower_path(url: &Url) -> String {
    url.path().to_ascii_lowercase()
}

/// Keeps URLs whose path mentions the OS token (`osx` also counts for macOS).
pub fn filter_by_os(urls: &[Url], os: OperatingSystem) -> Vec<Url> {
    let token = os.token();
    let out: Vec<Url> = urls
        .iter()
        .filter(|url| {
            let path = lower_path(url);
            path.contains(token) || (os == OperatingSystem::Mac && path.contains("osx"))
        })
        .cloned()
        .collect();
    trace!("URLs after filtering by OS {}: {:?}", os, out);
    out
}

/// Drops URLs that carry an architecture marker other than the requested one.
///
/// Only filters when `forced` is set or more than one candidate remains. If nothing survives
/// and the architecture was not forced, the last URL of the input is returned instead.
pub fn filter_by_arch(urls: &[Url], arch: Architecture, forced: bool) -> Vec<Url> {
    let mut out = urls.to_vec();
    if forced || out.len() > 1 {
        let token = arch.token();
        out.retain(|url| {
            let path = lower_path(url);
            let has_marker = ARCH_MARKERS.iter().any(|m| path.contains(m));
            !has_marker || path.contains(token)
        });
    }
    if out.is_empty() && !forced {
        if let Some(last) = urls.last() {
            out.push(last.clone());
        }
    }
    trace!("URLs after filtering by architecture {}: {:?}", arch, out);
    out
}

/// Drops URLs for `version` that are not built for `distro`.
pub fn filter_by_distro(urls: &[Url], version: &str, distro: &str) -> Vec<Url> {
    let distro = distro.to_ascii_lowercase();
    let out: Vec<Url> = urls
        .iter()
        .filter(|url| {
            let path = lower_path(url);
            !path.contains(version) || path.contains(&distro)
        })
        .cloned()
        .collect();
    trace!("URLs after filtering by distro {}: {:?}", distro, out);
    out
}

/// Drops URLs mentioning any of the ignored versions.
pub fn filter_by_ignored_versions(urls: &[Url], ignored: &[String]) -> Vec<Url> {
    if ignored.is_empty() {
        return urls.to_vec();
    }
    let out: Vec<Url> = urls
        .iter()
        .filter(|url| !ignored.iter().any(|v| url.path().contains(v.as_str())))
        .cloned()
        .collect();
    trace!("URLs after filtering ignored versions {:?}: {:?}", ignored, out);
    out
}

/// Detects the Linux distro codename, e.g. `xenial`.
pub fn distro_codename() -> Option<String> {
    distro_codename_in(Path::new("/etc"), Path::new("/proc/version"))
}

/// Reads `UBUNTU_CODENAME` or `VERSION_CODENAME` from `<etc>/*-release`, falling back to a
/// distro name found in `proc_version`.
pub fn distro_codename_in(etc: &Path, proc_version: &Path) -> Option<String> {
    let mut release_files: Vec<_> = std::fs::read_dir(etc)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("-release"))
        })
        .collect();
    release_files.sort();

    for file in &release_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for key in ["UBUNTU_CODENAME", "VERSION_CODENAME", "DISTRIB_CODENAME"] {
            let codename = content.lines().find_map(|line| {
                let (k, v) = line.split_once('=')?;
                (k.trim() == key).then(|| v.trim().trim_matches('"').to_ascii_lowercase())
            });
            if let Some(codename) = codename.filter(|c| !c.is_empty()) {
                return Some(codename);
            }
        }
    }

    let version = std::fs::read_to_string(proc_version).ok()?.to_ascii_lowercase();
    KNOWN_DISTROS
        .iter()
        .find(|d| version.contains(*d))
        .map(|d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn urls(list: &[&str]) -> Vec<Url> {
        list.iter().map(|u| Url::parse(u).unwrap()).collect()
    }

    #[test]
    fn os_filter_keeps_matching_token() {
        let input = urls(&[
            "https://host/2.21/chromedriver_linux64.zip",
            "https://host/2.21/chromedriver_mac64.zip",
            "https://host/2.21/chromedriver_win32.zip",
        ]);
        let out = filter_by_os(&input, OperatingSystem::Win);
        assert_eq!(out, urls(&["https://host/2.21/chromedriver_win32.zip"]));
    }

    #[test]
    fn os_filter_matches_osx_for_mac() {
        let input = urls(&[
            "https://host/phantomjs-2.1.1-macosx.zip",
            "https://host/geckodriver-v0.26.0-macos.tar.gz",
            "https://host/phantomjs-2.1.1-windows.zip",
        ]);
        let out = filter_by_os(&input, OperatingSystem::Mac);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|u| !u.path().contains("windows")));
    }

    #[test]
    fn arch_filter_keeps_requested_architecture() {
        let input = urls(&[
            "https://host/IEDriverServer_x86_3.150.1.zip",
            "https://host/IEDriverServer_x64_3.150.1.zip",
        ]);
        let out = filter_by_arch(&input, Architecture::X64, true);
        assert_eq!(out, urls(&["https://host/IEDriverServer_x64_3.150.1.zip"]));
    }

    #[test]
    fn arch_filter_falls_back_to_last_element() {
        let input = urls(&[
            "https://host/2.21/chromedriver_linux64.zip",
            "https://host/2.21/chromedriver_mac64.zip",
        ]);
        let out = filter_by_arch(&input, Architecture::X32, false);
        assert_eq!(out, urls(&["https://host/2.21/chromedriver_mac64.zip"]));
    }

    #[test]
    fn forced_arch_filter_may_return_nothing() {
        let input = urls(&["https://host/2.21/chromedriver_linux64.zip"]);
        assert!(filter_by_arch(&input, Architecture::X32, true).is_empty());
    }

    #[test]
    fn arch_filter_skips_single_unforced_candidate() {
        let input = urls(&["https://host/2.21/chromedriver_linux64.zip"]);
        assert_eq!(filter_by_arch(&input, Architecture::X32, false), input);
    }

    #[test]
    fn arch_filter_keeps_urls_without_markers() {
        let input = urls(&[
            "https://host/3.141/selenium-server-standalone-3.141.59.jar",
            "https://host/2.21/chromedriver_win32.zip",
        ]);
        let out = filter_by_arch(&input, Architecture::X64, true);
        assert_eq!(
            out,
            urls(&["https://host/3.141/selenium-server-standalone-3.141.59.jar"])
        );
    }

    #[test]
    fn distro_filter_only_touches_target_version() {
        let input = urls(&[
            "https://host/phantomjs-2.5.0-beta-linux-ubuntu-trusty-x86_64.tar.gz",
            "https://host/phantomjs-2.5.0-beta-linux-ubuntu-xenial-x86_64.tar.gz",
            "https://host/phantomjs-2.1.1-linux-x86_64.tar.bz2",
        ]);
        let out = filter_by_distro(&input, "2.5.0", "xenial");
        assert_eq!(
            out,
            urls(&[
                "https://host/phantomjs-2.5.0-beta-linux-ubuntu-xenial-x86_64.tar.gz",
                "https://host/phantomjs-2.1.1-linux-x86_64.tar.bz2",
            ])
        );
    }

    #[rstest]
    #[case(&[], 3)]
    #[case(&["2.40"], 2)]
    #[case(&["2.40", "2.41"], 1)]
    fn ignored_versions_are_dropped(#[case] ignored: &[&str], #[case] expected: usize) {
        let input = urls(&[
            "https://host/2.40/chromedriver_linux64.zip",
            "https://host/2.41/chromedriver_linux64.zip",
            "https://host/2.42/chromedriver_linux64.zip",
        ]);
        let ignored: Vec<String> = ignored.iter().map(|s| s.to_string()).collect();
        assert_eq!(filter_by_ignored_versions(&input, &ignored).len(), expected);
    }

    #[test]
    fn codename_read_from_release_file() {
        let etc = tempfile::tempdir().unwrap();
        std::fs::write(
            etc.path().join("os-release"),
            "NAME=\"Ubuntu\"\nVERSION_CODENAME=xenial\nUBUNTU_CODENAME=xenial\n",
        )
        .unwrap();
        let proc_version = etc.path().join("missing");
        assert_eq!(
            distro_codename_in(etc.path(), &proc_version).as_deref(),
            Some("xenial")
        );
    }

    #[test]
    fn codename_falls_back_to_proc_version() {
        let etc = tempfile::tempdir().unwrap();
        let proc_version = etc.path().join("version");
        std::fs::write(
            &proc_version,
            "Linux version 4.4.0-21-generic (buildd@lgw01-21) (gcc version 5.3.1 (Ubuntu 5.3.1-14ubuntu2))",
        )
        .unwrap();
        assert_eq!(
            distro_codename_in(etc.path(), &proc_version).as_deref(),
            Some("ubuntu")
        );
    }
}
