mod helper;

use mockito::Server;
use webdrivermanager::preferences::PreferenceStore;
use webdrivermanager::browser::StaticBrowserProbe;
use webdrivermanager::{Architecture, BrowserType, DriverRequest, OperatingSystem, Resolver, WebDriverError};

use helper::{bucket_listing, offline_config, zip_with};

const KEYS: &[&str] = &[
    "2.20/chromedriver_linux64.zip",
    "2.21/chromedriver_linux64.zip",
    "2.21/chromedriver_mac32.zip",
    "2.21/chromedriver_win32.zip",
    "79.0.3945.36/chromedriver_linux64.zip",
    "LATEST_RELEASE",
];

fn linux_request() -> DriverRequest {
    DriverRequest::new(BrowserType::Chrome)
        .os(OperatingSystem::Linux)
        .architecture(Architecture::X64)
}

#[tokio::test]
async fn explicit_version_is_installed_into_cache_tree() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(bucket_listing(KEYS))
        .create_async()
        .await;
    let download = server
        .mock("GET", "/2.21/chromedriver_linux64.zip")
        .with_status(200)
        .with_body(zip_with("chromedriver", b"#!/bin/sh\necho 2.21\n"))
        .expect(1)
        .create_async()
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut config = offline_config(home.path());
    config.chrome.url = format!("{}/", server.url());
    let root = config.target_path.clone();
    let mut resolver = Resolver::new(config).unwrap();

    let request = linux_request().version("2.21");
    let driver = resolver.setup(&request).await.unwrap();
    assert_eq!(driver.version, "2.21");
    assert!(!driver.from_cache);
    assert_eq!(driver.path, root.join("chromedriver/linux64/2.21/chromedriver"));
    assert_eq!(driver.export_variable.as_deref(), Some("webdriver.chrome.driver"));
    assert!(driver.path.is_file());
    assert_eq!(resolver.session().downloaded_version(BrowserType::Chrome), Some("2.21"));

    let again = resolver.setup(&request).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.path, driver.path);
    download.assert_async().await;
}

#[tokio::test]
async fn nonexistent_version_fails_after_one_retry() {
    let mut server = Server::new_async().await;
    let listing = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(bucket_listing(KEYS))
        .expect(2)
        .create_async()
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut config = offline_config(home.path());
    config.chrome.url = format!("{}/", server.url());
    let mut resolver = Resolver::new(config).unwrap();

    let err = resolver.setup(&linux_request().version("99")).await.unwrap_err();
    assert!(err.to_string().contains("chromedriver 99 for LINUX64"));
    match err {
        WebDriverError::Resolution { source, .. } => {
            assert!(matches!(*source, WebDriverError::DriverNotFound { .. }))
        }
        other => panic!("unexpected error {other:?}"),
    }
    listing.assert_async().await;
}

#[tokio::test]
async fn failed_listing_recovers_from_cache_on_retry() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/LATEST_RELEASE")
        .with_status(503)
        .create_async()
        .await;
    let listing = server
        .mock("GET", "/")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut config = offline_config(home.path());
    config.chrome.url = format!("{}/", server.url());
    let cached = config.target_path.join("chromedriver/linux64/2.21/chromedriver");
    std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
    std::fs::write(&cached, "cached").unwrap();
    let mut resolver = Resolver::new(config).unwrap();

    let driver = resolver.setup(&linux_request()).await.unwrap();
    assert!(driver.from_cache);
    assert_eq!(driver.version, "2.21");
    assert_eq!(driver.path, cached);
    listing.assert_async().await;
}

#[tokio::test]
async fn flat_tree_does_not_reuse_other_versions() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(bucket_listing(KEYS))
        .create_async()
        .await;
    let download = server
        .mock("GET", "/2.21/chromedriver_linux64.zip")
        .with_status(200)
        .with_body(zip_with("chromedriver", b"NEW 2.21"))
        .expect(1)
        .create_async()
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut config = offline_config(home.path());
    config.chrome.url = format!("{}/", server.url());
    config.avoid_output_tree = true;
    let root = config.target_path.clone();
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("chromedriver"), "OLD 2.20").unwrap();
    let mut resolver = Resolver::new(config).unwrap();

    let driver = resolver.setup(&linux_request().version("2.21")).await.unwrap();
    assert_eq!(driver.version, "2.21");
    assert_eq!(driver.path, root.join("chromedriver"));
    assert_eq!(std::fs::read(&driver.path).unwrap(), b"NEW 2.21");
    download.assert_async().await;
}

#[tokio::test]
async fn installed_browser_picks_driver_and_records_preferences() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(bucket_listing(KEYS))
        .create_async()
        .await;
    server
        .mock("GET", "/79.0.3945.36/chromedriver_linux64.zip")
        .with_status(200)
        .with_body(zip_with("chromedriver", b"#!/bin/sh\necho 79\n"))
        .create_async()
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut config = offline_config(home.path());
    config.chrome.url = format!("{}/", server.url());
    config.avoid_auto_version = false;
    config.avoid_preferences = false;
    let preferences_path = config.preferences_path.clone();

    let mut resolver = Resolver::new(config)
        .unwrap()
        .with_probe(StaticBrowserProbe::new().with_version(BrowserType::Chrome, "79.0.3945.88"));
    let driver = resolver.setup(&linux_request()).await.unwrap();
    assert_eq!(driver.version, "79.0.3945.36");

    let mut stored = PreferenceStore::open(&preferences_path, 3600);
    assert_eq!(stored.get("chrome").as_deref(), Some("79"));
    assert_eq!(stored.get("chrome79").as_deref(), Some("79.0.3945.36"));
}
