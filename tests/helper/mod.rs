#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use webdrivermanager::Config;

/// Config that never leaves the mock server: no browser probing, no Chrome for Testing, no
/// mirrors, bundled versions table and a private cache.
pub fn offline_config(cache: &Path) -> Config {
    let mut config = Config::default();
    config.target_path = cache.join("drivers");
    config.preferences_path = cache.join("preferences.json");
    config.avoid_preferences = true;
    config.avoid_auto_version = true;
    config.versions_properties_online_first = false;
    config.versions_properties_url = "http://127.0.0.1:9/versions.properties".to_string();
    config.chrome_driver_cft_url = String::new();
    config.chrome.mirror_url = None;
    config.gecko.mirror_url = None;
    config
}

/// A zip archive holding one executable file.
pub fn zip_with(entry: &str, content: &[u8]) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        writer.start_file(entry, options).unwrap();
        writer.write_all(content).unwrap();
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

/// S3 `ListBucketResult` document for the given keys.
pub fn bucket_listing(keys: &[&str]) -> String {
    let contents: String = keys
        .iter()
        .map(|k| format!("<Contents><Key>{k}</Key></Contents>"))
        .collect();
    format!(
        "<?xml version='1.0' encoding='UTF-8'?><ListBucketResult xmlns='http://doc.s3.amazonaws.com/2006-03-01'><Name>chromedriver</Name><IsTruncated>false</IsTruncated>{contents}</ListBucketResult>"
    )
}
