//! Fetching driver artifacts into the cache tree and unpacking them.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace};
use url::Url;
use walkdir::WalkDir;

use crate::error::WebDriverError;
use crate::http::HttpClient;

/// Packaging of a downloaded artifact, decided by its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Zip,
    TarGz,
    TarBz2,
    Msi,
    /// Used as downloaded: `.exe` and `.jar` files.
    Plain,
}

impl ArtifactKind {
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".zip") {
            ArtifactKind::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArtifactKind::TarGz
        } else if name.ends_with(".tar.bz2") {
            ArtifactKind::TarBz2
        } else if name.ends_with(".msi") {
            ArtifactKind::Msi
        } else {
            ArtifactKind::Plain
        }
    }
}

/// Downloads `url` to `target` and returns the path of the usable binary.
///
/// Archives are unpacked in a scratch directory and the `binary_name` found there is copied
/// next to `target`, keeping its path inside the archive; plain files are the binary
/// themselves. Unless `override_cache` is set, a binary already installed next to `target` is
/// reused without touching the network.
pub async fn download(
    http: &HttpClient,
    url: &Url,
    target: &Path,
    binary_name: &str,
    override_cache: bool,
) -> Result<PathBuf, WebDriverError> {
    let kind = ArtifactKind::from_file_name(target.to_string_lossy().as_ref());
    let install_dir = target.parent().map(Path::to_path_buf).unwrap_or_default();

    if !override_cache {
        let existing = match kind {
            ArtifactKind::Plain => target.exists().then(|| target.to_path_buf()),
            _ => find_driver_executable(&install_dir, binary_name).ok(),
        };
        if let Some(path) = existing {
            debug!("{} already present at {}", binary_name, path.display());
            return Ok(path);
        }
    }

    // --- 1. Create a temporary directory for the download.
    let temp_dir = tempfile::Builder::new()
        .prefix("webdrivermanager-")
        .tempdir()
        .map_err(|e| WebDriverError::io("temp", e))?;
    let file_name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "driver".into());
    let archive_path = temp_dir.path().join(file_name);

    // --- 2. Download the artifact to the temporary directory.
    info!("Downloading {}", url);
    download_file(http, url, &archive_path).await?;

    fs::create_dir_all(&install_dir)
        .await
        .map_err(|e| WebDriverError::io(&install_dir, e))?;

    // --- 3. Unpack next to the download.
    let staging = temp_dir.path().join("unpacked");
    match kind {
        ArtifactKind::Plain => {
            fs::copy(&archive_path, target)
                .await
                .map_err(|e| WebDriverError::io(target, e))?;
            make_executable(target)?;
            return Ok(target.to_path_buf());
        }
        ArtifactKind::Zip => unzip_file(&archive_path, &staging).await?,
        ArtifactKind::TarGz | ArtifactKind::TarBz2 => {
            untar_file(&archive_path, &staging, kind).await?
        }
        ArtifactKind::Msi => extract_msi(&archive_path, &staging).await?,
    }

    // --- 4. Find the driver executable within the unpacked files and install it.
    // Archives might contain a top-level directory.
    let unpacked = find_driver_executable(&staging, binary_name)?;
    let relative = unpacked.strip_prefix(&staging).unwrap_or(Path::new(binary_name));
    let binary = install_dir.join(relative);
    if let Some(parent) = binary.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| WebDriverError::io(parent, e))?;
    }
    fs::copy(&unpacked, &binary)
        .await
        .map_err(|e| WebDriverError::io(&binary, e))?;
    make_executable(&binary)?;
    debug!("Driver binary extracted to {}", binary.display());
    Ok(binary)
}

/// Downloads a file from a given URL and saves it to a destination path.
pub async fn download_file(
    http: &HttpClient,
    url: &Url,
    dest_path: &Path,
) -> Result<(), WebDriverError> {
    // Ensure parent directory exists.
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| WebDriverError::io(parent, e))?;
    }

    let content = http.get_bytes(url).await?;

    let mut dest_file = File::create(dest_path)
        .await
        .map_err(|e| WebDriverError::io(dest_path, e))?;
    dest_file
        .write_all(&content)
        .await
        .map_err(|e| WebDriverError::io(dest_path, e))?;
    trace!("Wrote {} bytes to {}", content.len(), dest_path.display());

    Ok(())
}

/// Decompresses a .zip archive to a specified directory.
///
/// The core zip logic is synchronous, so it runs in `spawn_blocking`.
pub async fn unzip_file(archive_path: &Path, extract_to: &Path) -> Result<(), WebDriverError> {
    let archive_path_buf = archive_path.to_path_buf();
    let extract_to_buf = extract_to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive_path_buf)
            .map_err(|e| WebDriverError::io(&archive_path_buf, e))?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| WebDriverError::ZipError {
            path: archive_path_buf.clone(),
            source: e,
        })?;

        std::fs::create_dir_all(&extract_to_buf)
            .map_err(|e| WebDriverError::io(&extract_to_buf, e))?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| WebDriverError::ZipError {
                path: archive_path_buf.clone(),
                source: e,
            })?;

            let outpath = match file.enclosed_name() {
                Some(path) => extract_to_buf.join(path),
                None => continue,
            };

            if file.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(|e| WebDriverError::io(&outpath, e))?;
                continue;
            }

            if let Some(p) = outpath.parent() {
                std::fs::create_dir_all(p).map_err(|e| WebDriverError::io(p, e))?;
            }
            let mut outfile =
                std::fs::File::create(&outpath).map_err(|e| WebDriverError::io(&outpath, e))?;
            std::io::copy(&mut file, &mut outfile).map_err(|e| WebDriverError::io(&outpath, e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                        .map_err(|e| WebDriverError::io(&outpath, e))?;
                }
            }
        }
        Ok(())
    })
    .await?
}

/// Unpacks a gzip or bzip2 compressed tarball, refusing entries that escape `extract_to`.
pub async fn untar_file(
    archive_path: &Path,
    extract_to: &Path,
    kind: ArtifactKind,
) -> Result<(), WebDriverError> {
    let archive_path = archive_path.to_path_buf();
    let extract_to = extract_to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive_path)
            .map_err(|e| WebDriverError::io(&archive_path, e))?;
        let (archive_type, reader): (&str, Box<dyn std::io::Read>) = match kind {
            ArtifactKind::TarBz2 => ("tar.bz2", Box::new(bzip2::read::BzDecoder::new(file))),
            _ => ("tar.gz", Box::new(flate2::read::GzDecoder::new(file))),
        };
        let archive_error = |e: std::io::Error| WebDriverError::ArchiveError {
            archive_type: archive_type.to_string(),
            path: archive_path.clone(),
            source: e,
        };

        std::fs::create_dir_all(&extract_to).map_err(|e| WebDriverError::io(&extract_to, e))?;
        let mut archive = tar::Archive::new(reader);
        for entry in archive.entries().map_err(archive_error)? {
            let mut entry = entry.map_err(archive_error)?;
            entry.unpack_in(&extract_to).map_err(archive_error)?;
        }
        Ok(())
    })
    .await?
}

/// Administrative install of an `.msi` package into `extract_to`.
#[cfg(target_os = "windows")]
async fn extract_msi(archive_path: &Path, extract_to: &Path) -> Result<(), WebDriverError> {
    let mut command = std::process::Command::new("msiexec");
    command
        .arg("/a")
        .arg(archive_path)
        .arg("/qb")
        .arg(format!("TARGETDIR={}", extract_to.display()));
    let command_line = format!("{:?}", command);

    let status = tokio::task::spawn_blocking(move || command.status())
        .await?
        .map_err(|e| WebDriverError::CommandExecutionError {
            command: command_line.clone(),
            source: e,
        })?;
    if !status.success() {
        return Err(WebDriverError::ArchiveError {
            archive_type: "msi".to_string(),
            path: archive_path.to_path_buf(),
            source: std::io::Error::other(format!("{command_line} exited with {status}")),
        });
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn extract_msi(archive_path: &Path, _extract_to: &Path) -> Result<(), WebDriverError> {
    Err(WebDriverError::UnsupportedPlatform(format!(
        "{} can only be installed on Windows",
        archive_path.display()
    )))
}

/// Searches a directory for the driver executable file.
pub fn find_driver_executable(search_path: &Path, binary_name: &str) -> Result<PathBuf, WebDriverError> {
    for entry in WalkDir::new(search_path).sort_by_file_name() {
        let entry = entry.map_err(|e| WebDriverError::IoError {
            path: e.path().unwrap_or(search_path).to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("WalkDir error")),
        })?;
        if entry.file_type().is_file() && entry.file_name().to_str() == Some(binary_name) {
            return Ok(entry.into_path());
        }
    }

    Err(WebDriverError::DriverExecutableNotFound {
        name: binary_name.to_string(),
        path: search_path.to_path_buf(),
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), WebDriverError> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path).map_err(|e| WebDriverError::io(path, e))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions).map_err(|e| WebDriverError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), WebDriverError> {
    Ok(())
}
