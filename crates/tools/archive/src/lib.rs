//! Download and unpack tool archives.
//!
//! Node.js and Yarn ship as `.tar.gz` archives with a single top-level
//! directory (`node-v14.2.0-linux-x64/`, `yarn-v1.22.4/`). Installing one
//! means fetching the bytes into a scratch directory, unpacking next to the
//! destination, and moving the top-level directory into place. The scratch
//! copy is left for the caller to clean up with the rest of its transient
//! files.

#![warn(missing_docs)]

mod error;
mod fetch;
mod unpack;

pub use error::{Error, Result};
pub use fetch::{Downloader, HttpDownloader};
pub use unpack::unpack_tarball;

use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Download `url` into `scratch` and install its contents at `dest`,
/// replacing what was there.
///
/// Returns the path of the downloaded archive inside `scratch`.
pub async fn install_archive(
    downloader: &dyn Downloader,
    url: &Url,
    scratch: &Path,
    dest: &Path,
) -> Result<PathBuf> {
    let bytes = downloader.download(url).await?;
    info!(%url, size = bytes.len(), "Downloaded archive");

    std::fs::create_dir_all(scratch)?;
    let archive = scratch.join(archive_file_name(url));
    std::fs::write(&archive, &bytes)?;

    unpack_tarball(&bytes, dest)?;
    Ok(archive)
}

fn archive_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map_or_else(|| "archive.tar.gz".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    struct StaticDownloader(Vec<u8>);

    #[async_trait]
    impl Downloader for StaticDownloader {
        async fn download(&self, _url: &Url) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDownloader;

    #[async_trait]
    impl Downloader for FailingDownloader {
        async fn download(&self, url: &Url) -> Result<Vec<u8>> {
            Err(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn node_tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "node-v14.2.0-linux-x64/bin/node", &b"node"[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[tokio::test]
    async fn test_install_archive() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("node");
        let scratch = temp.path().join("scratch");
        let url = Url::parse("https://example/dist/node-v14.2.0-linux-x64.tar.gz").unwrap();

        let archive = install_archive(&StaticDownloader(node_tarball()), &url, &scratch, &dest)
            .await
            .unwrap();

        assert!(dest.join("bin/node").is_file());
        assert_eq!(archive, scratch.join("node-v14.2.0-linux-x64.tar.gz"));
        assert!(archive.is_file());
    }

    #[test]
    fn test_archive_file_name_fallback() {
        let url = Url::parse("https://example/").unwrap();
        assert_eq!(archive_file_name(&url), "archive.tar.gz");
    }

    #[tokio::test]
    async fn test_install_archive_download_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let url = Url::parse("https://example/missing.tar.gz").unwrap();

        let err = install_archive(
            &FailingDownloader,
            &url,
            &temp.path().join("scratch"),
            &temp.path().join("node"),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Unexpected HTTP status 404 for https://example/missing.tar.gz"
        );
    }
}
