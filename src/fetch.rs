use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use flate2::read::MultiGzDecoder;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use tokio::{fs, io::AsyncWriteExt, task};

use crate::error::{ContentsError, Result};

pub const DEFAULT_MIRROR: &str = "http://ftp.uk.debian.org";

/// Where Contents indices are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub base: String,
    pub suite: String,
    pub component: String,
}

impl Default for Mirror {
    fn default() -> Self {
        Mirror {
            base: DEFAULT_MIRROR.to_string(),
            suite: "stable".to_string(),
            component: "main".to_string(),
        }
    }
}

impl Mirror {
    pub fn contents_url(&self, arch: &str) -> String {
        format!(
            "{}/debian/dists/{}/{}/{}",
            self.base.trim_end_matches('/'),
            self.suite,
            self.component,
            archive_file_name(arch)
        )
    }
}

pub fn contents_file_name(arch: &str) -> String {
    format!("Contents-{}", arch)
}

pub fn archive_file_name(arch: &str) -> String {
    format!("Contents-{}.gz", arch)
}

pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        "contents-top/",
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(ContentsError::Client)
}

/// Downloads the Contents index of one architecture and leaves the
/// decompressed copy in `output_dir`.
pub struct Fetcher {
    client: reqwest::Client,
    mirror: Mirror,
    output_dir: PathBuf,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, mirror: Mirror, output_dir: impl Into<PathBuf>) -> Self {
        Fetcher {
            client,
            mirror,
            output_dir: output_dir.into(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetches `Contents-<arch>.gz`, inflates it to `Contents-<arch>` and
    /// removes the archive. Returns the path of the inflated index.
    pub async fn fetch(&self, arch: &str) -> Result<PathBuf> {
        let url = self.mirror.contents_url(arch);
        let archive = self.output_dir.join(archive_file_name(arch));
        let contents = self.output_dir.join(contents_file_name(arch));

        download(&self.client, &url, &archive, self.show_progress).await?;

        let (src, dest) = (archive.clone(), contents.clone());
        task::spawn_blocking(move || decompress(&src, &dest))
            .await
            .map_err(ContentsError::Task)??;

        fs::remove_file(&archive)
            .await
            .map_err(ContentsError::io(&archive))?;
        debug!("removed {}", archive.display());

        Ok(contents)
    }
}

/// Streams the body of `url` into `dest`. The status code is not checked:
/// whatever the server answers ends up on disk.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<u64> {
    info!("fetching {}", url);

    let fetch_err = |source| ContentsError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(fetch_err)?;

    if !response.status().is_success() {
        warn!("{} answered {}, keeping the body anyway", url, response.status());
    }

    let bar = if show_progress {
        progress_bar(response.content_length())
    } else {
        ProgressBar::hidden()
    };

    let file = fs::File::create(dest)
        .await
        .map_err(ContentsError::io(dest))?;
    let mut file = tokio::io::BufWriter::new(file);
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(fetch_err)?;
        file.write_all(&chunk)
            .await
            .map_err(|source| ContentsError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        written += chunk.len() as u64;
        bar.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(ContentsError::io(dest))?;
    bar.finish_and_clear();

    info!("wrote {} bytes to {}", written, dest.display());
    Ok(written)
}

/// Inflates the gzip file `src` into `dest`, block by block. Concatenated
/// gzip members are all decoded.
pub fn decompress(src: &Path, dest: &Path) -> Result<u64> {
    let input = File::open(src).map_err(ContentsError::io(src))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut output = BufWriter::new(File::create(dest).map_err(ContentsError::io(dest))?);

    let inflated = io::copy(&mut decoder, &mut output).map_err(|source| match source.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ContentsError::Decompress {
                path: src.to_path_buf(),
                source,
            }
        }
        _ => ContentsError::Io {
            path: dest.to_path_buf(),
            source,
        },
    })?;

    output.flush().map_err(ContentsError::io(dest))?;

    info!("inflated {} to {} bytes", src.display(), inflated);
    Ok(inflated)
}

fn progress_bar(len: Option<u64>) -> ProgressBar {
    match len {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            {
                bar.set_style(style);
            }
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {bytes} downloaded") {
                bar.set_style(style);
            }
            bar
        }
    }
}
