use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use image::DynamicImage;

use crate::render::codec::decode_image_file;

/// Source of remote image bytes.
pub trait SourceFetcher: Send + Sync {
    /// Fetch the whole body at `uri`.
    fn fetch(&self, uri: &str) -> anyhow::Result<Vec<u8>>;
}

/// Blocking HTTP fetcher.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Fetcher with a 15 s connect timeout and a 60 s overall timeout.
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, uri: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .client
            .get(uri)
            .send()
            .with_context(|| format!("GET {uri}"))?
            .error_for_status()
            .with_context(|| format!("GET {uri}"))?;
        let bytes = resp
            .bytes()
            .with_context(|| format!("read body of {uri}"))?;
        Ok(bytes.to_vec())
    }
}

/// Fetch `uri` into a scoped temporary file under `scratch_dir` and decode it from there.
///
/// The temporary file is removed on every exit path, decode failures included.
pub fn fetch_and_decode(
    fetcher: &dyn SourceFetcher,
    uri: &str,
    scratch_dir: &Path,
) -> anyhow::Result<DynamicImage> {
    let bytes = fetcher.fetch(uri)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("pixcache")
        .tempfile_in(scratch_dir)
        .with_context(|| format!("create temp file in {}", scratch_dir.display()))?;
    tmp.write_all(&bytes)
        .context("write remote source to temp file")?;
    tmp.flush().context("flush remote source temp file")?;
    let img = decode_image_file(tmp.path())?;
    Ok(img)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/fetch.rs"]
mod tests;
