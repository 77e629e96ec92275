//! The URL scheme: building artifact URLs and decoding incoming request paths.
//!
//! Image and external URLs look like
//! `/<ns>/<preset>/<s1>/<s2>/<s3>/<s4>/<storage>/<ext>/<dir/stem>.<format>`, where `s1..s4` pack the
//! checksum and `storage`/`ext` are reversed hex tokens. Label URLs look like
//! `/textim/<preset>/<s1>/<s2>/<s3>/<s4>.<format>?t=<hex payload>`.

mod query;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use query::QueryParams;

use crate::codec::checksum::{
    CHECKSUM_SEGMENTS, Checksum, decode_token, encode_token, validate,
};
use crate::codec::payload::CharacterPayload;
use crate::foundation::config::{PixcacheConfig, StorageLocation};
use crate::foundation::core::{ArtifactFormat, Namespace};
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::render::crop::Gravity;
use crate::store::normalize_rel_path;

/// Per-call options of the URL builders. Unset fields take the namespace defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Preset name; `default` when unset.
    pub preset: Option<String>,
    /// Output extension; `jpg` for images, `png` for labels when unset.
    pub format: Option<String>,
    /// Storage key; `default` for images, `external` for remote images when unset.
    pub storage: Option<String>,
    /// URL base replacing `/<prefix>/<namespace>`.
    pub base: Option<String>,
    /// The source path is an absolute path below the storage directory.
    pub absolute: bool,
}

impl UrlOptions {
    /// Set the preset.
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    /// Set the output extension.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the storage key.
    pub fn storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    /// Set the URL base.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Mark the source path as absolute.
    pub fn absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }
}

/// Where an artifact lives, as a public URL path and as a file below the public root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPath {
    /// File location.
    pub disk_path: PathBuf,
    /// URL path, without query string.
    pub public_url: String,
}

/// Label URL split into its path and its hex payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextUrl {
    /// URL path ending in `.<format>`.
    pub path: String,
    /// Value of the `t` query parameter.
    pub payload_hex: String,
}

impl TextUrl {
    /// Full URL with the payload appended as `?t=`.
    pub fn to_url(&self) -> String {
        format!("{}?t={}", self.path, self.payload_hex)
    }
}

/// Structural decoding of a request path. No checksum or filesystem checks have run yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPath {
    /// Namespace the path lives under.
    pub namespace: Namespace,
    /// Preset segment, as it appears in the URL.
    pub preset: String,
    /// Checksum unpacked from the four segments.
    pub checksum: Checksum,
    /// Output extension.
    pub format: String,
    /// Storage key and storage-relative source path; `None` for labels.
    pub source: Option<SourceRef>,
    /// The path without query string.
    pub url_path: String,
}

/// Source named by an image or external URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    /// Decoded storage key.
    pub storage: String,
    /// Storage-relative path including the original extension.
    pub relative_path: String,
}

/// A validated image or external request.
#[derive(Clone, Debug)]
pub struct SourceRequest {
    /// Preset segment.
    pub preset: String,
    /// Output format.
    pub format: ArtifactFormat,
    /// Storage key.
    pub storage: String,
    /// Storage-relative source path.
    pub relative_path: String,
    /// Canonical source identifier: a local file path or a remote URI.
    pub source: String,
    /// Crop anchoring.
    pub gravity: Gravity,
    /// Output location.
    pub artifact: ArtifactPath,
}

/// A validated label request.
#[derive(Clone, Debug)]
pub struct TextRequest {
    /// Preset segment.
    pub preset: String,
    /// Output format.
    pub format: ArtifactFormat,
    /// Label text.
    pub payload: CharacterPayload,
    /// Output location.
    pub artifact: ArtifactPath,
}

/// A decoded request whose checksum matched.
#[derive(Clone, Debug)]
pub enum ArtifactRequest {
    /// Local source image.
    Image(SourceRequest),
    /// Remote source image.
    External(SourceRequest),
    /// Text label.
    Text(TextRequest),
}

impl ArtifactRequest {
    /// Namespace of the request.
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Image(_) => Namespace::Images,
            Self::External(_) => Namespace::External,
            Self::Text(_) => Namespace::Textim,
        }
    }

    /// Output location.
    pub fn artifact(&self) -> &ArtifactPath {
        match self {
            Self::Image(r) | Self::External(r) => &r.artifact,
            Self::Text(r) => &r.artifact,
        }
    }

    /// Output format.
    pub fn format(&self) -> &ArtifactFormat {
        match self {
            Self::Image(r) | Self::External(r) => &r.format,
            Self::Text(r) => &r.format,
        }
    }

    /// Preset segment.
    pub fn preset(&self) -> &str {
        match self {
            Self::Image(r) | Self::External(r) => &r.preset,
            Self::Text(r) => &r.preset,
        }
    }
}

/// Builds and decodes artifact URLs against one configuration.
#[derive(Clone, Debug)]
pub struct Resolver {
    config: Arc<PixcacheConfig>,
}

impl Resolver {
    /// Resolver over `config`.
    pub fn new(config: Arc<PixcacheConfig>) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PixcacheConfig {
        &self.config
    }

    /// URL of a local source image, or the configured fallback image when the storage key is not
    /// a local storage.
    pub fn url_for_image(&self, path: &str, opts: &UrlOptions) -> PixcacheResult<String> {
        Ok(self
            .resolve_artifact_path(Namespace::Images, path, opts)?
            .map(|p| p.public_url)
            .unwrap_or_else(|| self.config.default_image.clone()))
    }

    /// URL of a remote source image, or the configured fallback image when the storage key is not
    /// a remote storage.
    pub fn url_for_external_image(&self, uri: &str, opts: &UrlOptions) -> PixcacheResult<String> {
        Ok(self
            .resolve_artifact_path(Namespace::External, uri, opts)?
            .map(|p| p.public_url)
            .unwrap_or_else(|| self.config.default_image.clone()))
    }

    /// Label URL for `text`. Fails with `BadRequest` when the text does not fit ISO-8859-1 or
    /// the payload limit.
    ///
    /// The preset is hashed exactly as spelled, so client-side builders produce the same URL.
    pub fn url_for_textim(&self, text: &str, opts: &UrlOptions) -> PixcacheResult<TextUrl> {
        let payload = CharacterPayload::from_text(text)?;
        let format = opts.format.as_deref().unwrap_or("png");
        let preset = preset_segment(opts)?;
        let base = self.base_for(Namespace::Textim, opts);
        let checksum = payload.checksum(&preset, format);
        Ok(TextUrl {
            path: format!("{base}/{preset}/{}.{format}", checksum.to_path()),
            payload_hex: payload.to_hex(),
        })
    }

    /// Deterministic artifact location of a source under `ns` (images or external).
    ///
    /// `Ok(None)` means the storage key names no storage of the right kind.
    #[tracing::instrument(level = "debug", skip(self, opts), fields(preset = ?opts.preset))]
    pub fn resolve_artifact_path(
        &self,
        ns: Namespace,
        source: &str,
        opts: &UrlOptions,
    ) -> PixcacheResult<Option<ArtifactPath>> {
        let storage = opts.storage.as_deref().unwrap_or(match ns {
            Namespace::External => "external",
            _ => "default",
        });
        let Some(location) = self.storage_for(ns, storage) else {
            tracing::debug!(storage, "unknown storage, using fallback image");
            return Ok(None);
        };

        let relative = match (opts.absolute, location) {
            (true, StorageLocation::Local(dir)) => Path::new(source)
                .strip_prefix(dir)
                .map_err(|_| {
                    PixcacheError::bad_request(format!(
                        "'{source}' is not below storage '{storage}'"
                    ))
                })?
                .to_string_lossy()
                .into_owned(),
            (true, StorageLocation::Remote(base)) => source
                .strip_prefix(base.as_str())
                .ok_or_else(|| {
                    PixcacheError::bad_request(format!(
                        "'{source}' is not below storage '{storage}'"
                    ))
                })?
                .trim_start_matches('/')
                .to_string(),
            (false, _) => source.trim_start_matches('/').to_string(),
        };
        let relative = normalize_rel_path(&relative).map_err(|e| {
            PixcacheError::bad_request(format!("invalid source path '{source}': {e}"))
        })?;
        let (stem, ext) = split_extension(&relative);
        if ext.is_empty() {
            return Err(PixcacheError::bad_request(format!(
                "source '{relative}' has no file extension"
            )));
        }

        let preset = preset_segment(opts)?;
        let format = opts.format.as_deref().unwrap_or("jpg");
        let canonical = location.join(&relative);
        let checksum = self.source_checksum(&canonical, &preset, format);

        let base = self.base_for(ns, opts);
        let public_url = format!(
            "{base}/{preset}/{}/{}/{}/{stem}.{format}",
            checksum.to_path(),
            encode_token(storage),
            encode_token(ext),
        );
        Ok(Some(ArtifactPath {
            disk_path: self.config.disk_path_for_url(&public_url),
            public_url,
        }))
    }

    /// Structural decoding of a request URL (query string ignored).
    ///
    /// Anything that does not match the URL grammar is `NotFound`.
    pub fn parse_request_path(&self, url: &str) -> PixcacheResult<ParsedPath> {
        let (path, _) = QueryParams::split_url(url);
        let (namespace, rest) = self
            .split_namespace(path)
            .ok_or_else(|| PixcacheError::not_found(format!("no artifact namespace in '{path}'")))?;
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
            return Err(PixcacheError::not_found(format!("malformed path '{path}'")));
        }

        match namespace {
            Namespace::Textim => {
                let [preset, s1, s2, s3, last] = segments.as_slice() else {
                    return Err(PixcacheError::not_found(format!("malformed label path '{path}'")));
                };
                let (s4, format) = last
                    .split_once('.')
                    .ok_or_else(|| PixcacheError::not_found("label path has no format"))?;
                Ok(ParsedPath {
                    namespace,
                    preset: preset.to_string(),
                    checksum: Checksum::from_segments(&[*s1, *s2, *s3, s4])?,
                    format: format.to_string(),
                    source: None,
                    url_path: path.to_string(),
                })
            }
            Namespace::Images | Namespace::External => {
                // preset, 4 checksum segments, storage, ext, then at least one filename segment
                if segments.len() < 3 + CHECKSUM_SEGMENTS {
                    return Err(PixcacheError::not_found(format!("malformed image path '{path}'")));
                }
                let preset = segments[0];
                let checksum = Checksum::from_segments(&segments[1..=CHECKSUM_SEGMENTS])?;
                let storage = decode_token(segments[CHECKSUM_SEGMENTS + 1])?;
                let original_ext = decode_token(segments[CHECKSUM_SEGMENTS + 2])?;
                let filename = segments[CHECKSUM_SEGMENTS + 3..].join("/");
                let (stem, format) = filename
                    .rsplit_once('.')
                    .filter(|(stem, format)| !stem.is_empty() && !format.is_empty())
                    .ok_or_else(|| PixcacheError::not_found("image path has no format"))?;
                Ok(ParsedPath {
                    namespace,
                    preset: preset.to_string(),
                    checksum,
                    format: format.to_string(),
                    source: Some(SourceRef {
                        storage,
                        relative_path: format!("{stem}{original_ext}"),
                    }),
                    url_path: path.to_string(),
                })
            }
        }
    }

    /// Recompute the checksum of a parsed path and compare it to the one it carries.
    ///
    /// Labels can only be checked when `query` carries a payload; without one the path is accepted
    /// as is. No filesystem access happens here.
    pub fn authorize(&self, parsed: &ParsedPath, query: &QueryParams) -> PixcacheResult<()> {
        match &parsed.source {
            Some(source) => {
                let (_, canonical) = self.canonical_source(parsed.namespace, source)?;
                self.check(parsed, &self.source_checksum(&canonical, &parsed.preset, &parsed.format))
            }
            None => match query.payload_hex() {
                Some(hex) => {
                    let payload = CharacterPayload::from_hex(hex)?;
                    self.check(parsed, &payload.checksum(&parsed.preset, &parsed.format))
                }
                None => Ok(()),
            },
        }
    }

    /// Fully decode and validate a request URL, query string included.
    ///
    /// Unknown formats and storages, checksum mismatches and missing local sources are all
    /// `NotFound`. A label request without payload is `BadRequest`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn decode_request_path(&self, url: &str) -> PixcacheResult<ArtifactRequest> {
        let (_, query) = QueryParams::split_url(url);
        let parsed = self.parse_request_path(url)?;
        let format = self
            .config
            .format(&parsed.format)
            .ok_or_else(|| PixcacheError::not_found(format!("unknown format '{}'", parsed.format)))?;
        let artifact = ArtifactPath {
            disk_path: self.config.disk_path_for_url(&parsed.url_path),
            public_url: parsed.url_path.clone(),
        };

        let Some(source) = &parsed.source else {
            let hex = query
                .payload_hex()
                .ok_or_else(|| PixcacheError::bad_request("label request carries no payload"))?;
            let payload = CharacterPayload::from_hex(hex)?;
            self.check(&parsed, &payload.checksum(&parsed.preset, &parsed.format))?;
            return Ok(ArtifactRequest::Text(TextRequest {
                preset: parsed.preset,
                format,
                payload,
                artifact,
            }));
        };

        let (location, canonical) = self.canonical_source(parsed.namespace, source)?;
        if let StorageLocation::Local(_) = location
            && !Path::new(&canonical).is_file()
        {
            return Err(PixcacheError::not_found(format!("source '{canonical}' does not exist")));
        }
        self.check(&parsed, &self.source_checksum(&canonical, &parsed.preset, &parsed.format))?;

        let request = SourceRequest {
            preset: parsed.preset.clone(),
            format,
            storage: source.storage.clone(),
            relative_path: source.relative_path.clone(),
            source: canonical,
            gravity: Gravity::parse(query.get("gravity")),
            artifact,
        };
        Ok(match parsed.namespace {
            Namespace::External => ArtifactRequest::External(request),
            _ => ArtifactRequest::Image(request),
        })
    }

    fn check(&self, parsed: &ParsedPath, recomputed: &Checksum) -> PixcacheResult<()> {
        if validate(&parsed.checksum, recomputed) {
            Ok(())
        } else {
            Err(PixcacheError::not_found(format!(
                "checksum mismatch for '{}'",
                parsed.url_path
            )))
        }
    }

    fn canonical_source(
        &self,
        ns: Namespace,
        source: &SourceRef,
    ) -> PixcacheResult<(&StorageLocation, String)> {
        let location = self.storage_for(ns, &source.storage).ok_or_else(|| {
            PixcacheError::not_found(format!("unknown storage '{}'", source.storage))
        })?;
        let relative = normalize_rel_path(&source.relative_path)?;
        Ok((location, location.join(&relative)))
    }

    fn source_checksum(&self, canonical: &str, preset: &str, format: &str) -> Checksum {
        Checksum::compute(
            &[canonical, preset, format],
            Some(self.config.secret.as_str()),
        )
    }

    fn storage_for(&self, ns: Namespace, key: &str) -> Option<&StorageLocation> {
        let location = self.config.storage(key)?;
        match (ns, location) {
            (Namespace::Images, StorageLocation::Local(_))
            | (Namespace::External, StorageLocation::Remote(_)) => Some(location),
            _ => None,
        }
    }

    fn base_for(&self, ns: Namespace, opts: &UrlOptions) -> String {
        match opts.base.as_deref() {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => self.config.namespace_base(ns),
        }
    }

    fn split_namespace<'a>(&self, path: &'a str) -> Option<(Namespace, &'a str)> {
        Namespace::ALL.into_iter().find_map(|ns| {
            let base = self.config.namespace_base(ns);
            path.strip_prefix(base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| (ns, rest))
        })
    }
}

/// The preset as it will appear in the URL and on disk. It is not normalized; the registry
/// normalizes on lookup.
fn preset_segment(opts: &UrlOptions) -> PixcacheResult<&str> {
    let preset = opts.preset.as_deref().unwrap_or("default");
    if preset.is_empty()
        || preset == "."
        || preset == ".."
        || preset.contains(['/', '\\', '?', '#'])
    {
        return Err(PixcacheError::bad_request(format!(
            "'{preset}' is not a valid preset segment"
        )));
    }
    Ok(preset)
}

/// Split `dir/name.ext` into `("dir/name", ".ext")`. Leading-dot names have no extension.
fn split_extension(relative: &str) -> (&str, &str) {
    let name_start = relative.rfind('/').map_or(0, |i| i + 1);
    match relative[name_start..].rfind('.') {
        Some(dot) if dot > 0 => relative.split_at(name_start + dot),
        _ => (relative, ""),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/mod.rs"]
mod tests;
