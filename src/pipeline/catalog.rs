use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::foundation::core::{Namespace, PresetKind};
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::presets::registry::PresetRegistry;
use crate::resolve::{QueryParams, Resolver, UrlOptions};

/// Image facts reported by the info endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// File size in bytes.
    pub size: u64,
    /// Mime type of the format, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// JSON body of the info endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    /// Remote source URI (external artifacts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Output extension.
    pub format: String,
    /// Preset segment.
    pub preset: String,
    /// Whether the artifact file exists.
    pub exists: bool,
    /// Present when requested and the artifact exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArtifactMetadata>,
    /// URL of the same source under every registered preset, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets: Option<BTreeMap<String, String>>,
}

/// Switches of the info endpoint, normally read from its query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoOptions {
    /// Include [`ArtifactMetadata`].
    pub metadata: bool,
    /// Include the per-preset URL map.
    pub presets: bool,
    /// Leave preset URLs relative instead of prefixing `base_url`.
    pub relative: bool,
    /// Scheme and host prefixed to preset URLs, e.g. `https://example.com`.
    pub base_url: String,
}

impl InfoOptions {
    /// Read `metadata`, `presets` and `relative` flags from a query string.
    pub fn from_query(query: &QueryParams, base_url: impl Into<String>) -> Self {
        Self {
            metadata: query.flag("metadata"),
            presets: query.flag("presets"),
            relative: query.flag("relative"),
            base_url: base_url.into(),
        }
    }
}

/// Answer of the reverse lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located {
    /// Artifact URL for the posted source.
    pub url: String,
    /// Answer with `301` and a `Location` header instead of a plain body.
    pub redirect: bool,
}

impl Located {
    /// HTTP status the router should answer with.
    pub fn status_code(&self) -> u16 {
        if self.redirect { 301 } else { 200 }
    }

    /// `Location` header value, for redirects.
    pub fn location(&self) -> Option<&str> {
        self.redirect.then_some(self.url.as_str())
    }
}

/// One sample per preset, for discovery pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Preset name.
    pub preset: String,
    /// Sample artifact URL.
    pub url: String,
}

/// Read-only views over the URL scheme: info, reverse lookup and index.
#[derive(Clone, Debug)]
pub struct Catalog {
    resolver: Resolver,
    presets: Arc<PresetRegistry>,
}

impl Catalog {
    /// Catalog over a resolver and the preset tables.
    pub fn new(resolver: Resolver, presets: Arc<PresetRegistry>) -> Self {
        Self { resolver, presets }
    }

    /// Describe the artifact at `url`. The URL must carry a valid checksum.
    #[tracing::instrument(level = "debug", skip(self, opts))]
    pub fn info(&self, url: &str, opts: &InfoOptions) -> PixcacheResult<ArtifactInfo> {
        let (_, query) = QueryParams::split_url(url);
        let parsed = self.resolver.parse_request_path(url)?;
        self.resolver.authorize(&parsed, &query)?;

        let config = self.resolver.config();
        let disk_path = config.disk_path_for_url(&parsed.url_path);
        let exists = disk_path.is_file();
        let content_type = config.format(&parsed.format).map(|f| f.mime().to_string());
        let metadata = if opts.metadata && exists {
            Some(read_metadata(&disk_path, content_type)?)
        } else {
            None
        };

        let source = match (&parsed.source, parsed.namespace) {
            (Some(src), Namespace::External) => config
                .storage(&src.storage)
                .map(|loc| loc.join(&src.relative_path)),
            _ => None,
        };

        let presets = if opts.presets {
            self.preset_urls(&parsed, &query, opts)?
        } else {
            None
        };

        Ok(ArtifactInfo {
            source,
            format: parsed.format,
            preset: parsed.preset,
            exists,
            metadata,
            presets,
        })
    }

    /// Reverse lookup: the artifact URL for a source path posted as a raw body.
    ///
    /// `storage`, `preset` and `format` come from the query (namespace defaults otherwise);
    /// `relative` drops `base_url`; `redirect` asks for a `301`. A blank body is `BadRequest`.
    #[tracing::instrument(level = "debug", skip(self, body, query))]
    pub fn locate(
        &self,
        ns: Namespace,
        body: &str,
        query: &QueryParams,
        base_url: &str,
    ) -> PixcacheResult<Located> {
        let source = body.trim();
        if source.is_empty() {
            return Err(PixcacheError::bad_request("empty source path"));
        }
        let opts = UrlOptions {
            preset: query.get("preset").map(str::to_string),
            format: query.get("format").map(str::to_string),
            storage: query.get("storage").map(str::to_string),
            ..UrlOptions::default()
        };
        let url = match ns {
            Namespace::Images => self.resolver.url_for_image(source, &opts)?,
            Namespace::External => self.resolver.url_for_external_image(source, &opts)?,
            Namespace::Textim => self.resolver.url_for_textim(source, &opts)?.to_url(),
        };
        let prefix = if query.flag("relative") { "" } else { base_url };
        Ok(Located {
            url: format!("{prefix}{url}"),
            redirect: query.flag("redirect"),
        })
    }

    /// One sample URL per preset of the namespace.
    ///
    /// Image namespaces render the configured default image from the default storage as PNG;
    /// labels render each preset's own name.
    pub fn index(&self, ns: Namespace) -> PixcacheResult<Vec<IndexEntry>> {
        let config = self.resolver.config();
        self.presets
            .names(ns.preset_kind())
            .into_iter()
            .map(|preset| {
                let opts = UrlOptions::default().preset(preset.as_str());
                let url = match ns.preset_kind() {
                    PresetKind::Image => self.resolver.url_for_image(
                        &config.default_image,
                        &opts.format("png").storage(config.default_storage.as_str()),
                    )?,
                    PresetKind::Text => self.resolver.url_for_textim(&preset, &opts)?.to_url(),
                };
                Ok(IndexEntry { preset, url })
            })
            .collect()
    }

    /// [`Catalog::index`] as an HTML fragment of `<img>` tags.
    pub fn index_html(&self, ns: Namespace) -> PixcacheResult<String> {
        Ok(self
            .index(ns)?
            .iter()
            .map(|e| format!(r#"<img src="{}" />"#, e.url))
            .collect::<Vec<_>>()
            .join("<br />"))
    }

    fn preset_urls(
        &self,
        parsed: &crate::resolve::ParsedPath,
        query: &QueryParams,
        opts: &InfoOptions,
    ) -> PixcacheResult<Option<BTreeMap<String, String>>> {
        let prefix = if opts.relative { "" } else { opts.base_url.as_str() };
        let names = self.presets.names(parsed.namespace.preset_kind());
        let mut out = BTreeMap::new();

        match &parsed.source {
            Some(src) => {
                for name in names {
                    let url_opts = UrlOptions::default()
                        .preset(name.as_str())
                        .format(parsed.format.as_str())
                        .storage(src.storage.as_str());
                    let Some(path) = self.resolver.resolve_artifact_path(
                        parsed.namespace,
                        &src.relative_path,
                        &url_opts,
                    )?
                    else {
                        return Ok(None);
                    };
                    out.insert(name, format!("{prefix}{}", path.public_url));
                }
            }
            None => {
                // a label's siblings can only be built from its payload
                let Some(hex) = query.payload_hex() else {
                    return Ok(None);
                };
                let text = crate::codec::payload::CharacterPayload::from_hex(hex)?.text();
                for name in names {
                    let url_opts = UrlOptions::default()
                        .preset(name.as_str())
                        .format(parsed.format.as_str());
                    let url = self.resolver.url_for_textim(&text, &url_opts)?.to_url();
                    out.insert(name, format!("{prefix}{url}"));
                }
            }
        }
        Ok(Some(out))
    }
}

fn read_metadata(path: &Path, content_type: Option<String>) -> PixcacheResult<ArtifactMetadata> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("read dimensions of '{}'", path.display()))?;
    let size = std::fs::metadata(path)
        .with_context(|| format!("stat '{}'", path.display()))?
        .len();
    Ok(ArtifactMetadata {
        width,
        height,
        size,
        content_type,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/catalog.rs"]
mod tests;
