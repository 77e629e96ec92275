//! Lazy generate-or-serve of artifacts.
//!
//! A request is decoded and validated by the [`Resolver`], served from the store when its file
//! exists, and otherwise generated by its preset, encoded, and persisted before being served.

/// Info, reverse lookup and index views.
pub mod catalog;
/// Remote source fetching.
pub mod fetch;
mod inflight;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::config::PixcacheConfig;
use crate::foundation::core::Namespace;
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::pipeline::fetch::{HttpFetcher, SourceFetcher, fetch_and_decode};
use crate::pipeline::inflight::{Claim, InFlight};
use crate::presets::registry::{PresetContext, PresetRegistry};
use crate::render::codec::{Artifact, decode_image_file, encode_artifact};
use crate::render::crop::Gravity;
use crate::render::fonts::FontLocator;
use crate::resolve::{ArtifactRequest, Resolver};
use crate::store::ArtifactStore;

/// How a served artifact came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The preset ran for this request.
    Generated,
    /// The file already existed.
    CacheHit,
    /// The file already existed, for a remote source. Reported distinctly as `201 Created`.
    AlreadyExisted,
}

/// A served artifact.
#[derive(Clone, Debug)]
pub struct Served {
    /// Encoded artifact.
    pub bytes: Vec<u8>,
    /// Mime type of the requested format.
    pub content_type: String,
    /// File the artifact is persisted at.
    pub disk_path: PathBuf,
    /// URL path the artifact is served under.
    pub public_url: String,
    /// Whether the preset ran.
    pub outcome: ServeOutcome,
}

impl Served {
    /// HTTP status the router should answer with.
    pub fn status_code(&self) -> u16 {
        match self.outcome {
            ServeOutcome::AlreadyExisted => 201,
            ServeOutcome::Generated | ServeOutcome::CacheHit => 200,
        }
    }

    /// `Location` header value, for `201` answers.
    pub fn location(&self) -> Option<&str> {
        (self.outcome == ServeOutcome::AlreadyExisted).then_some(self.public_url.as_str())
    }
}

/// Generate-or-serve engine shared by all request handlers.
pub struct ArtifactPipeline {
    config: Arc<PixcacheConfig>,
    presets: Arc<PresetRegistry>,
    resolver: Resolver,
    store: ArtifactStore,
    fonts: FontLocator,
    fetcher: Arc<dyn SourceFetcher>,
    scratch_dir: PathBuf,
    inflight: InFlight,
}

impl ArtifactPipeline {
    /// Pipeline over `config` and `presets`, fetching remote sources over HTTP.
    pub fn new(config: Arc<PixcacheConfig>, presets: Arc<PresetRegistry>) -> PixcacheResult<Self> {
        let fetcher = HttpFetcher::new()?;
        Ok(Self::with_fetcher(config, presets, Arc::new(fetcher)))
    }

    /// Pipeline with a caller-supplied remote fetcher.
    pub fn with_fetcher(
        config: Arc<PixcacheConfig>,
        presets: Arc<PresetRegistry>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&config)),
            store: ArtifactStore::new(config.public_root.clone()),
            fonts: FontLocator::new(config.font_paths.clone(), config.default_font.clone()),
            config,
            presets,
            fetcher,
            scratch_dir: std::env::temp_dir(),
            inflight: InFlight::default(),
        }
    }

    /// Directory remote sources are downloaded into before decoding. Defaults to the system
    /// temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &PixcacheConfig {
        &self.config
    }

    /// Registered presets.
    pub fn presets(&self) -> &Arc<PresetRegistry> {
        &self.presets
    }

    /// URL builder and decoder.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Artifact file store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Decode `url` (path and query) and serve its artifact.
    #[tracing::instrument(skip(self))]
    pub fn serve(&self, url: &str) -> PixcacheResult<Served> {
        let request = self.resolver.decode_request_path(url)?;
        self.serve_request(&request)
    }

    /// Serve an already decoded request.
    pub fn serve_request(&self, request: &ArtifactRequest) -> PixcacheResult<Served> {
        let ctx = PresetContext {
            format: request.format(),
            gravity: Gravity::Center,
            fonts: &self.fonts,
        };
        match request {
            ArtifactRequest::Image(req) => {
                let preset = self.presets.image(&req.preset)?;
                let ctx = PresetContext {
                    gravity: req.gravity,
                    ..ctx
                };
                self.generate_or_serve(request, || {
                    let source = decode_image_file(Path::new(&req.source))?;
                    preset.apply(&source, &ctx)
                })
            }
            ArtifactRequest::External(req) => {
                let preset = self.presets.image(&req.preset)?;
                let ctx = PresetContext {
                    gravity: req.gravity,
                    ..ctx
                };
                self.generate_or_serve(request, || {
                    let source =
                        fetch_and_decode(self.fetcher.as_ref(), &req.source, &self.scratch_dir)
                            .map_err(|err| {
                                tracing::warn!(uri = %req.source, error = %err, "remote source unavailable");
                                PixcacheError::not_found(format!("remote source '{}'", req.source))
                            })?;
                    preset.apply(&source, &ctx)
                })
            }
            ArtifactRequest::Text(req) => {
                let preset = self.presets.text(&req.preset)?;
                let text = req.payload.text();
                self.generate_or_serve(request, || preset.render(&text, &ctx))
            }
        }
    }

    fn generate_or_serve(
        &self,
        request: &ArtifactRequest,
        generate: impl FnOnce() -> PixcacheResult<Artifact>,
    ) -> PixcacheResult<Served> {
        let target = request.artifact();
        let hit = match request.namespace() {
            Namespace::External => ServeOutcome::AlreadyExisted,
            Namespace::Images | Namespace::Textim => ServeOutcome::CacheHit,
        };

        let _leader = loop {
            if let Some(bytes) = self.store.read(&target.disk_path)? {
                tracing::debug!(path = %target.disk_path.display(), "cache hit");
                return Ok(self.served(request, bytes, hit));
            }
            match self.inflight.claim(&target.disk_path) {
                Claim::Leader(guard) => break guard,
                Claim::Waited => continue,
            }
        };
        // a previous leader may have persisted between the read and the claim
        if let Some(bytes) = self.store.read(&target.disk_path)? {
            return Ok(self.served(request, bytes, hit));
        }

        tracing::debug!(path = %target.disk_path.display(), preset = request.preset(), "cache miss");
        let artifact = generate()?;
        let bytes = encode_artifact(&artifact, request.format())?;
        self.store.write_atomic(&target.disk_path, &bytes)?;
        tracing::info!(path = %target.disk_path.display(), bytes = bytes.len(), "artifact generated");
        Ok(self.served(request, bytes, ServeOutcome::Generated))
    }

    fn served(&self, request: &ArtifactRequest, bytes: Vec<u8>, outcome: ServeOutcome) -> Served {
        let target = request.artifact();
        Served {
            bytes,
            content_type: request.format().mime().to_string(),
            disk_path: target.disk_path.clone(),
            public_url: target.public_url.clone(),
            outcome,
        }
    }
}

impl std::fmt::Debug for ArtifactPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactPipeline")
            .field("public_root", &self.config.public_root)
            .field("presets", &self.presets)
            .field("in_flight", &self.inflight.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/mod.rs"]
mod tests;
