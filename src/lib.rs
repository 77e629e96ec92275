//! pixcache is a content-addressed artifact cache for resized images and rendered text labels.
//!
//! Every artifact has a deterministic URL that packs a checksum of its inputs, so the URL doubles
//! as an authorization token and as the artifact's path below the public root:
//!
//! - Build URLs with a [`Resolver`]
//! - Serve them (generating on first request) through an [`ArtifactPipeline`]
//! - Inspect them with a [`Catalog`] and drop them with an [`Invalidator`]
//!
//! Presets are registered once at startup in a [`PresetRegistry`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
/// Configuration, core value types and errors.
pub mod foundation;
pub mod invalidate;
pub mod pipeline;
pub mod presets;
pub mod render;
pub mod resolve;
pub mod store;

pub use crate::codec::checksum::Checksum;
pub use crate::codec::payload::CharacterPayload;
pub use crate::foundation::config::{PixcacheConfig, StorageLocation};
pub use crate::foundation::core::{ArtifactFormat, Namespace, PresetKind};
pub use crate::foundation::error::{ErrorKind, PixcacheError, PixcacheResult};
pub use crate::invalidate::{Deleted, Invalidator};
pub use crate::pipeline::catalog::{ArtifactInfo, Catalog, IndexEntry, InfoOptions, Located};
pub use crate::pipeline::fetch::{HttpFetcher, SourceFetcher};
pub use crate::pipeline::{ArtifactPipeline, ServeOutcome, Served};
pub use crate::presets::builtin::{builtin_presets, builtin_registry};
pub use crate::presets::registry::{
    ImagePreset, PresetContext, PresetHandler, PresetRegistry, PresetRegistryBuilder, TextPreset,
};
pub use crate::render::codec::Artifact;
pub use crate::render::crop::Gravity;
pub use crate::render::label::{LabelStyle, Rgba8};
pub use crate::resolve::{ArtifactRequest, QueryParams, Resolver, TextUrl, UrlOptions};
