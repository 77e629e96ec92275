use std::fmt;

/// Which preset table a preset name is looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PresetKind {
    /// Presets that transform a decoded source image.
    Image,
    /// Presets that render a text payload into a label.
    Text,
}

/// URL namespace an artifact lives under.
///
/// Local images and remote images share the image preset table but keep separate artifact trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Sources read from a local storage directory.
    Images,
    /// Sources fetched from a remote storage base URI.
    External,
    /// Text labels rendered from a query payload.
    Textim,
}

impl Namespace {
    /// All namespaces, in URL registration order.
    pub const ALL: [Namespace; 3] = [Namespace::Textim, Namespace::Images, Namespace::External];

    /// Path segment naming this namespace.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::External => "external",
            Self::Textim => "textim",
        }
    }

    /// Preset table consulted for requests in this namespace.
    pub fn preset_kind(self) -> PresetKind {
        match self {
            Self::Images | Self::External => PresetKind::Image,
            Self::Textim => PresetKind::Text,
        }
    }

    /// Parse a namespace path segment.
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "images" => Some(Self::Images),
            "external" => Some(Self::External),
            "textim" => Some(Self::Textim),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured output format: URL extension, response mime type and encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactFormat {
    ext: String,
    mime: String,
    image_format: image::ImageFormat,
}

impl ArtifactFormat {
    /// Build a format from its extension and mime type.
    ///
    /// Returns `None` when the extension has no encoder in the image codec.
    pub fn new(ext: impl Into<String>, mime: impl Into<String>) -> Option<Self> {
        let ext = ext.into();
        let image_format = image::ImageFormat::from_extension(&ext)?;
        if !image_format.writing_enabled() {
            return None;
        }
        Some(Self {
            ext,
            mime: mime.into(),
            image_format,
        })
    }

    /// URL/file extension, without the dot.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Content type sent with served bytes.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Encoder used to persist artifacts in this format.
    pub fn image_format(&self) -> image::ImageFormat {
        self.image_format
    }

    /// Whether the encoded file keeps an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        matches!(
            self.image_format,
            image::ImageFormat::Png | image::ImageFormat::Gif | image::ImageFormat::WebP
        )
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ext)
    }
}
