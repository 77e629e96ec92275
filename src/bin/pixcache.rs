use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pixcache::{
    ArtifactPipeline, Catalog, InfoOptions, Invalidator, Namespace, PixcacheConfig, QueryParams,
    UrlOptions,
};

#[derive(Parser, Debug)]
#[command(name = "pixcache", version)]
struct Cli {
    /// JSON configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scheme and host prefixed to absolute URLs, e.g. `https://img.example.com`.
    #[arg(long, global = true, default_value = "")]
    base_url: String,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the artifact URL of a source.
    #[command(subcommand)]
    Url(UrlCommand),
    /// Serve a request URL, generating the artifact on first request.
    Get {
        /// Request path, with query string for labels.
        url: String,
    },
    /// Delete one artifact by its request URL.
    Delete {
        /// Request path, with query string for labels.
        url: String,
    },
    /// Delete every artifact of one preset.
    DeletePreset {
        /// Namespace the preset belongs to.
        #[arg(value_enum)]
        namespace: NamespaceArg,
        /// Preset name.
        preset: String,
    },
    /// Delete every artifact of a namespace.
    DeleteAll {
        /// Namespace to clear.
        #[arg(value_enum)]
        namespace: NamespaceArg,
    },
    /// Print the info JSON of a request URL.
    Info {
        /// Request path, with query string for labels.
        url: String,
        /// Include dimensions, size and content type.
        #[arg(long)]
        metadata: bool,
        /// Include the URL of the same source under every preset.
        #[arg(long)]
        presets: bool,
        /// Leave preset URLs relative.
        #[arg(long)]
        relative: bool,
    },
    /// Reverse lookup: artifact URL of a source path.
    Locate {
        /// Namespace to build the URL in.
        #[arg(value_enum)]
        namespace: NamespaceArg,
        /// Storage-relative source path (or label text).
        source: String,
        #[command(flatten)]
        opts: UrlArgs,
        /// Leave the URL relative.
        #[arg(long)]
        relative: bool,
        /// Report a redirect instead of a plain answer.
        #[arg(long)]
        redirect: bool,
    },
    /// List one sample URL per preset.
    Index {
        /// Namespace to list.
        #[arg(value_enum)]
        namespace: NamespaceArg,
        /// Print `<img>` tags instead of one URL per line.
        #[arg(long)]
        html: bool,
    },
}

#[derive(Subcommand, Debug)]
enum UrlCommand {
    /// Local source image.
    Image {
        /// Storage-relative path, or an absolute path with `--absolute`.
        path: String,
        #[command(flatten)]
        opts: UrlArgs,
        /// `path` is an absolute path below the storage directory.
        #[arg(long)]
        absolute: bool,
    },
    /// Remote source image.
    External {
        /// Storage-relative path, or a full URI with `--absolute`.
        uri: String,
        #[command(flatten)]
        opts: UrlArgs,
        /// `uri` starts with the storage base URI.
        #[arg(long)]
        absolute: bool,
    },
    /// Text label.
    Text {
        /// Label text (ISO-8859-1).
        text: String,
        /// Preset name.
        #[arg(long)]
        preset: Option<String>,
        /// Output extension.
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Args, Debug)]
struct UrlArgs {
    /// Preset name.
    #[arg(long)]
    preset: Option<String>,
    /// Output extension.
    #[arg(long)]
    format: Option<String>,
    /// Storage key.
    #[arg(long)]
    storage: Option<String>,
}

impl UrlArgs {
    fn to_options(&self) -> UrlOptions {
        UrlOptions {
            preset: self.preset.clone(),
            format: self.format.clone(),
            storage: self.storage.clone(),
            ..UrlOptions::default()
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NamespaceArg {
    Images,
    External,
    Textim,
}

impl From<NamespaceArg> for Namespace {
    fn from(value: NamespaceArg) -> Self {
        match value {
            NamespaceArg::Images => Namespace::Images,
            NamespaceArg::External => Namespace::External,
            NamespaceArg::Textim => Namespace::Textim,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => PixcacheConfig::from_path(path)?,
        None => PixcacheConfig::default(),
    };
    let config = Arc::new(config);
    let presets = Arc::new(pixcache::builtin_registry()?);
    tracing::debug!(public_root = %config.public_root.display(), "configuration loaded");

    match cli.cmd {
        Command::Url(cmd) => cmd_url(&config, cmd),
        Command::Get { url } => {
            let pipeline = ArtifactPipeline::new(config, presets)?;
            let served = pipeline.serve(&url)?;
            println!(
                "{} {} {}",
                served.status_code(),
                served.content_type,
                served.disk_path.display()
            );
            Ok(())
        }
        Command::Delete { url } => {
            let deleted = Invalidator::new(config, presets).delete_one(&url)?;
            println!("{} removed={}", deleted.status_code(), deleted.removed);
            Ok(())
        }
        Command::DeletePreset { namespace, preset } => {
            let deleted =
                Invalidator::new(config, presets).delete_preset(namespace.into(), &preset)?;
            println!("{} removed={}", deleted.status_code(), deleted.removed);
            Ok(())
        }
        Command::DeleteAll { namespace } => {
            let deleted = Invalidator::new(config, presets).delete_all(namespace.into())?;
            println!("{} removed={}", deleted.status_code(), deleted.removed);
            Ok(())
        }
        Command::Info {
            url,
            metadata,
            presets: with_presets,
            relative,
        } => {
            let catalog = Catalog::new(pixcache::Resolver::new(config), presets);
            let opts = InfoOptions {
                metadata,
                presets: with_presets,
                relative,
                base_url: cli.base_url,
            };
            let info = catalog.info(&url, &opts)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("serialize info")?
            );
            Ok(())
        }
        Command::Locate {
            namespace,
            source,
            opts,
            relative,
            redirect,
        } => {
            let catalog = Catalog::new(pixcache::Resolver::new(config), presets);
            let mut query = QueryParams::default();
            for (key, value) in [
                ("preset", &opts.preset),
                ("format", &opts.format),
                ("storage", &opts.storage),
            ] {
                if let Some(value) = value {
                    query = query.with(key, value.as_str());
                }
            }
            if relative {
                query = query.with("relative", "");
            }
            if redirect {
                query = query.with("redirect", "");
            }
            let located = catalog.locate(namespace.into(), &source, &query, &cli.base_url)?;
            println!("{} {}", located.status_code(), located.url);
            Ok(())
        }
        Command::Index { namespace, html } => {
            let catalog = Catalog::new(pixcache::Resolver::new(config), presets);
            if html {
                println!("{}", catalog.index_html(namespace.into())?);
            } else {
                for entry in catalog.index(namespace.into())? {
                    println!("{}\t{}", entry.preset, entry.url);
                }
            }
            Ok(())
        }
    }
}

fn cmd_url(config: &Arc<PixcacheConfig>, cmd: UrlCommand) -> anyhow::Result<()> {
    let resolver = pixcache::Resolver::new(Arc::clone(config));
    let url = match cmd {
        UrlCommand::Image {
            path,
            opts,
            absolute,
        } => resolver.url_for_image(&path, &opts.to_options().absolute(absolute))?,
        UrlCommand::External {
            uri,
            opts,
            absolute,
        } => resolver.url_for_external_image(&uri, &opts.to_options().absolute(absolute))?,
        UrlCommand::Text {
            text,
            preset,
            format,
        } => {
            let opts = UrlOptions {
                preset,
                format,
                ..UrlOptions::default()
            };
            resolver.url_for_textim(&text, &opts)?.to_url()
        }
    };
    println!("{url}");
    Ok(())
}
