use clap::{Parser, Subcommand};
use instagrandad::cache::EncodeCache;
use instagrandad::client::HttpPhotoClient;
use instagrandad::imaging::RustBackend;
use instagrandad::types::{DEFAULT_LIMIT, PageRequest};
use instagrandad::upload::{PhotoSink, SourceFile, UploadConfig, Uploader};
use instagrandad::{config, output, server, store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shared flag for commands that can bypass the server.
#[derive(clap::Args, Clone)]
struct LocalArgs {
    /// Read and write the configured storage directly instead of the server
    #[arg(long)]
    local: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "instagrandad")]
#[command(about = "Family photo sharing: upload, store and page through photos")]
#[command(long_about = "\
Family photo sharing: upload, store and page through photos

The server keeps the whole gallery as one JSON document of photo records,
newest first. Each record embeds a full-size image and a thumbnail as
data-URIs. Uploads are validated (JPEG, PNG, GIF or WebP, at most 10 MiB),
resized, and sent three at a time.

Typical use:

  instagrandad serve                          # start the API
  instagrandad upload -d 'Birthday' cake.jpg  # add a photo
  instagrandad list --page 2                  # browse the gallery

Set RUST_LOG (e.g. RUST_LOG=debug) for more detailed logs.
Run 'instagrandad gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./instagrandad.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Validate, resize and upload photos
    Upload {
        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Description, once per file in order; a single value applies to all
        #[arg(short, long = "description")]
        descriptions: Vec<String>,
        /// Name recorded as the uploader
        #[arg(long = "as", default_value = "family")]
        uploaded_by: String,
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Show one page of the gallery
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Delete every photo with the given id
    Delete {
        id: String,
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    // gen-config must work even when the current config file is broken
    let load_config = || config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Serve => {
            let config = load_config()?;
            let store = store::open(&config);
            server::serve(&config, store).await?;
        }
        Command::Upload {
            files,
            descriptions,
            uploaded_by,
            local,
        } => {
            let config = load_config()?;
            let sink: Arc<dyn PhotoSink> = if local.local {
                Arc::new(store::open(&config))
            } else {
                Arc::new(HttpPhotoClient::new(&config.client.server_url))
            };

            let mut sources = Vec::with_capacity(files.len());
            for path in &files {
                let source = SourceFile::from_path(path)
                    .await
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                sources.push(source);
            }
            let descriptions = match descriptions.as_slice() {
                [single] => vec![single.clone(); sources.len()],
                _ => descriptions,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_upload_event(&event) {
                        println!("{}", line);
                    }
                }
            });

            let uploader = Uploader::new(
                Arc::new(RustBackend::new()),
                sink,
                UploadConfig::from_app_config(&config),
            )
            .with_cache(Arc::new(EncodeCache::new(config.upload.cache_capacity)))
            .with_events(tx);

            let result = uploader.upload_many(&sources, &descriptions, &uploaded_by).await;
            let cache_stats = uploader.cache().stats();
            drop(uploader);
            printer.join().map_err(|_| "output thread panicked")?;

            let outcome = result?;
            output::print_batch_summary(&outcome);
            println!("Cache: {}", cache_stats);
        }
        Command::List { page, limit, local } => {
            let config = load_config()?;
            let request = PageRequest::new(page, limit);
            let page = if local.local {
                store::open(&config).list(request).await
            } else {
                HttpPhotoClient::new(&config.client.server_url)
                    .list(request)
                    .await?
            };
            output::print_photo_page(&page);
        }
        Command::Delete { id, local } => {
            let config = load_config()?;
            if local.local {
                let removed = store::open(&config).delete(&id).await?;
                output::print_deleted(&id, Some(removed));
            } else {
                let deleted = HttpPhotoClient::new(&config.client.server_url)
                    .delete(&id)
                    .await?;
                output::print_deleted(&deleted, None);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
