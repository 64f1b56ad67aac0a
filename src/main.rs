use clap::{Parser, Subcommand, ValueEnum};
use rehost::base62::IdCodec;
use rehost::catalog::{CatalogStore, CollectionFilter, EntryKind, OrderBy, SqliteCatalog};
use rehost::config;
use rehost::fetch::HttpFetcher;
use rehost::imaging::{Rect, RustBackend};
use rehost::ingest::{NewImage, Pipeline};
use rehost::keywords::normalize_query;
use rehost::output::{self, EntryView};
use rehost::search::search_store;
use rehost::storage::Storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use url::Url;

#[derive(Parser)]
#[command(name = "rehost")]
#[command(about = "Image rehosting catalog: thumbnails, crops, short ids and keyword search")]
#[command(long_about = "\
Image rehosting catalog: thumbnails, crops, short ids and keyword search

Images come from local files or http(s) URLs. Everything lives under one
base folder:

  <base>/
  ├── sqlite.db          # Catalog
  ├── store/<id>.jpg     # Original bytes (.jpg, .png or .gif)
  ├── thumb/<id>.jpg     # 200x200 thumbnails (.png for GIF sources)
  └── tmp/               # Crops being staged

Entries are addressed by short base62 public ids on the command line.
YouTube and imgur .gifv links can be catalogued without storing a file.

Search ranks entries by how closely the query words appear together in
their keywords; only the best-scoring entries are listed.

Run 'rehost gen-config' to generate a documented rehost.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Base folder (overrides base_folder from the config file)
    #[arg(long, global = true)]
    base: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that list entries.
#[derive(clap::Args, Clone)]
struct ListArgs {
    /// Collection name ("all" for every collection)
    #[arg(long)]
    collection: Option<String>,

    /// Also include entries from the unnamed base collection
    #[arg(long)]
    include_base: bool,

    #[arg(long, value_enum, default_value_t = Order::Newest)]
    order: Order,

    /// Print a JSON array instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Title,
    TitleDesc,
    Oldest,
    Newest,
}

impl From<Order> for OrderBy {
    fn from(order: Order) -> Self {
        match order {
            Order::Title => OrderBy::TitleAsc,
            Order::TitleDesc => OrderBy::TitleDesc,
            Order::Oldest => OrderBy::IdAsc,
            Order::Newest => OrderBy::IdDesc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkKind {
    Youtube,
    ImgurGifv,
}

impl From<LinkKind> for EntryKind {
    fn from(kind: LinkKind) -> Self {
        match kind {
            LinkKind::Youtube => EntryKind::Youtube,
            LinkKind::ImgurGifv => EntryKind::ImgurGifv,
        }
    }
}

/// Metadata flags for commands that create entries.
#[derive(clap::Args, Clone)]
struct MetaArgs {
    #[arg(long)]
    title: String,

    /// Keywords (derived from the title when omitted)
    #[arg(long)]
    keywords: Option<String>,

    #[arg(long, default_value = "")]
    collection: String,

    #[arg(long, default_value = "")]
    submitter: String,
}

impl MetaArgs {
    fn into_new_image(self) -> NewImage {
        NewImage {
            title: self.title,
            keywords: self.keywords,
            collection_name: self.collection,
            submitter: self.submitter,
            source_url: None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Store an image (JPEG, PNG or GIF) from a file or an http(s) URL
    Add {
        /// File path, or a URL to download (YouTube/imgur .gifv URLs become links)
        source: String,
        #[command(flatten)]
        meta: MetaArgs,
        /// Where the image was found
        #[arg(long)]
        source_url: Option<String>,
    },
    /// Catalog a YouTube watch URL or an imgur .gifv URL
    Link {
        url: String,
        /// Treat URL as an already-extracted video id / imgur hash of this kind
        #[arg(long, value_enum)]
        kind: Option<LinkKind>,
        #[command(flatten)]
        meta: MetaArgs,
    },
    /// Store every image in a directory tree
    Import {
        dir: PathBuf,
        #[arg(long, default_value = "")]
        collection: String,
    },
    /// Show one entry
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List visible entries
    List(ListArgs),
    /// Rank entries by keyword proximity and list the best matches
    Search {
        words: Vec<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Generate (if missing) and print the thumbnail path of an entry
    Thumb {
        id: String,
        /// Regenerate even if the thumbnail exists
        #[arg(long)]
        force: bool,
    },
    /// Generate missing thumbnails for every stored image
    Thumbs {
        /// Regenerate all thumbnails
        #[arg(long)]
        force: bool,
    },
    /// Crop a rectangle out of an entry into a new entry
    Crop {
        id: String,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    },
    /// Delete an entry and its files
    Delete { id: String },
    /// Derive keywords from titles for entries that have none
    ReindexKeywords,
    /// Print the public id for a row id
    EncodeId { row_id: i64 },
    /// Print the row id behind a public id
    DecodeId { id: String },
    /// Print a stock rehost.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut host_config = config::load_config(&cli.config)?;
    if let Some(base) = cli.base {
        host_config.base_folder = base;
    }
    let codec = host_config.id_codec()?;

    match &cli.command {
        Command::EncodeId { row_id } => {
            let public = codec
                .public_id(*row_id)
                .ok_or_else(|| format!("Row id {row_id} has no public id"))?;
            println!("{public}");
            return Ok(());
        }
        Command::DecodeId { id } => {
            println!("{}", parse_id(&codec, id)?);
            return Ok(());
        }
        _ => {}
    }

    init_thread_pool(&host_config.processing);
    let storage = Storage::new(&host_config.base_folder);
    storage.ensure_dirs()?;
    let catalog = SqliteCatalog::open(&storage.db_path())?;
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(
        &catalog,
        &storage,
        &backend,
        host_config.thumbnail_config(),
    );

    match cli.command {
        Command::Add {
            source,
            meta,
            source_url,
        } => {
            let new = NewImage {
                source_url,
                ..meta.into_new_image()
            };
            let entry = if is_web_url(&source) {
                let fetcher = HttpFetcher::new(&host_config.fetch)?;
                pipeline.ingest_url(&fetcher, &source, new)?
            } else {
                pipeline.ingest_file(Path::new(&source), new)?
            };
            output::print_entry(&EntryView::new(&entry, &codec));
        }
        Command::Link { url, kind, meta } => {
            let entry = pipeline.add_link(&url, kind.map(EntryKind::from), meta.into_new_image())?;
            output::print_entry(&EntryView::new(&entry, &codec));
        }
        Command::Import { dir, collection } => {
            let (tx, rx) = std::sync::mpsc::channel();
            let printer_codec = codec.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_import_event(&event, &printer_codec) {
                        println!("{}", line);
                    }
                }
            });
            let summary = pipeline.import_dir(&dir, &collection, Some(tx))?;
            printer
                .join()
                .map_err(|_| "import progress printer panicked")?;
            output::print_import_summary(&summary);
        }
        Command::Show { id, json } => {
            let row_id = parse_id(&codec, &id)?;
            let entry = catalog
                .get_by_id(row_id)?
                .ok_or_else(|| format!("No entry with id {id}"))?;
            let view = EntryView::new(&entry, &codec);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                output::print_entry(&view);
            }
        }
        Command::List(args) => {
            let filter = CollectionFilter::from_args(args.collection.as_deref(), args.include_base);
            let entries = catalog.list_candidates(&filter, args.order.into())?;
            print_views(&EntryView::list(&entries, &codec), args.json, None)?;
        }
        Command::Search { words, list } => {
            let query = normalize_query(words.as_slice());
            let filter = CollectionFilter::from_args(list.collection.as_deref(), list.include_base);
            let winners = search_store(&catalog, query.as_slice(), &filter, list.order.into())?;
            print_views(&EntryView::list(&winners, &codec), list.json, Some(query.as_slice()))?;
        }
        Command::Thumb { id, force } => {
            let (path, _) = pipeline.thumbnail_for(parse_id(&codec, &id)?, force)?;
            println!("{}", path.display());
        }
        Command::Thumbs { force } => {
            let stats = pipeline.rebuild_thumbnails(force)?;
            output::print_thumb_stats(&stats);
        }
        Command::Crop {
            id,
            left,
            top,
            right,
            bottom,
        } => {
            let rect = Rect::new(left, top, right, bottom);
            let entry = pipeline.crop_entry(parse_id(&codec, &id)?, rect)?;
            output::print_entry(&EntryView::new(&entry, &codec));
        }
        Command::Delete { id } => {
            let entry = pipeline.delete_entry(parse_id(&codec, &id)?)?;
            println!("Deleted {} {}", id, entry.title);
        }
        Command::ReindexKeywords => {
            let updated = pipeline.backfill_keywords()?;
            println!("Updated keywords for {updated} entries");
        }
        Command::EncodeId { .. } | Command::DecodeId { .. } | Command::GenConfig => {}
    }

    Ok(())
}

fn is_web_url(source: &str) -> bool {
    Url::parse(source).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn parse_id(codec: &IdCodec, public: &str) -> Result<i64, String> {
    codec
        .row_id(public)
        .ok_or_else(|| format!("'{public}' is not a valid id"))
}

fn print_views(
    views: &[EntryView],
    json: bool,
    query: Option<&[String]>,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", output::format_json(views)?);
    } else if let Some(query) = query {
        output::print_search_results(query, views);
    } else {
        output::print_entry_list(views);
    }
    Ok(())
}

/// Install the stderr log subscriber.
///
/// Priority: `REHOST_LOG`, then `RUST_LOG`, then `-v` (debug) / `-q` (error),
/// then `warn`.
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = std::env::var("REHOST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| {
            let level = if verbose {
                "debug"
            } else if quiet {
                "error"
            } else {
                "warn"
            };
            EnvFilter::new(level)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .compact(),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
