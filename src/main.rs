use anyhow::{Context, Result};
use clap::Parser;
use musbot::actions::TrackHandlers;
use musbot::bot::{self, Collaborators, EngineSettings, SessionEngine};
use musbot::config::{AppConfig, CliConfig, FileConfig};
use musbot::media::{HttpAudioFetcher, MediaLibrary};
use musbot::session;
use musbot::sources::{
    AuthorNormalizer, HtmlTrackSource, HttpPageFetcher, PageFetcher, TrackLoader, TrackSource,
};
use musbot::store::{LibraryStore, SqliteStore};
use musbot::transport::TelegramTransport;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Directory downloaded tracks are stored in.
    #[clap(long, value_parser = parse_path)]
    pub tracks_dir: Option<PathBuf>,

    /// Telegram bot token.
    #[clap(long, env = "MUSBOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Telegram id of the user allowed to run admin commands.
    #[clap(long, env = "MUSBOT_ADMIN_ID")]
    pub admin_id: Option<i64>,

    /// Timeout in seconds for every HTTP request.
    #[clap(long, default_value_t = 30)]
    pub http_timeout_sec: u64,

    /// How long a single long poll waits for updates.
    #[clap(long, default_value_t = 50)]
    pub poll_timeout_sec: u64,

    /// Attempts at sending an audio file before giving up.
    #[clap(long, default_value_t = 3)]
    pub max_send_tries: u32,

    /// Result pages followed per source and search.
    #[clap(long, default_value_t = 5)]
    pub max_pages: usize,

    /// Log at debug level unless LOG_LEVEL says otherwise.
    #[clap(long)]
    pub debug: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            bot_token: self.bot_token.clone(),
            admin_id: self.admin_id,
            db_path: self.db_path.clone(),
            tracks_dir: self.tracks_dir.clone(),
            http_timeout_sec: self.http_timeout_sec,
            poll_timeout_sec: self.poll_timeout_sec,
            max_send_tries: self.max_send_tries,
            max_pages: self.max_pages,
        }
    }
}

fn build_loader(config: &AppConfig) -> Result<TrackLoader> {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(config.http_timeout_sec)?);
    let mut sources: Vec<Box<dyn TrackSource>> = Vec::new();
    for settings in &config.sources {
        info!("Source {} at {}", settings.name, settings.search_url);
        sources.push(Box::new(HtmlTrackSource::new(
            settings,
            config.max_pages,
            fetcher.clone(),
        )?));
    }
    let normalizer = AuthorNormalizer::new(&config.normalization)?;
    Ok(TrackLoader::new(sources, normalizer))
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let default_level = if cli_args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite database at {:?}...", config.db_path);
    let store = Arc::new(SqliteStore::new(&config.db_path)?);

    let handlers = TrackHandlers::with_defaults();
    let registry = session::restore(store.as_ref(), &handlers)?;

    let collaborators = Collaborators {
        transport: Box::new(TelegramTransport::new(
            &config.bot_token,
            config.http_timeout_sec,
            config.poll_timeout_sec,
        )?),
        store: store.clone() as Arc<dyn LibraryStore>,
        loader: build_loader(&config)?,
        media: MediaLibrary::new(&config.tracks_dir, &config.media.target_format)?,
        fetcher: Box::new(HttpAudioFetcher::new(config.http_timeout_sec)?),
    };
    let settings = EngineSettings {
        admin_id: config.admin_id,
        max_send_tries: config.max_send_tries,
        media: config.media.clone(),
    };
    let mut engine = SessionEngine::new(collaborators, handlers, registry, settings);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received, finishing the current poll...");
        stop_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install the signal handler")?;

    bot::run(&mut engine, &stop);

    if let Err(err) = session::snapshot(engine.registry(), store.as_ref()) {
        error!("{:?}", err);
    }
    info!("Bye");
    Ok(())
}
