use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use hydro_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_API_PORT, DEFAULT_STATIONS_FILE,
};
use log::LevelFilter;
use std::str::FromStr;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DATA_DIR: &str = "./station_data";

/// Log targets that follow the configured level.
const LOG_TARGETS: [&str; 4] = ["hydro", "duckdb", "http_request", "http_response"];

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Serves station time series and seasonal percentile bands"
)]
pub struct Cli {
    /// Config file (TOML). Without it $HYDRO_API_CONFIG, ./hydro.toml,
    /// $XDG_CONFIG_HOME/hydro-api/hydro.toml and /etc/hydro-api/hydro.toml
    /// are tried in that order
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(short, long, env = "HYDRO_API_LEVEL")]
    pub level: Option<String>,

    /// Address to bind, 0.0.0.0 for every interface
    #[arg(long, env = "HYDRO_API_HOST")]
    pub host: Option<String>,

    #[arg(short, long, env = "HYDRO_API_PORT")]
    pub port: Option<u16>,

    /// Public base URL shown in the API docs
    #[arg(short, long, env = "HYDRO_API_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Holds one folder of parquet files per station
    #[arg(short, long, env = "HYDRO_API_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Station registry (TOML)
    #[arg(short, long, env = "HYDRO_API_STATIONS")]
    pub stations: Option<String>,
}

impl Cli {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_API_PORT)
    }

    /// Falls back to the listen address
    pub fn remote_url(&self) -> String {
        match &self.remote_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://{}:{}", self.host(), self.port()),
        }
    }

    pub fn data_dir(&self) -> &str {
        self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    pub fn stations_file(&self) -> &str {
        self.stations.as_deref().unwrap_or(DEFAULT_STATIONS_FILE)
    }

    /// Fills every option left unset on the command line (or its env var)
    /// from `file`.
    pub fn or_file(self, file: Cli) -> Cli {
        Cli {
            config: self.config,
            level: self.level.or(file.level),
            host: self.host.or(file.host),
            port: self.port.or(file.port),
            remote_url: self.remote_url.or(file.remote_url),
            data_dir: self.data_dir.or(file.data_dir),
            stations: self.stations.or(file.stations),
        }
    }
}

/// Command line and env vars first, then the config file, then defaults.
pub fn get_config_info() -> Cli {
    let args = Cli::parse();
    let source = match &args.config {
        Some(path) => ConfigSource::Explicit(path.into()),
        None => find_config_file("HYDRO_API_CONFIG", "hydro.toml"),
    };

    match load_config::<Cli>(&source) {
        Ok(file) => args.or_file(file),
        Err(e) => {
            // logger is not up yet
            eprintln!("ignoring config {}: {:#}", source, e);
            args
        }
    }
}

/// Unrecognized levels fall back to info.
pub fn get_log_level(cli: &Cli) -> LevelFilter {
    cli.level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

pub fn setup_logger(level: LevelFilter) -> fern::Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level);

    LOG_TARGETS
        .iter()
        .fold(dispatch, |dispatch, target| dispatch.level_for(*target, level))
        .chain(std::io::stdout())
}
