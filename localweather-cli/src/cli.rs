use std::{io::IsTerminal, sync::Arc};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use localweather_core::{
    AppController, Collaborators, Config, Coordinate, DnsReachability, FileStore, KeyValueStore,
    Renderer, ResponseCache, config::PREFERENCE_NAME, location, present,
    present::region_from_locale, provider,
};

use crate::{
    configure,
    platform::{TerminalPermission, TerminalRenderer, TerminalSettings},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "localweather", version, about = "Current weather for where you are")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Locate, fetch and show the current weather, then offer a refresh menu.
    Show(ShowArgs),

    /// Show the last cached weather without going online.
    Cached {
        /// Region code deciding Celsius or Fahrenheit, e.g. "US".
        #[arg(long)]
        region: Option<String>,
    },

    /// Configure API key, location source and region interactively.
    Configure,
}

#[derive(Debug, Default, clap::Args)]
pub struct ShowArgs {
    /// Latitude to use instead of the configured location source.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude to use instead of the configured location source.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Region code deciding Celsius or Fahrenheit, e.g. "US".
    #[arg(long)]
    region: Option<String>,

    /// Exit after the first display instead of offering refresh.
    #[arg(long)]
    once: bool,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Show(ShowArgs::default())) {
            Command::Show(args) => show(args).await,
            Command::Cached { region } => cached(region),
            Command::Configure => configure::run().await,
        }
    }
}

async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let explicit_fix = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let coord = Coordinate::new(lat, lon);
            config.set_fixed_coordinate(coord);
            config.location.enabled = true;
            true
        }
        _ => false,
    };

    let region = resolve_region(args.region, &config);
    let interactive = std::io::stdin().is_terminal();
    let store: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::open(&Config::data_dir()?, PREFERENCE_NAME));

    let parts = match collaborators(&config, explicit_fix, interactive, store.clone()) {
        Ok(parts) => parts,
        Err(err) => {
            let cache = ResponseCache::new(store);
            let mut renderer = TerminalRenderer::new();
            return Err(fall_back_to_cache(&cache, region.as_deref(), &mut renderer, err));
        }
    };

    let mut controller = AppController::new(parts, region);
    controller.launch().await;

    if args.once || !interactive {
        return Ok(());
    }

    while prompt_refresh().await? {
        controller.refresh().await;
    }

    Ok(())
}

fn collaborators(
    config: &Config,
    explicit_fix: bool,
    interactive: bool,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<Collaborators> {
    Ok(Collaborators {
        location: location::provider_from_config(config)?,
        permission: Box::new(TerminalPermission::new(explicit_fix, interactive)),
        network: Box::new(DnsReachability::for_url(config.base_url())?),
        weather: provider::provider_from_config(config)?,
        store,
        renderer: Box::new(TerminalRenderer::new()),
        settings: Box::new(TerminalSettings),
    })
}

/// Draw the cached record (or the empty state) before reporting `err`.
fn fall_back_to_cache<S: KeyValueStore>(
    cache: &ResponseCache<S>,
    region: Option<&str>,
    renderer: &mut dyn Renderer,
    err: anyhow::Error,
) -> anyhow::Error {
    tracing::warn!(error = %err, "cannot start weather cycle, showing cached data");
    let model = cache.load().map(|record| present(&record, region));
    renderer.render(model.as_ref());
    err
}

/// Menu shown after each cycle. `false` means quit.
async fn prompt_refresh() -> anyhow::Result<bool> {
    const REFRESH: &str = "Refresh";
    const QUIT: &str = "Quit";

    let answer = tokio::task::spawn_blocking(|| {
        inquire::Select::new("What next?", vec![REFRESH, QUIT]).prompt()
    })
    .await
    .context("Menu prompt task failed")?;

    match answer {
        Ok(choice) => Ok(choice == REFRESH),
        Err(
            inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted,
        ) => Ok(false),
        Err(err) => Err(err).context("Failed to read menu choice"),
    }
}

fn cached(region: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let region = resolve_region(region, &config);
    let cache = ResponseCache::new(FileStore::open(&Config::data_dir()?, PREFERENCE_NAME));

    let model = cache.load().map(|record| present(&record, region.as_deref()));
    TerminalRenderer::new().draw(model.as_ref());
    Ok(())
}

/// Flag, then config, then the process locale.
fn resolve_region(flag: Option<String>, config: &Config) -> Option<String> {
    flag.or_else(|| config.region.clone()).or_else(|| {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .and_then(|locale| region_from_locale(&locale))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use localweather_core::{
        DisplayModel, MemoryStore, Notice, Units, provider::openweather::parse_current,
    };

    const LONDON_JSON: &str = r#"{
        "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": 12.3, "temp_min": 10.5, "temp_max": 14.5, "humidity": 81},
        "wind": {"speed": 4.1, "deg": 230},
        "sys": {"country": "GB", "sunrise": 1700000000, "sunset": 1700030000},
        "name": "London"
    }"#;

    #[derive(Default)]
    struct Drawn(Vec<Option<DisplayModel>>);

    impl Renderer for Drawn {
        fn render(&mut self, model: Option<&DisplayModel>) {
            self.0.push(model.cloned());
        }

        fn notify(&mut self, _notice: &Notice) {}

        fn busy(&mut self, _busy: bool) {}
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_show() {
        let cli = Cli::try_parse_from(["localweather"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn show_accepts_negative_coordinates() {
        let cli =
            Cli::try_parse_from(["localweather", "show", "--lat", "-33.86", "--lon", "-151.2", "--once"])
                .unwrap();

        let Some(Command::Show(args)) = cli.command else { panic!("expected show") };
        assert_eq!(args.lat, Some(-33.86));
        assert_eq!(args.lon, Some(-151.2));
        assert!(args.once);
    }

    #[test]
    fn lat_requires_lon() {
        assert!(Cli::try_parse_from(["localweather", "show", "--lat", "10"]).is_err());
    }

    #[test]
    fn region_flag_beats_config() {
        let cfg = Config { region: Some("GB".into()), ..Config::default() };

        assert_eq!(resolve_region(Some("US".into()), &cfg).as_deref(), Some("US"));
        assert_eq!(resolve_region(None, &cfg).as_deref(), Some("GB"));
    }

    #[test]
    fn bad_config_still_draws_cached_record() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = ResponseCache::new(store.clone());
        cache.save(&parse_current(LONDON_JSON, Units::Metric).unwrap()).unwrap();

        let cfg = Config {
            api_key: Some("KEY".into()),
            units: Some("furlongs".into()),
            ..Config::default()
        };
        let Err(err) = collaborators(&cfg, false, false, store) else {
            panic!("unknown units must fail")
        };

        let mut renderer = Drawn::default();
        let err = fall_back_to_cache(&cache, Some("GB"), &mut renderer, err);

        assert!(err.to_string().contains("Unknown units"));
        assert_eq!(renderer.0.len(), 1);
        let Some(model) = &renderer.0[0] else { panic!("expected the cached panel") };
        assert_eq!(model.name, "London");
        assert_eq!(model.country, "GB");
    }

    #[test]
    fn bad_config_without_cache_draws_empty_state() {
        let cache = ResponseCache::new(MemoryStore::new());
        let mut renderer = Drawn::default();

        fall_back_to_cache(&cache, None, &mut renderer, anyhow::anyhow!("boom"));

        assert_eq!(renderer.0, vec![None]);
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["localweather", "-vv", "cached"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
