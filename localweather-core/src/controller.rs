//! Orchestrates permission, location fix, fetch, cache and presentation.
//!
//! The controller runs one sequential flow per user action. Every transition
//! takes `&mut self`, so a refresh can never start while a fetch is still
//! outstanding.

use std::{fmt, sync::Arc};

use crate::{
    cache::{KeyValueStore, ResponseCache},
    error::{ControllerError, FetchError},
    location::{LocationProvider, PermissionPrompt, PermissionStatus},
    model::{Coordinate, WeatherRecord},
    network::Reachability,
    present::{DisplayModel, present},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Idle,
    AwaitingPermission,
    AwaitingLocation,
    Fetching,
    /// `None` is the empty state: nothing fetched and nothing cached.
    Displaying(Option<DisplayModel>),
    /// Terminal for this cycle. Behaves like `Idle` for the next refresh.
    Failed(ControllerError),
}

impl AppState {
    fn name(&self) -> &'static str {
        match self {
            AppState::Idle => "idle",
            AppState::AwaitingPermission => "awaiting_permission",
            AppState::AwaitingLocation => "awaiting_location",
            AppState::Fetching => "fetching",
            AppState::Displaying(_) => "displaying",
            AppState::Failed(_) => "failed",
        }
    }
}

/// Blocking messages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ProviderDisabled,
    PermissionRationale,
    PermissionPermanentlyDenied,
    NoConnection,
    LocationUnavailable(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ProviderDisabled => {
                f.write_str("Your location provider is turned off. Please turn it on.")
            }
            Notice::PermissionRationale => f.write_str(
                "It looks like you have turned off permissions required for this feature. \
                 It can be enabled under application settings.",
            ),
            Notice::PermissionPermanentlyDenied => f.write_str(
                "You have denied location permission. \
                 Please enable it as it is mandatory for the app to work.",
            ),
            Notice::NoConnection => f.write_str("No internet connection available."),
            Notice::LocationUnavailable(reason) => {
                write!(f, "Could not determine your location: {reason}")
            }
        }
    }
}

/// Which settings screen to send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTarget {
    LocationSource,
    AppDetails,
}

/// Draws the weather screen.
pub trait Renderer: Send {
    fn render(&mut self, model: Option<&DisplayModel>);
    fn notify(&mut self, notice: &Notice);
    /// Progress indicator around the network call.
    fn busy(&mut self, busy: bool);
}

pub trait SettingsLauncher: Send + Sync {
    fn open(&self, target: SettingsTarget);
}

/// Everything the controller talks to.
pub struct Collaborators {
    pub location: Box<dyn LocationProvider>,
    pub permission: Box<dyn PermissionPrompt>,
    pub network: Box<dyn Reachability>,
    pub weather: Box<dyn WeatherProvider>,
    pub store: Arc<dyn KeyValueStore>,
    pub renderer: Box<dyn Renderer>,
    pub settings: Box<dyn SettingsLauncher>,
}

pub struct AppController {
    location: Box<dyn LocationProvider>,
    permission: Box<dyn PermissionPrompt>,
    network: Box<dyn Reachability>,
    weather: Box<dyn WeatherProvider>,
    cache: ResponseCache<Arc<dyn KeyValueStore>>,
    renderer: Box<dyn Renderer>,
    settings: Box<dyn SettingsLauncher>,
    region: Option<String>,
    state: AppState,
    last_fix: Option<Coordinate>,
    /// Cached model drawn at launch, not yet replaced in this cycle.
    cached_on_screen: Option<DisplayModel>,
}

impl AppController {
    pub fn new(parts: Collaborators, region: Option<String>) -> Self {
        Self {
            location: parts.location,
            permission: parts.permission,
            network: parts.network,
            weather: parts.weather,
            cache: ResponseCache::new(parts.store),
            renderer: parts.renderer,
            settings: parts.settings,
            region,
            state: AppState::Idle,
            last_fix: None,
            cached_on_screen: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn last_fix(&self) -> Option<Coordinate> {
        self.last_fix
    }

    /// Show whatever is cached, then run the full chain.
    pub async fn launch(&mut self) -> &AppState {
        if let Some(record) = self.cache.load() {
            let model = present(&record, self.region.as_deref());
            self.renderer.render(Some(&model));
            self.cached_on_screen = Some(model);
        }

        self.acquire_and_fetch().await;
        &self.state
    }

    /// Re-fetch with the last fix, or run the full chain when there is none.
    pub async fn refresh(&mut self) -> &AppState {
        self.cached_on_screen = None;
        match self.last_fix {
            Some(fix) => self.fetch_and_display(fix).await,
            None => self.acquire_and_fetch().await,
        }
        &self.state
    }

    async fn acquire_and_fetch(&mut self) {
        if !self.location.is_enabled().await {
            self.notify(Notice::ProviderDisabled);
            self.settings.open(SettingsTarget::LocationSource);
            self.fail(ControllerError::ProviderDisabled);
            return;
        }

        self.transition(AppState::AwaitingPermission);
        match self.ensure_permission().await {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                self.deny(false);
                return;
            }
            PermissionStatus::PermanentlyDenied => {
                self.deny(true);
                return;
            }
        }

        self.transition(AppState::AwaitingLocation);
        match self.location.current_fix().await {
            Ok(fix) => {
                tracing::info!(latitude = fix.latitude, longitude = fix.longitude, "location fix obtained");
                self.last_fix = Some(fix);
                self.fetch_and_display(fix).await;
            }
            Err(err) => match ControllerError::from(err) {
                ControllerError::ProviderDisabled => {
                    self.notify(Notice::ProviderDisabled);
                    self.settings.open(SettingsTarget::LocationSource);
                    self.fail(ControllerError::ProviderDisabled);
                }
                ControllerError::PermissionDenied { permanent } => self.deny(permanent),
                ControllerError::Location(inner) => {
                    self.notify(Notice::LocationUnavailable(inner.to_string()));
                    self.fail(ControllerError::Location(inner));
                }
            },
        }
    }

    /// Both kinds of denial point at app settings; only a temporary one explains why.
    fn deny(&mut self, permanent: bool) {
        let notice = if permanent {
            Notice::PermissionPermanentlyDenied
        } else {
            Notice::PermissionRationale
        };
        self.notify(notice);
        self.settings.open(SettingsTarget::AppDetails);
        self.fail(ControllerError::PermissionDenied { permanent });
    }

    async fn ensure_permission(&self) -> PermissionStatus {
        match self.permission.check().await {
            PermissionStatus::Denied => self.permission.request().await,
            status => status,
        }
    }

    async fn fetch_and_display(&mut self, fix: Coordinate) {
        self.transition(AppState::Fetching);

        let result = if self.network.is_network_available().await {
            self.renderer.busy(true);
            let result = self.weather.fetch(fix).await;
            self.renderer.busy(false);
            result
        } else {
            Err(FetchError::NoConnection)
        };

        match result {
            Ok(record) => {
                if let Err(err) = self.cache.save(&record) {
                    tracing::warn!(error = %err, "failed to cache weather record");
                }
                self.display(Some(&record), false);
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "weather fetch failed, showing cached data");
                if matches!(err, FetchError::NoConnection) {
                    self.notify(Notice::NoConnection);
                }
                let cached = self.cache.load();
                self.display(cached.as_ref(), true);
            }
        }
    }

    fn display(&mut self, record: Option<&WeatherRecord>, from_cache: bool) {
        let model = record.map(|r| present(r, self.region.as_deref()));
        let already_drawn =
            from_cache && model.is_some() && self.cached_on_screen.as_ref() == model.as_ref();
        if !already_drawn {
            self.renderer.render(model.as_ref());
        }
        self.cached_on_screen = None;
        self.transition(AppState::Displaying(model));
    }

    fn notify(&mut self, notice: Notice) {
        self.renderer.notify(&notice);
    }

    fn fail(&mut self, err: ControllerError) {
        tracing::warn!(error = %err, "weather cycle stopped");
        self.transition(AppState::Failed(err));
    }

    fn transition(&mut self, next: AppState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "state transition");
        self.state = next;
    }
}
