//! Terminal stand-ins for the platform seams of the core controller.

use async_trait::async_trait;
use localweather_core::{
    Config, DisplayModel, IconCategory, Notice, PermissionPrompt, PermissionStatus, Renderer,
    SettingsLauncher, SettingsTarget,
};

/// Permission decision kept in the config file.
///
/// Coordinates passed on the command line count as consent.
pub struct TerminalPermission {
    explicit: bool,
    interactive: bool,
}

impl TerminalPermission {
    pub fn new(explicit: bool, interactive: bool) -> Self {
        Self { explicit, interactive }
    }

    fn remember(status: PermissionStatus) {
        let saved = Config::load().and_then(|mut config| {
            config.record_permission(status);
            config.save()
        });
        if let Err(err) = saved {
            tracing::warn!(error = %err, "failed to store permission decision");
        }
    }
}

fn ask() -> Result<PermissionStatus, inquire::InquireError> {
    let allow = inquire::Confirm::new("Allow localweather to use your location?")
        .with_default(true)
        .prompt()?;
    if allow {
        return Ok(PermissionStatus::Granted);
    }

    let never = inquire::Confirm::new("Don't ask again?").with_default(false).prompt()?;
    Ok(if never { PermissionStatus::PermanentlyDenied } else { PermissionStatus::Denied })
}

#[async_trait]
impl PermissionPrompt for TerminalPermission {
    async fn check(&self) -> PermissionStatus {
        if self.explicit {
            return PermissionStatus::Granted;
        }

        match Config::load() {
            Ok(config) => config.location.permission.unwrap_or(PermissionStatus::Denied),
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored permission");
                PermissionStatus::Denied
            }
        }
    }

    async fn request(&self) -> PermissionStatus {
        if !self.interactive {
            tracing::info!("not a terminal, cannot prompt for location permission");
            return PermissionStatus::Denied;
        }

        let status = match tokio::task::spawn_blocking(ask).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "permission prompt dismissed");
                PermissionStatus::Denied
            }
            Err(err) => {
                tracing::warn!(error = %err, "permission prompt task failed");
                PermissionStatus::Denied
            }
        };

        if status != PermissionStatus::Denied {
            Self::remember(status);
        }
        status
    }
}

#[derive(Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: Option<&DisplayModel>) {
        match model {
            Some(model) => println!("{}", panel(model)),
            None => println!("No weather data yet. Refresh once you are online."),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, model: Option<&DisplayModel>) {
        self.draw(model);
    }

    fn notify(&mut self, notice: &Notice) {
        eprintln!("! {notice}");
    }

    fn busy(&mut self, busy: bool) {
        if busy {
            eprintln!("Fetching weather...");
        }
    }
}

fn glyph(icon: Option<IconCategory>) -> &'static str {
    match icon {
        Some(IconCategory::Sunny) => "☀",
        Some(IconCategory::Cloud) => "☁",
        Some(IconCategory::Rain) => "☂",
        Some(IconCategory::Storm) => "⚡",
        Some(IconCategory::Snow) => "❄",
        None => " ",
    }
}

fn panel(model: &DisplayModel) -> String {
    format!(
        "\n {icon}  {main}: {description}\n    {name}, {country}\n\n    \
         Temperature  {temp}  ({min} / {max})\n    \
         Humidity     {humidity}\n    \
         Wind         {wind}\n    \
         Sunrise      {sunrise}\n    \
         Sunset       {sunset}\n",
        icon = glyph(model.icon),
        main = model.main,
        description = model.description,
        name = model.name,
        country = model.country,
        temp = model.temperature,
        min = model.min,
        max = model.max,
        humidity = model.humidity,
        wind = model.wind_speed,
        sunrise = model.sunrise,
        sunset = model.sunset,
    )
}

/// Points the user at the config file, the terminal's settings screen.
pub struct TerminalSettings;

impl SettingsLauncher for TerminalSettings {
    fn open(&self, target: SettingsTarget) {
        let path = Config::config_file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "the config file".to_string());

        match target {
            SettingsTarget::LocationSource => eprintln!(
                "Hint: run `localweather configure`, pass --lat/--lon, \
                 or set [location] enabled = true in {path}."
            ),
            SettingsTarget::AppDetails => eprintln!(
                "Hint: run `localweather configure` to grant location access, \
                 or set [location] permission = \"granted\" in {path}."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localweather_core::TemperatureUnit;

    fn model() -> DisplayModel {
        DisplayModel {
            main: "Snow".into(),
            description: "light snow".into(),
            temperature: "-1.5°C".into(),
            humidity: "93 per cent".into(),
            sunrise: "07:41".into(),
            sunset: "16:02".into(),
            min: "-3° min".into(),
            max: "0° max".into(),
            wind_speed: "3.1 m/s".into(),
            name: "Oslo".into(),
            country: "NO".into(),
            icon: Some(IconCategory::Snow),
            unit: TemperatureUnit::Celsius,
        }
    }

    #[test]
    fn panel_lists_every_field() {
        let text = panel(&model());

        for expected in [
            "❄", "Snow: light snow", "Oslo, NO", "-1.5°C", "(-3° min / 0° max)", "93 per cent",
            "3.1 m/s", "07:41", "16:02",
        ] {
            assert!(text.contains(expected), "missing {expected} in {text}");
        }
    }

    #[test]
    fn unknown_icon_draws_blank() {
        assert_eq!(glyph(None), " ");
    }

    #[tokio::test]
    async fn explicit_coordinates_count_as_consent() {
        let permission = TerminalPermission::new(true, false);
        assert_eq!(permission.check().await, PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn non_interactive_request_is_denied_without_prompting() {
        let permission = TerminalPermission::new(false, false);
        assert_eq!(permission.request().await, PermissionStatus::Denied);
    }
}
