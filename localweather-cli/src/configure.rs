use anyhow::{Context, Result, bail};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Select, Text};
use localweather_core::{Config, Coordinate, LocationSource, PermissionStatus, Units};

/// Interactive setup. Existing values are offered as defaults.
pub async fn run() -> Result<()> {
    let config = tokio::task::spawn_blocking(|| -> Result<Config> {
        let mut config = Config::load()?;
        prompt_all(&mut config)?;
        config.save()?;
        Ok(config)
    })
    .await
    .context("Configuration task failed")??;

    tracing::info!(source = ?config.location.source, "configuration saved");
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn prompt_all(config: &mut Config) -> Result<()> {
    let help = if config.api_key.is_some() { "leave blank to keep the current key" } else { "" };
    let key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(help)
        .prompt()?;
    if !key.trim().is_empty() {
        config.api_key = Some(key.trim().to_string());
    }
    if config.api_key.is_none() {
        bail!("An API key is required. Get one at https://openweathermap.org/api");
    }

    let units = Select::new("Units requested from the API:", Units::all().to_vec()).prompt()?;
    config.units = Some(units.as_str().to_string());

    let source = Select::new("Location source:", LocationSource::all().to_vec()).prompt()?;
    config.location.source = Some(source.as_str().to_string());

    if source == LocationSource::Fixed {
        let current = config.fixed_coordinate();
        let lat = prompt_degrees("Latitude:", current.map(|c| c.latitude), 90.0)?;
        let lon = prompt_degrees("Longitude:", current.map(|c| c.longitude), 180.0)?;
        config.set_fixed_coordinate(Coordinate::new(lat, lon));
    }

    config.location.enabled = Confirm::new("Enable location services?")
        .with_default(config.location.enabled)
        .prompt()?;

    let grant = Confirm::new("Allow localweather to use your location?")
        .with_default(config.location.permission != Some(PermissionStatus::PermanentlyDenied))
        .prompt()?;
    config.record_permission(if grant { PermissionStatus::Granted } else { PermissionStatus::Denied });

    let region = Text::new("Region code (blank to follow the system locale):")
        .with_default(config.region.as_deref().unwrap_or(""))
        .prompt()?;
    config.region = Some(region.trim().to_ascii_uppercase()).filter(|r| !r.is_empty());

    Ok(())
}

fn prompt_degrees(message: &str, current: Option<f64>, limit: f64) -> Result<f64> {
    let mut prompt = CustomType::<f64>::new(message)
        .with_error_message("Please type a number in decimal degrees");
    if let Some(value) = current {
        prompt = prompt.with_default(value);
    }

    let value = prompt.prompt()?;
    if !(-limit..=limit).contains(&value) {
        bail!("{message} {value} is outside -{limit}..={limit}");
    }
    Ok(value)
}
