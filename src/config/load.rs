use std::{env, path::PathBuf};

use super::schema::Settings;

impl Settings {
    /// Build the player settings from three layers, lowest first: the
    /// struct defaults (0.8 volume, 1.0x, 250 ms ticks, 180x120 previews),
    /// the TOML file from [`resolve_config_path`] if it exists, and
    /// `CADENZA__<SECTION>__<KEY>` variables such as
    /// `CADENZA__THUMBNAILS__WORKERS=4` or `CADENZA__PLAYBACK__SHUFFLE=true`.
    ///
    /// A missing file is not an error; a malformed one is, and the caller
    /// decides whether to fall back.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(
                ::config::File::from(path.as_path())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("CADENZA")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Reject values the player cannot run with. Out-of-range volume and
    /// rate are clamped later, so only non-numbers are refused here.
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.tick_ms == 0 {
            return Err("engine.tick_ms must be >= 1".to_string());
        }
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err("thumbnails.width and thumbnails.height must be >= 1".to_string());
        }
        if !self.playback.volume.is_finite() || !self.playback.rate.is_finite() {
            return Err("playback.volume and playback.rate must be finite numbers".to_string());
        }
        if self.controls.seek_step_secs <= 0.0 {
            return Err("controls.seek_step_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Render these settings as a TOML document (used by `--dump-config`).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Resolve the config path from `CADENZA_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("CADENZA_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/cadenza/config.toml`
/// or `~/.config/cadenza/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("cadenza").join("config.toml"))
}
