use crate::config::EngineConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration by layering TOML, environment variables,
    /// and an optional JSON overlay on top of the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file("config/Confluence.toml"))
            .merge(Env::prefixed("CONFLUENCE_").split("__"))
            .join(Json::file("config/Confluence.json"))
            .extract()?;

        Ok(config)
    }

    /// Loads engine configuration with a specific profile overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file("config/Confluence.toml"))
            .merge(Toml::file(format!("config/Confluence.{profile}.toml")))
            .merge(Env::prefixed("CONFLUENCE_").split("__"))
            .join(Json::file("config/Confluence.json"))
            .extract()?;

        Ok(config)
    }
}
