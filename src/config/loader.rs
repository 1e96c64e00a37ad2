use std::path::Path;

use clap::{Arg, Command};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};

use super::{Config, ConfigError, ConfigRaw};

pub(crate) fn initialize_configuration() -> Config {
    load_configuration().expect("Failed to load configuration")
}

/// Layered sources, lowest to highest priority: `config.toml`, `MTP_`
/// environment variables, then an optional `-c` override file.
fn load_configuration() -> Result<Config, ConfigError> {
    let matches = Command::new("mytonprovider-node")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (.toml format)"),
        )
        .get_matches();

    let custom_config_path = matches.get_one::<String>("config").map(String::as_str);

    let default_path = "config.toml";
    if custom_config_path.is_none() && !Path::new(default_path).exists() {
        return Err(ConfigError::MissingConfig(default_path.to_string()));
    }

    let mut figment = Figment::new().merge(Toml::file(default_path));

    figment = figment.merge(Env::prefixed("MTP_").split("__"));

    if let Some(config_path) = custom_config_path {
        tracing::info!("Loading custom config file: {}", config_path);
        figment = figment.merge(Toml::file(config_path));
    }

    let raw: ConfigRaw = figment.extract().map_err(Box::new)?;

    raw.resolve()
}
