use crate::key::Algorithm;
use config::{Config, ConfigError};
use log::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "127.0.0.1";

pub trait Configurator {
    fn get_str(&self, key: &str) -> Result<String, ConfigError>;
    fn get_int(&self, key: &str) -> Result<i64, ConfigError>;
}

/// Loads the optional `config` file from the working directory, overridden
/// by `<PREFIX>_*` environment variables
pub fn new(prefix: &str) -> Result<impl Configurator, ConfigError> {
    let mut config = Config::default();
    config
        .merge(config::File::with_name("config").required(false))?
        .merge(config::Environment::with_prefix(prefix).separator("_"))?;
    Ok(config)
}

impl Configurator for Config {
    fn get_str(&self, key: &str) -> Result<String, ConfigError> {
        Config::get_str(self, key)
    }
    fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        Config::get_int(self, key)
    }
}

fn log_unless_missing(key: &str, e: ConfigError) {
    match e {
        // Not setting a key is fine
        ConfigError::NotFound(_) => (),
        _ => warn!("could not read '{}': {}", key, e),
    }
}

pub fn get_port<T: Configurator>(config: &T) -> u16 {
    match config.get_int("server.port") {
        Ok(port) => {
            if (1..65536).contains(&port) {
                port as u16
            } else {
                warn!(
                    "listen port value '{}' is not between 1 and 65535, defaulting to {}",
                    port, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        }
        Err(e) => {
            log_unless_missing("server.port", e);
            DEFAULT_PORT
        }
    }
}

pub fn get_host<T: Configurator>(config: &T) -> std::net::IpAddr {
    let default = std::net::IpAddr::from([127, 0, 0, 1]);
    match config.get_str("server.host") {
        Ok(host) => host.parse().unwrap_or_else(|e| {
            warn!(
                "listen host '{}' is not an IP address ({}), defaulting to {}",
                host, e, DEFAULT_HOST
            );
            default
        }),
        Err(e) => {
            log_unless_missing("server.host", e);
            default
        }
    }
}

pub fn get_default_algorithm<T: Configurator>(config: &T) -> Algorithm {
    match config.get_str("csr.algorithm") {
        Ok(name) => Algorithm::parse(&name).unwrap_or_else(|e| {
            warn!("{}, defaulting to {}", e, Algorithm::default());
            Algorithm::default()
        }),
        Err(e) => {
            log_unless_missing("csr.algorithm", e);
            Algorithm::default()
        }
    }
}
