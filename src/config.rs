// config.rs
use std::{path::PathBuf, time::Duration};

use anyhow::{Result, bail};
use clap::Parser;

use crate::guesser::DEFAULT_G2P_PROGRAM;

pub const DEFAULT_MODEL_ID: &str = "default";
pub const DEFAULT_DICTIONARY_ID: &str = "default";

/// Everything the service needs to start. Registration order matters:
/// dictionaries are merged and models consulted in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub models: Vec<(String, PathBuf)>,
    pub dictionaries: Vec<(String, PathBuf)>,
    /// Empty accepts every site.
    pub site_ids: Vec<String>,
    pub reload_interval: Option<Duration>,
    pub g2p_program: PathBuf,
    pub g2p_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            dictionaries: Vec::new(),
            site_ids: Vec::new(),
            reload_interval: None,
            g2p_program: PathBuf::from(DEFAULT_G2P_PROGRAM),
            g2p_timeout: None,
        }
    }
}

/// Adds or replaces (in place) an id -> path registration.
pub fn register(registry: &mut Vec<(String, PathBuf)>, id: String, path: PathBuf) {
    match registry.iter_mut().find(|(existing, _)| *existing == id) {
        Some(entry) => entry.1 = path,
        None => registry.push((id, path)),
    }
}

/// Parses `[ID=]PATH`. A bare path gets the id `default`.
fn parse_registration(value: &str) -> Result<(String, PathBuf), String> {
    let (id, path) = match value.split_once('=') {
        Some((id, path)) => (id, path),
        None => (DEFAULT_MODEL_ID, value),
    };
    if id.is_empty() || path.is_empty() {
        return Err(format!("expected [ID=]PATH, got {:?}", value));
    }
    Ok((id.to_string(), PathBuf::from(path)))
}

fn seconds(name: &str, value: Option<f64>) -> Result<Option<Duration>> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 => bail!("--{} must be a non-negative number", name),
        Some(v) if v == 0.0 => Ok(None),
        Some(v) => match Duration::try_from_secs_f64(v) {
            Ok(d) => Ok(Some(d)),
            Err(e) => bail!("--{} {}: {}", name, v, e),
        },
    }
}

#[derive(Parser, Debug)]
#[command(name = "g2p-hermes", about = "Hermes grapheme to phoneme service")]
pub struct CliArgs {
    /// Id and path to g2p FST model
    #[arg(long, required = true, value_name = "[ID=]PATH", value_parser = parse_registration)]
    pub model: Vec<(String, PathBuf)>,

    /// Id and path to phonetic dictionary
    #[arg(long, value_name = "[ID=]PATH", value_parser = parse_registration)]
    pub dictionary: Vec<(String, PathBuf)>,

    /// Poll dictionary file(s) every given number of seconds and reload when changed
    #[arg(long, value_name = "SECONDS")]
    pub reload: Option<f64>,

    /// Hermes siteId(s) to listen for (default: all)
    #[arg(long = "site-id", value_name = "ID")]
    pub site_id: Vec<String>,

    /// Program used to guess pronunciations
    #[arg(long, value_name = "PATH", default_value = DEFAULT_G2P_PROGRAM)]
    pub g2p_program: PathBuf,

    /// Give up on a single g2p invocation after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub g2p_timeout: Option<f64>,

    /// Print DEBUG messages to the console
    #[arg(long)]
    pub debug: bool,
}

impl CliArgs {
    pub fn into_config(self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig {
            reload_interval: seconds("reload", self.reload)?,
            g2p_timeout: seconds("g2p-timeout", self.g2p_timeout)?,
            site_ids: self.site_id,
            g2p_program: self.g2p_program,
            ..Default::default()
        };
        for (id, path) in self.model {
            register(&mut config.models, id, path);
        }
        for (id, path) in self.dictionary {
            register(&mut config.dictionaries, id, path);
        }
        Ok(config)
    }
}
