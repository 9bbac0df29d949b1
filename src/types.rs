// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RandomX memory mode used by the hash engines
///
/// The cache or dataset is built once per seed and shared by all workers;
/// each worker only adds its own VM.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomXMode {
    /// Cache only (~256MB), slower hashing
    ///
    /// Suited to background mining on devices with little memory.
    #[default]
    #[clap(name = "light")]
    Light,

    /// Full dataset (~2GB), several times faster
    #[clap(name = "fast")]
    Fast,
}

impl fmt::Display for RandomXMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RandomXMode::Light => write!(f, "light"),
            RandomXMode::Fast => write!(f, "fast"),
        }
    }
}

impl FromStr for RandomXMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(RandomXMode::Light),
            "fast" | "full" => Ok(RandomXMode::Fast),
            _ => Err(format!("Unknown RandomX mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_names() {
        assert_eq!("light".parse::<RandomXMode>().unwrap(), RandomXMode::Light);
        assert_eq!("FULL".parse::<RandomXMode>().unwrap(), RandomXMode::Fast);
        assert!("cryptonight".parse::<RandomXMode>().is_err());
        assert_eq!(RandomXMode::Fast.to_string(), "fast");
    }
}
