use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Process configuration, read once at startup. Not reloadable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Room identifier inbound events must address.
    pub room: String,
    /// Shared secret gating the control role and lock changes.
    pub party_key: String,
    /// Theme seeded for the configured room at startup, so a late joiner
    /// never receives an unset snapshot.
    pub default_theme: String,
    pub port: u16,
    /// Directory the static front-end pages are served from.
    pub public_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            room: "HALLOWEEN".to_string(),
            party_key: "changeme".to_string(),
            default_theme: "ghosts".to_string(),
            port: 8080,
            public_dir: PathBuf::from("public"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.room, "HALLOWEEN");
        assert_eq!(cfg.party_key, "changeme");
        assert_eq!(cfg.default_theme, "ghosts");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = Config {
            room: "NYE".into(),
            party_key: "s3cret".into(),
            default_theme: "confetti".into(),
            port: 9000,
            public_dir: PathBuf::from("/srv/public"),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.room, "NYE");
        assert_eq!(parsed.port, 9000);
    }
}
