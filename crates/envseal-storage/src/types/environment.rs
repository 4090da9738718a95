//! The fixed set of deployment environments a workspace holds secrets for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Environment {
    #[serde(rename = "dev")]
    Development,
    #[serde(rename = "staging")]
    Staging,
    #[serde(rename = "prod")]
    Production,
    #[serde(rename = "test")]
    Testing,
}

#[derive(Debug, Error)]
#[error("unknown environment '{0}' (expected dev, staging, prod, or test)")]
pub struct ParseEnvironmentError(pub String);

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
        Environment::Testing,
    ];

    /// Short form used in storage, AAD labels, and integration matching.
    pub fn slug(self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Staging => "staging",
            Environment::Production => "prod",
            Environment::Testing => "test",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Environment::Development => "Development",
            Environment::Staging => "Staging",
            Environment::Production => "Production",
            Environment::Testing => "Testing",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Environment::ALL
            .into_iter()
            .find(|env| env.slug() == lower || env.display_name().to_ascii_lowercase() == lower)
            .ok_or_else(|| ParseEnvironmentError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slugs_and_display_names() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("Testing".parse::<Environment>().unwrap(), Environment::Testing);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("qa".parse::<Environment>().is_err());
        assert!("".parse::<Environment>().is_err());
    }

    #[test]
    fn slug_roundtrips_through_from_str() {
        for env in Environment::ALL {
            assert_eq!(env.slug().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn serde_uses_slug() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"prod\"");
        let back: Environment = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(back, Environment::Testing);
    }
}
