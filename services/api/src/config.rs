//! Application configuration from environment variables

use std::env;

use crate::builder::DogsDefault;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IANA name of the zone all wall-clock times are interpreted in.
    /// A deployment parameter, not a per-user setting.
    pub timezone: String,
    /// Policy when a submission omits the dogs field entirely
    pub dogs_default: DogsDefault,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Whether to insert the demo household on startup
    pub seed_demo: bool,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DOGTRACK_TIMEZONE`: local zone name (default: "America/Los_Angeles")
    /// - `DOGTRACK_DOGS_DEFAULT`: "all" or "none" (default: "all")
    /// - `DOGTRACK_BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    /// - `DOGTRACK_SEED_DEMO`: "1" to seed demo data (default: off)
    pub fn from_env() -> Result<Self, String> {
        let timezone = env::var("DOGTRACK_TIMEZONE")
            .unwrap_or_else(|_| "America/Los_Angeles".to_string());

        let dogs_default = match env::var("DOGTRACK_DOGS_DEFAULT") {
            Ok(value) => parse_dogs_default(&value)?,
            Err(_) => DogsDefault::All,
        };

        let bind_addr =
            env::var("DOGTRACK_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let seed_demo = env::var("DOGTRACK_SEED_DEMO")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            timezone,
            dogs_default,
            bind_addr,
            seed_demo,
        })
    }
}

fn parse_dogs_default(value: &str) -> Result<DogsDefault, String> {
    match value.to_ascii_lowercase().as_str() {
        "all" => Ok(DogsDefault::All),
        "none" => Ok(DogsDefault::None),
        other => Err(format!(
            "DOGTRACK_DOGS_DEFAULT must be \"all\" or \"none\", got \"{}\"",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dogs_default() {
        assert_eq!(parse_dogs_default("all"), Ok(DogsDefault::All));
        assert_eq!(parse_dogs_default("NONE"), Ok(DogsDefault::None));
        assert!(parse_dogs_default("some").is_err());
    }
}
