//! The two backend origins (local dev server vs hosted production) and URL joining.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Backend origin a request can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Local,
    Prod,
}

impl Origin {
    /// Literal stored in the session slot.
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Prod => "prod",
        }
    }

    /// Human-readable label, e.g. for a "connected to" badge.
    pub fn label(self) -> &'static str {
        match self {
            Origin::Local => "LOCAL",
            Origin::Prod => "PROD",
        }
    }

    pub fn other(self) -> Origin {
        match self {
            Origin::Local => Origin::Prod,
            Origin::Prod => Origin::Local,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Origin::Local),
            "prod" => Ok(Origin::Prod),
            other => Err(Error::Config(format!("unknown origin '{}'", other))),
        }
    }
}

/// Base URLs for both origins. Fixed for the life of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origins {
    local: String,
    prod: String,
}

impl Origins {
    pub fn new(local: impl Into<String>, prod: impl Into<String>) -> Self {
        Origins {
            local: local.into().trim().trim_end_matches('/').to_string(),
            prod: prod.into().trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, origin: Origin) -> &str {
        match origin {
            Origin::Local => &self.local,
            Origin::Prod => &self.prod,
        }
    }

    /// Joins `path` onto the origin's base with exactly one `/` between them.
    pub fn join(&self, origin: Origin, path: &str) -> String {
        join(self.url_for(origin), path)
    }
}

pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_normalizes_separators() {
        assert_eq!(join("http://h:5000/", "/decks"), "http://h:5000/decks");
        assert_eq!(join("http://h:5000", "decks"), "http://h:5000/decks");
        assert_eq!(join("http://h:5000///", "//decks/1"), "http://h:5000/decks/1");
    }

    #[test]
    fn origins_strip_trailing_slashes() {
        let o = Origins::new("http://127.0.0.1:5000/", "https://api.example.com//");
        assert_eq!(o.url_for(Origin::Local), "http://127.0.0.1:5000");
        assert_eq!(o.join(Origin::Prod, "/health"), "https://api.example.com/health");
    }

    #[test]
    fn origin_parses_and_labels() {
        assert_eq!("prod".parse::<Origin>().ok(), Some(Origin::Prod));
        assert_eq!(" LOCAL ".parse::<Origin>().ok(), Some(Origin::Local));
        assert!("staging".parse::<Origin>().is_err());
        assert_eq!(Origin::Local.label(), "LOCAL");
        assert_eq!(Origin::Prod.other(), Origin::Local);
    }
}
