//! Source and destination addressing.
//!
//! ```text
//! fc://host:port/identifier       hub, plain connection
//! fc+ssl://host:port/identifier   hub over TLS
//! -                               standard input / output
//! anything else                   local path
//! ```

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::hub::Identifier;

pub const SCHEME_PLAIN: &str = "fc";
pub const SCHEME_SSL: &str = "fc+ssl";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid URL {input}: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("no hub address in {0}")]
    MissingHost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Hub {
        /// `host` or `host:port`
        address: String,
        ssl: bool,
        identifier: Option<Identifier>,
    },
    Std,
    Local(PathBuf),
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        if input == "-" {
            return Ok(Endpoint::Std);
        }
        if !input.contains("://") {
            return Ok(Endpoint::Local(PathBuf::from(input)));
        }

        let url = Url::parse(input).map_err(|e| EndpointError::InvalidUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        let ssl = match url.scheme() {
            SCHEME_PLAIN => false,
            SCHEME_SSL => true,
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(EndpointError::MissingHost(input.to_string())),
        };
        let address = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let path = url.path().trim_matches('/');
        let identifier = (!path.is_empty()).then(|| Identifier::parse(path));

        Ok(Endpoint::Hub {
            address,
            ssl,
            identifier,
        })
    }

    pub fn is_hub(&self) -> bool {
        matches!(self, Endpoint::Hub { .. })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Hub {
                address,
                ssl,
                identifier,
            } => {
                let scheme = if *ssl { SCHEME_SSL } else { SCHEME_PLAIN };
                write!(f, "{}://{}", scheme, address)?;
                if let Some(identifier) = identifier {
                    write!(f, "/{}", identifier)?;
                }
                Ok(())
            }
            Endpoint::Std => f.write_str("-"),
            Endpoint::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
