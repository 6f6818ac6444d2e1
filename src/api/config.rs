use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderName, HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use super::cli::ServeArgs;

const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen host {0:?}")]
    InvalidHost(String),
    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
    #[error("invalid CORS method {0:?}")]
    InvalidMethod(String),
    #[error("invalid CORS header {0:?}")]
    InvalidHeader(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cors: CorsConfig,
    pub cors_layer: CorsLayer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl TryFrom<ServeArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let host = args
            .host
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(args.host.clone()))?;
        let cors = CorsConfig {
            allow_origins: parse_list(&args.cors_allow_origins),
            allow_methods: parse_list(&args.cors_allow_methods),
            allow_headers: parse_list(&args.cors_allow_headers),
        };
        let cors_layer = cors.layer()?;

        Ok(ServerConfig {
            addr: SocketAddr::new(host, args.port),
            cors,
            cors_layer,
        })
    }
}

impl CorsConfig {
    pub fn layer(&self) -> Result<CorsLayer, ConfigError> {
        Ok(CorsLayer::new()
            .allow_origin(self.allow_origin()?)
            .allow_methods(self.allow_methods()?)
            .allow_headers(self.allow_headers()?))
    }

    fn allow_origin(&self) -> Result<AllowOrigin, ConfigError> {
        if is_wildcard(&self.allow_origins) {
            return Ok(AllowOrigin::any());
        }
        let origins = self
            .allow_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllowOrigin::list(origins))
    }

    fn allow_methods(&self) -> Result<AllowMethods, ConfigError> {
        if is_wildcard(&self.allow_methods) {
            return Ok(AllowMethods::any());
        }
        let methods = self
            .allow_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|_| ConfigError::InvalidMethod(method.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllowMethods::list(methods))
    }

    fn allow_headers(&self) -> Result<AllowHeaders, ConfigError> {
        if is_wildcard(&self.allow_headers) {
            return Ok(AllowHeaders::any());
        }
        let headers = self
            .allow_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::InvalidHeader(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllowHeaders::list(headers))
    }
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|value| value == WILDCARD)
}
