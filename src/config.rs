use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

/// Outbound timeout for every call the client app makes to the API.
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Client sessions idle for longer than this are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const DOCKER_API_URL: &str = "http://user-management-api:5000";
const LOCAL_API_URL: &str = "http://localhost:5002";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "pg" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub seed_admin: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            store: StoreBackend::Memory,
            database_url: None,
            seed_admin: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let store = match get("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.store,
        };
        let database_url = get("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }
        Ok(Self {
            host: get("APP_HOST").unwrap_or(defaults.host),
            port: parse_port(get("APP_PORT"), defaults.port)?,
            store,
            database_url,
            seed_admin: get("SEED_ADMIN").map(|v| parse_flag(&v)).unwrap_or(true),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("parse listen address")
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub api_url: String,
    pub request_timeout: Duration,
    pub session_idle_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let docker = get("DOCKER").map(|v| parse_flag(&v)).unwrap_or(false);
        Ok(Self {
            host: get("CLIENT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_port(get("CLIENT_PORT"), 8083)?,
            api_url: api_url_for(get("API_URL"), docker),
            request_timeout: API_TIMEOUT,
            session_idle_timeout: match get("SESSION_IDLE_MINUTES") {
                Some(v) => {
                    let minutes = v
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("invalid SESSION_IDLE_MINUTES: {v}"))?;
                    Duration::from_secs(minutes * 60)
                }
                None => SESSION_IDLE_TIMEOUT,
            },
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("parse listen address")
    }
}

/// An explicit `API_URL` wins; otherwise the docker service name or localhost.
pub fn api_url_for(explicit: Option<String>, docker: bool) -> String {
    match explicit.filter(|v| !v.trim().is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if docker => DOCKER_API_URL.to_string(),
        None => LOCAL_API_URL.to_string(),
    }
}

fn parse_port(raw: Option<String>, default: u16) -> anyhow::Result<u16> {
    match raw {
        Some(v) => v.parse::<u16>().with_context(|| format!("invalid port: {v}")),
        None => Ok(default),
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
