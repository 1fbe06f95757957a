//! Command line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use admitter::router::DEFAULT_WEBHOOK_PATH;
use admitter::{MetadataMutator, WebhookRouterConfig};

/// How admitted objects are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolverMode {
    /// Any built-in Kubernetes kind, resolved from the payload
    Dynamic,
    /// Pods only; other kinds are denied
    StaticPod,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable lines
    Plain,
}

/// Admitter server - mutating admission webhook
#[derive(Parser, Debug, Clone)]
#[command(name = "admitter-server", version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "ADMITTER_LISTEN_ADDR", default_value = "0.0.0.0:8443")]
    pub listen_addr: SocketAddr,

    /// Route receiving AdmissionReview requests
    #[arg(
        long,
        env = "ADMITTER_WEBHOOK_PATH",
        default_value = DEFAULT_WEBHOOK_PATH,
        value_parser = parse_route
    )]
    pub webhook_path: String,

    /// Deadline for a single mutation, in milliseconds (0 disables it)
    #[arg(long, env = "ADMITTER_TIMEOUT_MS", default_value = "10000")]
    pub timeout_ms: u64,

    /// How objects are decoded
    #[arg(long, env = "ADMITTER_MODE", value_enum, default_value = "dynamic")]
    pub mode: ResolverMode,

    /// PEM certificate served over TLS
    #[arg(long, env = "ADMITTER_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key matching `--tls-cert`
    #[arg(long, env = "ADMITTER_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Label set on every admitted object (`key=value`, repeatable)
    #[arg(
        long = "label",
        env = "ADMITTER_LABELS",
        value_delimiter = ',',
        value_parser = parse_key_value
    )]
    pub labels: Vec<(String, String)>,

    /// Annotation set on every admitted object (`key=value`, repeatable)
    #[arg(
        long = "annotation",
        env = "ADMITTER_ANNOTATIONS",
        value_delimiter = ',',
        value_parser = parse_key_value
    )]
    pub annotations: Vec<(String, String)>,

    /// Log output format
    #[arg(long, env = "ADMITTER_LOG_FORMAT", value_enum, default_value = "json")]
    pub log_format: LogFormat,
}

impl Config {
    /// Mutation deadline, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// TLS certificate and key, when both are configured
    pub fn tls(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }

    /// Router settings derived from this configuration
    pub fn router_config(&self) -> WebhookRouterConfig {
        WebhookRouterConfig {
            path: self.webhook_path.clone(),
            timeout: self.timeout(),
        }
    }

    /// Mutator applying the configured labels and annotations
    pub fn metadata_mutator(&self) -> MetadataMutator {
        let mutator = self
            .labels
            .iter()
            .fold(MetadataMutator::new(), |m, (k, v)| m.label(k, v));
        self.annotations
            .iter()
            .fold(mutator, |m, (k, v)| m.annotation(k, v))
    }
}

/// Accept only absolute routes other than `/healthz`
pub fn parse_route(s: &str) -> Result<String, String> {
    if !s.starts_with('/') || s.len() < 2 {
        return Err(format!("webhook path must start with '/' and name a route, got '{s}'"));
    }
    if s == "/healthz" {
        return Err("webhook path cannot be /healthz".to_string());
    }
    Ok(s.to_string())
}

/// Parse `key=value`; the value may be empty, the key may not
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
