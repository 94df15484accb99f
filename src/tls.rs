use std::path::{Path, PathBuf};

use reqwest::{Certificate, ClientBuilder as ReqwestBuilder, Identity};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Minimum TLS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl TlsVersion {
    fn to_reqwest(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::Tls12 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls13 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

fn default_reject_unauthorized() -> bool {
    true
}

/// TLS options passed through to the encrypted transport
///
/// Only used when the base URL is `https`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsOptions {
    /// Extra PEM root certificates
    #[serde(default)]
    pub ca: Vec<PathBuf>,
    /// PEM file holding the client certificate chain and private key
    #[serde(default)]
    pub identity: Option<PathBuf>,
    /// Verify the server certificate
    #[serde(default = "default_reject_unauthorized")]
    pub reject_unauthorized: bool,
    /// Minimum protocol version
    #[serde(default)]
    pub min_version: Option<TlsVersion>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            ca: Vec::new(),
            identity: None,
            reject_unauthorized: true,
            min_version: None,
        }
    }
}

impl TlsOptions {
    /// Create default TLS options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root certificate file
    pub fn add_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca.push(path.into());
        self
    }

    /// Set the client identity file
    pub fn identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(path.into());
        self
    }

    /// Enable or disable server certificate verification
    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = reject;
        self
    }

    /// Set the minimum protocol version
    pub fn min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Apply these options to a reqwest client builder
    pub fn apply_to_builder(&self, mut builder: ReqwestBuilder) -> Result<ReqwestBuilder> {
        builder = builder.use_rustls_tls();

        for path in &self.ca {
            let cert = Certificate::from_pem(&read_pem(path)?)
                .map_err(|e| Error::validation(format!("invalid ca certificate {}: {}", path.display(), e)))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(path) = &self.identity {
            let identity = Identity::from_pem(&read_pem(path)?)
                .map_err(|e| Error::validation(format!("invalid identity {}: {}", path.display(), e)))?;
            builder = builder.identity(identity);
        }

        if let Some(version) = self.min_version {
            builder = builder.min_tls_version(version.to_reqwest());
        }

        if !self.reject_unauthorized {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::validation(format!("cannot read {}: {}", path.display(), e)))
}
