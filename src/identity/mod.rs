use crate::error::IdentityError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::OnceLock;

/// Resolves the name this agent answers to and its network address.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Addressable name of this agent (compared case-insensitively).
    fn hostname(&self) -> Result<String, IdentityError>;

    /// Resolve a host name to a printable IP address.
    async fn resolve_address(&self, hostname: &str) -> Result<String, IdentityError>;

    /// Address reported by `/list`.
    async fn local_address(&self) -> Result<String, IdentityError> {
        let hostname = self.hostname()?;
        self.resolve_address(&hostname).await
    }
}

/// Identity backed by the OS hostname, optionally overridden by config.
///
/// The OS hostname is read once and cached for the life of the process.
#[derive(Debug, Default)]
pub struct SystemIdentity {
    name_override: Option<String>,
    os_hostname: OnceLock<String>,
}

impl SystemIdentity {
    pub fn new(name_override: Option<String>) -> Self {
        Self {
            name_override: name_override
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            os_hostname: OnceLock::new(),
        }
    }

    fn os_hostname(&self) -> Result<String, IdentityError> {
        if let Some(cached) = self.os_hostname.get() {
            return Ok(cached.clone());
        }

        let raw = hostname::get().map_err(IdentityError::Hostname)?;
        let name = raw
            .into_string()
            .map_err(|_| IdentityError::NonUtf8Hostname)?;
        tracing::debug!("Hostname retrieved: {name}");

        Ok(self.os_hostname.get_or_init(|| name).clone())
    }
}

#[async_trait]
impl IdentityProvider for SystemIdentity {
    fn hostname(&self) -> Result<String, IdentityError> {
        match &self.name_override {
            Some(name) => Ok(name.clone()),
            None => self.os_hostname(),
        }
    }

    async fn resolve_address(&self, hostname: &str) -> Result<String, IdentityError> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|source| IdentityError::Resolve {
                host: hostname.to_string(),
                source,
            })?
            .map(|addr| addr.ip())
            .collect();

        pick_address(&addrs)
            .map(|ip| ip.to_string())
            .ok_or_else(|| IdentityError::NoAddress(hostname.to_string()))
    }

    async fn local_address(&self) -> Result<String, IdentityError> {
        // An overridden name is not necessarily resolvable; the machine's own is.
        let hostname = self.os_hostname()?;
        self.resolve_address(&hostname).await
    }
}

/// Prefer IPv4, matching what operators expect from a single "IP Address" line.
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
