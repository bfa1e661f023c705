//! Host-based service names.

use std::fmt;

use crate::status::{MajorStatus, StatusCode};

/// A host-based service name: `service@host`, or a bare `service` meaning
/// "this service on whatever host the mechanism considers local".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName {
    service: String,
    host: Option<String>,
}

impl ServiceName {
    /// Parse `service@host` or `service`.
    ///
    /// Rejects empty components, embedded whitespace and more than one `@`
    /// with `BadName`.
    pub fn parse(name: &str) -> Result<Self, StatusCode> {
        let bad = || StatusCode::from(MajorStatus::BadName);

        if name.chars().any(char::is_whitespace) {
            return Err(bad());
        }

        let (service, host) = match name.split_once('@') {
            Some((service, host)) => {
                if host.is_empty() || host.contains('@') {
                    return Err(bad());
                }
                (service, Some(host.to_ascii_lowercase()))
            },
            None => (name, None),
        };

        if service.is_empty() {
            return Err(bad());
        }

        Ok(Self { service: service.to_string(), host })
    }

    /// Service component.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Host component, if given.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// True if `other` names this service. A name without a host matches the
    /// service on any host.
    pub fn matches(&self, other: &Self) -> bool {
        self.service == other.service && self.host().is_none_or(|host| other.host() == Some(host))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}@{host}", self.service),
            None => f.write_str(&self.service),
        }
    }
}
