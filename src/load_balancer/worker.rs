//! Worker registry.
//!
//! # Responsibilities
//! - Hold the ordered, immutable list of worker base addresses
//! - Validate addresses once, at construction
//! - Compose forwarding targets (`http://{address}{uri}`)

use url::Url;

use crate::error::SetupError;

/// A single backend worker. Its index in the [`WorkerSet`] is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    /// Base address as configured, e.g. `127.0.0.1:3000` or `localhost:8080/app1/`.
    pub address: String,
}

impl Worker {
    /// Forwarding target for an already prefix-stripped URI.
    ///
    /// Plain concatenation: the address owns any path segment and the URI
    /// is appended verbatim.
    pub fn target(&self, uri: &str) -> String {
        format!("http://{}{}", self.address, uri)
    }
}

/// Ordered, non-empty set of workers.
#[derive(Debug, Clone)]
pub struct WorkerSet {
    workers: Vec<Worker>,
}

impl WorkerSet {
    /// Build a worker set, rejecting an empty list or unparsable addresses.
    pub fn new<I, S>(addresses: I) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut workers = Vec::new();
        for address in addresses {
            let address = address.into();
            validate_address(&address)?;
            workers.push(Worker { address });
        }

        if workers.is_empty() {
            return Err(SetupError::NoWorkers);
        }

        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the set has no workers. Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Worker> {
        self.workers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Worker> {
        self.workers.iter()
    }
}

fn validate_address(address: &str) -> Result<(), SetupError> {
    let invalid = |reason: String| SetupError::InvalidWorker {
        address: address.to_string(),
        reason,
    };

    if address.trim().is_empty() {
        return Err(invalid("address is empty".into()));
    }
    if address.contains("://") {
        return Err(invalid("address must not carry a scheme".into()));
    }

    let url = Url::parse(&format!("http://{}", address)).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("address has no host".into()));
    }
    Ok(())
}
