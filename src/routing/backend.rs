use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use http::Uri;

use crate::controllers::ControllerError;

const DEFAULT_BACKEND_SCHEME: &str = "http";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backend {
    address: Uri,
}

impl Backend {
    pub fn new(address: Uri) -> Self {
        Self { address }
    }

    /// Builds the address of an in-cluster backend from a backend reference name and optional port.
    pub fn from_reference(name: &str, port: Option<i32>) -> Result<Self, ControllerError> {
        let authority = match port {
            Some(port) if !(1..=i32::from(u16::MAX)).contains(&port) => {
                return Err(ControllerError::InvalidBackendAddress(format!("{name} port {port} out of range")));
            },
            Some(port) => format!("{name}:{port}"),
            None => name.to_owned(),
        };
        let address = format!("{DEFAULT_BACKEND_SCHEME}://{authority}")
            .parse::<Uri>()
            .map_err(|e| ControllerError::InvalidBackendAddress(format!("{authority} {e}")))?;
        if address.host().is_none() {
            return Err(ControllerError::InvalidBackendAddress(authority));
        }
        Ok(Self { address })
    }

    pub fn address(&self) -> &Uri {
        &self.address
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Round robin over a fixed, non-empty list of backends.
///
/// The list can be shared between selectors, the rotation counter never is.
#[derive(Debug)]
pub struct BackendSelector {
    backends: Arc<[Backend]>,
    counter: AtomicUsize,
}

impl BackendSelector {
    pub fn new(backends: Arc<[Backend]>) -> Option<Self> {
        if backends.is_empty() {
            return None;
        }
        Some(Self { backends, counter: AtomicUsize::new(0) })
    }

    /// Advances the rotation and returns the backend at the advanced position, so a fresh
    /// selector starts at its second backend.
    pub fn next(&self) -> &Backend {
        let current = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        &self.backends[current % self.backends.len()]
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }
}
