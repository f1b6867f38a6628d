use std::{fmt::Display, net::SocketAddr, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{controllers::DEFAULT_DEBOUNCE_WINDOW, Result};

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct Address {
    pub hostname: String,
    pub port: u16,
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

impl Address {
    pub fn to_ip(&self) -> Result<SocketAddr> {
        self.to_string().parse::<SocketAddr>().map_err(std::convert::Into::into)
    }
}

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct AdminInterfaceConfiguration {
    pub address: Address,
}

/// Which resources the controller lists and watches. Defaults to every namespace and every label.
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct WatchConfiguration {
    #[builder(default)]
    #[serde(default)]
    pub namespace: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub label_selector: Option<String>,
    #[builder(default = true)]
    #[serde(default = "default_watch_services")]
    pub services: bool,
}

fn default_watch_services() -> bool {
    true
}

impl Default for WatchConfiguration {
    fn default() -> Self {
        Self { namespace: None, label_selector: None, services: default_watch_services() }
    }
}

#[derive(Debug, TypedBuilder, Deserialize)]
pub struct Configuration {
    pub controller_name: String,
    #[builder(default)]
    pub enable_open_telemetry: Option<bool>,
    #[builder(default)]
    pub debounce_window_millis: Option<u64>,
    #[builder(default)]
    #[serde(default)]
    pub watch: WatchConfiguration,
    #[builder(default)]
    pub admin_interface: Option<AdminInterfaceConfiguration>,
}

#[derive(Error, Debug)]
enum ConfigurationError {
    #[error("controller name must be not empty")]
    ControllerName,
    #[error("debounce window must be greater than zero")]
    DebounceWindow,
    #[error("{0} must be not empty when set")]
    EmptySelector(&'static str),
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        if self.controller_name.is_empty() {
            return Err(ConfigurationError::ControllerName.into());
        }
        if self.debounce_window_millis == Some(0) {
            return Err(ConfigurationError::DebounceWindow.into());
        }
        if self.watch.namespace.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigurationError::EmptySelector("watch namespace").into());
        }
        if self.watch.label_selector.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigurationError::EmptySelector("watch label selector").into());
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window_millis.map_or(DEFAULT_DEBOUNCE_WINDOW, Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Address, Configuration};

    #[test]
    fn test_minimal_configuration_defaults() {
        let configuration: Configuration = serde_yaml::from_str("controller_name: faros.io/gateway-controller\n").unwrap();
        configuration.validate().unwrap();
        assert_eq!(configuration.debounce_window(), Duration::from_secs(1));
        assert!(configuration.watch.namespace.is_none());
        assert!(configuration.watch.label_selector.is_none());
        assert!(configuration.watch.services);
        assert!(configuration.admin_interface.is_none());
    }

    #[test]
    fn test_full_configuration() {
        let configuration: Configuration = serde_yaml::from_str(
            r"
controller_name: faros.io/gateway-controller
enable_open_telemetry: false
debounce_window_millis: 250
watch:
  namespace: edge
  label_selector: app=faros
  services: false
admin_interface:
  address:
    hostname: 127.0.0.1
    port: 9090
",
        )
        .unwrap();
        configuration.validate().unwrap();
        assert_eq!(configuration.debounce_window(), Duration::from_millis(250));
        assert_eq!(configuration.watch.namespace.as_deref(), Some("edge"));
        assert_eq!(configuration.watch.label_selector.as_deref(), Some("app=faros"));
        assert!(!configuration.watch.services);
        let admin = configuration.admin_interface.unwrap();
        assert_eq!(admin.address.to_ip().unwrap().port(), 9090);
    }

    #[test]
    fn test_validation_failures() {
        let empty_name = Configuration::builder().controller_name(String::new()).build();
        assert!(empty_name.validate().is_err());

        let zero_window = Configuration::builder().controller_name("faros".to_owned()).debounce_window_millis(Some(0)).build();
        assert!(zero_window.validate().is_err());

        let empty_selector: Configuration =
            serde_yaml::from_str("controller_name: faros\nwatch:\n  label_selector: ''\n").unwrap();
        assert!(empty_selector.validate().is_err());
    }

    #[test]
    fn test_address_requires_ip() {
        let address = Address::builder().hostname("0.0.0.0".to_owned()).port(8080).build();
        assert_eq!(address.to_string(), "0.0.0.0:8080");
        assert!(address.to_ip().is_ok());
        assert!(Address::builder().hostname("localhost".to_owned()).port(8080).build().to_ip().is_err());
    }
}
