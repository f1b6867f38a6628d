use std::{collections::BTreeSet, sync::Arc};

use gateway_api::apis::standard::httproutes::{HTTPRoute, HTTPRouteRulesMatches as RouteMatch, HTTPRouteRulesMatchesPathType as HttpRouteRulesMatchesPathType};
use tracing::{debug, warn};

use super::{
    backend::{Backend, BackendSelector},
    table::{MatchKind, Route, RoutingTable},
};
use crate::{common::LogContext, controllers::ControllerError};

const DEFAULT_MATCH_PATH: &str = "/";

/// Turns the rules of one `HTTPRoute` into routing table entries.
pub struct RouteBuilder<'a> {
    controller_name: &'a str,
}

impl<'a> RouteBuilder<'a> {
    pub fn new(controller_name: &'a str) -> Self {
        Self { controller_name }
    }

    /// Appends one route per match of every rule with backends, in declaration order.
    /// Returns the number of routes added.
    pub fn append(&self, table: &mut RoutingTable, http_route: &HTTPRoute) -> usize {
        let log_context = LogContext::new(self.controller_name, http_route);
        let hostnames: BTreeSet<String> = http_route.spec.hostnames.iter().flatten().cloned().collect();
        let before = table.len();

        for (index, rule) in http_route.spec.rules.iter().flatten().enumerate() {
            let backend_refs = rule.backend_refs.as_deref().unwrap_or_default();
            if backend_refs.is_empty() {
                debug!("{log_context} rule {index} has no backends, ignoring");
                continue;
            }

            let backends = match backend_refs.iter().map(|b| Backend::from_reference(&b.name, b.port)).collect::<Result<Vec<_>, _>>() {
                Ok(backends) => Arc::<[Backend]>::from(backends),
                Err(e) => {
                    warn!("{log_context} rule {index} skipped {e}");
                    continue;
                },
            };

            let route_matches: Vec<Option<&RouteMatch>> = match rule.matches.as_deref() {
                Some(matches) if !matches.is_empty() => matches.iter().map(Some).collect(),
                _ => vec![None],
            };

            for route_match in route_matches {
                let (kind, path) = match Self::match_predicate(route_match) {
                    Ok(predicate) => predicate,
                    Err(e) => {
                        warn!("{log_context} rule {index} match skipped {e}");
                        continue;
                    },
                };
                let Some(selector) = BackendSelector::new(Arc::clone(&backends)) else {
                    continue;
                };
                debug!("{log_context} rule {index} {kind} {path} -> {} backends", backends.len());
                table.push(Route::new(hostnames.clone(), kind, path, selector));
            }
        }

        table.len() - before
    }

    /// Only path conditions can be routed on; a match narrowed by headers, query parameters or
    /// method is refused rather than widened to its path alone.
    fn match_predicate(route_match: Option<&RouteMatch>) -> Result<(MatchKind, String), ControllerError> {
        let Some(route_match) = route_match else {
            return Ok((MatchKind::PathPrefix, DEFAULT_MATCH_PATH.to_owned()));
        };
        if route_match.headers.as_ref().is_some_and(|headers| !headers.is_empty()) {
            return Err(ControllerError::UnsupportedMatch("headers".to_owned()));
        }
        if route_match.query_params.as_ref().is_some_and(|query_params| !query_params.is_empty()) {
            return Err(ControllerError::UnsupportedMatch("queryParams".to_owned()));
        }
        if route_match.method.is_some() {
            return Err(ControllerError::UnsupportedMatch("method".to_owned()));
        }

        let Some(path_match) = route_match.path.as_ref() else {
            return Ok((MatchKind::PathPrefix, DEFAULT_MATCH_PATH.to_owned()));
        };
        let kind = match &path_match.r#type {
            Some(HttpRouteRulesMatchesPathType::Exact) => MatchKind::Exact,
            Some(HttpRouteRulesMatchesPathType::PathPrefix) | None => MatchKind::PathPrefix,
            Some(HttpRouteRulesMatchesPathType::RegularExpression) => {
                return Err(ControllerError::UnsupportedMatch("RegularExpression".to_owned()));
            },
        };
        let path = path_match.value.clone().unwrap_or(DEFAULT_MATCH_PATH.to_owned());
        Ok((kind, path))
    }
}
