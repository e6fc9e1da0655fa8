//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, limits and log directives
//! - Check every route flow: header names/values, status codes, methods,
//!   proxy targets, non-empty choices
//! - Detect duplicate route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, on startup and on reload

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ConditionConfig, NodeConfig, ProxyConfig};
use crate::flow::builder::{compile_condition, header_name, header_value, parse_target, status};
use crate::flow::BuildError;

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("invalid log level '{0}'")]
    LogLevel(String),

    #[error("gateway.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("route name must not be empty")]
    EmptyRouteName,

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("route '{0}': path_prefix must start with '/'")]
    PathPrefix(String),

    #[error("route '{route}': invalid method '{method}'")]
    Method { route: String, method: String },

    #[error("route '{0}': flow is empty")]
    EmptyFlow(String),

    #[error("route '{route}': {source}")]
    Flow { route: String, source: BuildError },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateway.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.gateway.bind_address.clone()));
    }
    if config.gateway.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream_secs"));
    }

    let obs = &config.observability;
    if tracing_subscriber::EnvFilter::try_new(&obs.log_level).is_err() {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        if let Some(prefix) = &route.path_prefix {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::PathPrefix(route.name.clone()));
            }
        }

        for method in &route.methods {
            if method.parse::<axum::http::Method>().is_err() {
                errors.push(ValidationError::Method {
                    route: route.name.clone(),
                    method: method.clone(),
                });
            }
        }

        if route.flow.is_empty() {
            errors.push(ValidationError::EmptyFlow(route.name.clone()));
        }

        let mut flow_errors = Vec::new();
        check_nodes(&route.flow, &mut flow_errors);
        errors.extend(flow_errors.into_iter().map(|source| ValidationError::Flow {
            route: route.name.clone(),
            source,
        }));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_nodes(nodes: &[NodeConfig], errors: &mut Vec<BuildError>) {
    for node in nodes {
        check_node(node, errors);
    }
}

fn check_node(node: &NodeConfig, errors: &mut Vec<BuildError>) {
    match node {
        NodeConfig::Sequence(children)
        | NodeConfig::Request(children)
        | NodeConfig::Response(children)
        | NodeConfig::Abort(children) => check_nodes(children, errors),
        NodeConfig::If(cfg) => {
            check_condition(&cfg.test, errors);
            check_nodes(&cfg.flow, errors);
        }
        NodeConfig::Choose(cfg) => {
            if cfg.cases.is_empty() {
                errors.push(BuildError::EmptyChoice);
            }
            for case in &cfg.cases {
                check_condition(&case.test, errors);
                check_nodes(&case.flow, errors);
            }
            check_nodes(&cfg.otherwise, errors);
        }
        NodeConfig::Log(_) | NodeConfig::SetProperty(_) => {}
        NodeConfig::SetHeader(cfg) => {
            record(errors, header_name(&cfg.name).map(drop));
            record(errors, header_value(&cfg.name, &cfg.value).map(drop));
        }
        NodeConfig::RemoveHeader(cfg) => record(errors, header_name(&cfg.name).map(drop)),
        NodeConfig::Respond(cfg) => {
            record(errors, status(cfg.status).map(drop));
            for (name, value) in &cfg.headers {
                record(errors, header_name(name).map(drop));
                record(errors, header_value(name, value).map(drop));
            }
            if let Some(ct) = &cfg.content_type {
                record(errors, header_value("content-type", ct).map(drop));
            }
        }
        NodeConfig::Fail(cfg) => {
            if let Some(code) = cfg.status {
                record(errors, status(code).map(drop));
            }
        }
        NodeConfig::Proxy(cfg) => {
            record(errors, parse_target(&cfg.target).map(drop));
            if cfg.timeout_secs == Some(0) {
                errors.push(BuildError::Target {
                    target: cfg.target.clone(),
                    reason: "timeout_secs must be greater than zero".to_string(),
                });
            }
        }
    }
}

fn record(errors: &mut Vec<BuildError>, result: Result<(), BuildError>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

fn check_condition(cfg: &ConditionConfig, errors: &mut Vec<BuildError>) {
    if let Err(e) = compile_condition(cfg) {
        errors.push(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(name: &str, flow: &str) -> RouteConfig {
        #[derive(serde::Deserialize)]
        struct Doc {
            flow: Vec<NodeConfig>,
        }
        let doc: Doc = toml::from_str(&format!("flow = {}", flow)).unwrap();
        RouteConfig {
            name: name.to_string(),
            host: None,
            path_prefix: Some("/".to_string()),
            methods: Vec::new(),
            priority: 0,
            flow: doc.flow,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.gateway.bind_address = "not-an-address".into();
        config.timeouts.upstream_secs = 0;
        config.routes.push(route(
            "orders",
            r#"[ { set_header = { name = "bad name", value = "1" } }, { respond = { status = 42 } } ]"#,
        ));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("not-an-address".into()),
                ValidationError::ZeroTimeout("upstream_secs"),
                ValidationError::Flow {
                    route: "orders".into(),
                    source: BuildError::HeaderName("bad name".into()),
                },
                ValidationError::Flow {
                    route: "orders".into(),
                    source: BuildError::Status(42),
                },
            ]
        );
    }

    #[test]
    fn test_route_level_checks() {
        let mut config = ProxyConfig::default();
        let mut bad = route("api", "[ { log = {} } ]");
        bad.path_prefix = Some("api".into());
        bad.methods = vec!["G ET".into()];
        config.routes.push(bad);
        config.routes.push(route("api", "[]"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::PathPrefix("api".into())));
        assert!(errors.contains(&ValidationError::Method {
            route: "api".into(),
            method: "G ET".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateRoute("api".into())));
        assert!(errors.contains(&ValidationError::EmptyFlow("api".into())));
    }

    #[test]
    fn test_nested_flow_checks() {
        let mut config = ProxyConfig::default();
        config.routes.push(route(
            "nested",
            r#"[
                { abort = [ { if = { test = { status = 9999 }, flow = [] } } ] },
                { choose = { cases = [] } },
                { proxy = { target = "ftp://files" } },
            ]"#,
        ));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::Flow { .. })));
    }
}
