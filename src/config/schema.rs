//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//!
//! A route's `flow` is an array of node tables, each keyed by its kind:
//!
//! ```toml
//! [[routes]]
//! name = "orders"
//! path_prefix = "/orders"
//! flow = [
//!     { log = {} },
//!     { if = { test = { header = "x-debug" }, flow = [ { set_property = { name = "debug", value = true } } ] } },
//!     { abort = [ { set_header = { name = "x-recovered", value = "1", phases = "response" } } ] },
//!     { proxy = { target = "http://127.0.0.1:3000" } },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::flow::{Flow, FlowFilter};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener and transport settings.
    pub gateway: GatewayConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions, each with its interceptor flow.
    pub routes: Vec<RouteConfig>,
}

/// Listener and transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,

    /// Hide failure diagnostics from error responses.
    pub production: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            production: false,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one exchange, in seconds.
    pub request_secs: u64,

    /// Default timeout for upstream calls made by `proxy`, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Route configuration: which requests match and which flow they run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Methods to match; empty matches every method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Interceptor flow run for matching requests.
    #[serde(default)]
    pub flow: Vec<NodeConfig>,
}

/// One node of a configured flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeConfig {
    Sequence(Vec<NodeConfig>),
    /// Children run on the request pass only.
    Request(Vec<NodeConfig>),
    /// Children run on the response pass only.
    Response(Vec<NodeConfig>),
    #[serde(rename = "if")]
    If(ConditionalConfig),
    /// Abort recovery: children get a response pass when an abort unwinds here.
    Abort(Vec<NodeConfig>),
    Choose(ChooseConfig),
    Log(LogConfig),
    SetHeader(SetHeaderConfig),
    RemoveHeader(RemoveHeaderConfig),
    SetProperty(SetPropertyConfig),
    Respond(RespondConfig),
    Fail(FailConfig),
    Proxy(ProxyTargetConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionalConfig {
    pub test: ConditionConfig,
    #[serde(default)]
    pub flow: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChooseConfig {
    pub cases: Vec<CaseConfig>,
    #[serde(default)]
    pub otherwise: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseConfig {
    pub test: ConditionConfig,
    #[serde(default)]
    pub flow: Vec<NodeConfig>,
}

/// Condition expression as written in config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionConfig {
    Header(String),
    HeaderEquals { name: String, value: String },
    Method(String),
    PathPrefix(String),
    Property(String),
    PropertyEquals { name: String, value: Value },
    Status(u16),
    Flow(Flow),
    Not(Box<ConditionConfig>),
    All(Vec<ConditionConfig>),
    Any(Vec<ConditionConfig>),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogConfig {
    /// Prefix for log lines; defaults to the route name.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub phases: FlowFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetHeaderConfig {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub phases: FlowFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoveHeaderConfig {
    pub name: String,
    #[serde(default)]
    pub phases: FlowFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetPropertyConfig {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub phases: FlowFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RespondConfig {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FailConfig {
    /// Recorded as the failure reason.
    #[serde(default)]
    pub message: Option<String>,
    /// When set, a response with this status is produced before aborting.
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyTargetConfig {
    /// Upstream base URL (e.g., "http://127.0.0.1:3000").
    pub target: String,
    /// Overrides `timeouts.upstream_secs`.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_status() -> u16 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.upstream_secs, 10);
        assert!(config.routes.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Full);
    }

    #[test]
    fn test_parse_route_flow() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[routes]]
            name = "orders"
            path_prefix = "/orders"
            methods = ["GET", "POST"]
            priority = 5
            flow = [
                { log = {} },
                { request = [ { set_header = { name = "x-a", value = "1" } } ] },
                { if = { test = { header_equals = { name = "x-debug", value = "1" } }, flow = [ { fail = {} } ] } },
                { choose = { cases = [ { test = { method = "GET" }, flow = [ { respond = { body = "get" } } ] } ], otherwise = [ { respond = { status = 405 } } ] } },
                { abort = [ { set_property = { name = "recovered", value = true, phases = "response" } } ] },
                { proxy = { target = "http://127.0.0.1:3000", timeout_secs = 3 } },
            ]
            "#,
        )
        .unwrap();

        let route = &config.routes[0];
        assert_eq!(route.priority, 5);
        assert_eq!(route.methods, vec!["GET", "POST"]);
        assert_eq!(route.flow.len(), 6);
        assert!(matches!(route.flow[1], NodeConfig::Request(ref c) if c.len() == 1));
        assert!(matches!(route.flow[2], NodeConfig::If(_)));

        match &route.flow[3] {
            NodeConfig::Choose(choose) => {
                assert_eq!(choose.cases.len(), 1);
                assert!(matches!(choose.otherwise[0], NodeConfig::Respond(ref r) if r.status == 405));
            }
            other => panic!("unexpected node {:?}", other),
        }

        match &route.flow[4] {
            NodeConfig::Abort(children) => match &children[0] {
                NodeConfig::SetProperty(p) => {
                    assert_eq!(p.phases, FlowFilter::Response);
                    assert_eq!(p.value, Value::Bool(true));
                }
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_unknown_node_kind_is_rejected() {
        let result: Result<ProxyConfig, _> = toml::from_str(
            r#"
            [[routes]]
            name = "r"
            flow = [ { teleport = {} } ]
            "#,
        );
        assert!(result.is_err());
    }
}
