//! Builds flow trees from route configuration.
//!
//! # Responsibilities
//! - Map each `NodeConfig` onto its `Node` variant
//! - Instantiate built-in interceptors with pre-parsed headers/status codes
//! - Compile condition configs into `Expression`s
//!
//! # Design Decisions
//! - A route's top-level `flow` array becomes one root `Sequence`
//! - All interceptors of all routes share one upstream client
//! - Any invalid value fails the whole build; validation reports the same
//!   problems earlier with all errors collected

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::{ConditionConfig, NodeConfig, TimeoutConfig};
use crate::flow::{Case, Expression, Node};
use crate::interceptors::proxy::UpstreamClient;
use crate::interceptors::{
    Fail, LogInterceptor, ProxyInterceptor, RemoveHeader, Respond, SetHeader, SetProperty,
};

/// Errors raised while turning configuration into a flow tree.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("invalid header name '{0}'")]
    HeaderName(String),

    #[error("invalid value for header '{0}'")]
    HeaderValue(String),

    #[error("invalid status code {0}")]
    Status(u16),

    #[error("invalid method '{0}'")]
    Method(String),

    #[error("invalid proxy target '{target}': {reason}")]
    Target { target: String, reason: String },

    #[error("choose without any case")]
    EmptyChoice,
}

/// Turns `NodeConfig`s into `Node`s.
#[derive(Clone)]
pub struct FlowBuilder {
    client: UpstreamClient,
    upstream_timeout: Duration,
}

impl FlowBuilder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self::with_client(client, timeouts)
    }

    pub fn with_client(client: UpstreamClient, timeouts: &TimeoutConfig) -> Self {
        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Build the root node of a route.
    pub fn build_route(&self, route: &str, flow: &[NodeConfig]) -> Result<Node, BuildError> {
        Ok(Node::Sequence(self.build_all(route, flow)?))
    }

    fn build_all(&self, route: &str, nodes: &[NodeConfig]) -> Result<Vec<Node>, BuildError> {
        nodes.iter().map(|n| self.build(route, n)).collect()
    }

    fn build(&self, route: &str, node: &NodeConfig) -> Result<Node, BuildError> {
        let node = match node {
            NodeConfig::Sequence(children) => Node::sequence(self.build_all(route, children)?),
            NodeConfig::Request(children) => Node::request_only(self.build_all(route, children)?),
            NodeConfig::Response(children) => {
                Node::response_only(self.build_all(route, children)?)
            }
            NodeConfig::If(cfg) => Node::conditional(
                compile_condition(&cfg.test)?,
                self.build_all(route, &cfg.flow)?,
            ),
            NodeConfig::Abort(children) => Node::abort_recovery(self.build_all(route, children)?),
            NodeConfig::Choose(cfg) => {
                if cfg.cases.is_empty() {
                    return Err(BuildError::EmptyChoice);
                }
                let cases = cfg
                    .cases
                    .iter()
                    .map(|c| {
                        Ok(Case::new(
                            compile_condition(&c.test)?,
                            self.build_all(route, &c.flow)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, BuildError>>()?;
                Node::choice(cases, self.build_all(route, &cfg.otherwise)?)
            }
            NodeConfig::Log(cfg) => {
                let label = cfg.label.clone().unwrap_or_else(|| route.to_string());
                Node::leaf_with(LogInterceptor::new(label), cfg.phases)
            }
            NodeConfig::SetHeader(cfg) => Node::leaf_with(
                SetHeader::new(header_name(&cfg.name)?, header_value(&cfg.name, &cfg.value)?),
                cfg.phases,
            ),
            NodeConfig::RemoveHeader(cfg) => {
                Node::leaf_with(RemoveHeader::new(header_name(&cfg.name)?), cfg.phases)
            }
            NodeConfig::SetProperty(cfg) => {
                Node::leaf_with(SetProperty::new(cfg.name.clone(), cfg.value.clone()), cfg.phases)
            }
            NodeConfig::Respond(cfg) => {
                let mut headers = HeaderMap::new();
                for (name, value) in &cfg.headers {
                    headers.insert(header_name(name)?, header_value(name, value)?);
                }
                let mut respond =
                    Respond::new(status(cfg.status)?, cfg.body.clone()).with_headers(headers);
                if let Some(ct) = &cfg.content_type {
                    respond = respond.with_content_type(header_value("content-type", ct)?);
                }
                Node::leaf(respond)
            }
            NodeConfig::Fail(cfg) => {
                let status = cfg.status.map(status).transpose()?;
                Node::leaf(Fail::new(cfg.message.clone(), status))
            }
            NodeConfig::Proxy(cfg) => {
                let target = parse_target(&cfg.target)?;
                let timeout = cfg
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(self.upstream_timeout);
                Node::leaf(ProxyInterceptor::new(self.client.clone(), &target, timeout))
            }
        };
        Ok(node)
    }
}

/// Compile a configured condition into an expression.
pub fn compile_condition(cfg: &ConditionConfig) -> Result<Expression, BuildError> {
    let expr = match cfg {
        ConditionConfig::Header(name) => Expression::Header(header_name(name)?),
        ConditionConfig::HeaderEquals { name, value } => {
            Expression::HeaderEquals(header_name(name)?, header_value(name, value)?)
        }
        ConditionConfig::Method(method) => Expression::Method(
            Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| BuildError::Method(method.clone()))?,
        ),
        ConditionConfig::PathPrefix(prefix) => Expression::PathPrefix(prefix.clone()),
        ConditionConfig::Property(key) => Expression::Property(key.clone()),
        ConditionConfig::PropertyEquals { name, value } => {
            Expression::PropertyEquals(name.clone(), value.clone())
        }
        ConditionConfig::Status(code) => Expression::Status(status(*code)?),
        ConditionConfig::Flow(flow) => Expression::Flow(*flow),
        ConditionConfig::Not(inner) => Expression::Not(Box::new(compile_condition(inner)?)),
        ConditionConfig::All(all) => {
            Expression::All(all.iter().map(compile_condition).collect::<Result<_, _>>()?)
        }
        ConditionConfig::Any(any) => {
            Expression::Any(any.iter().map(compile_condition).collect::<Result<_, _>>()?)
        }
    };
    Ok(expr)
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName, BuildError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| BuildError::HeaderName(name.to_string()))
}

pub(crate) fn header_value(name: &str, value: &str) -> Result<HeaderValue, BuildError> {
    HeaderValue::from_str(value).map_err(|_| BuildError::HeaderValue(name.to_string()))
}

pub(crate) fn status(code: u16) -> Result<StatusCode, BuildError> {
    StatusCode::from_u16(code).map_err(|_| BuildError::Status(code))
}

/// Proxy targets must be absolute `http` URLs with a host.
pub(crate) fn parse_target(target: &str) -> Result<Uri, BuildError> {
    let invalid = |reason: &str| BuildError::Target {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let url = url::Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("only http upstreams are supported"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }
    target.parse::<Uri>().map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ChooseConfig, CaseConfig, SetHeaderConfig};
    use crate::flow::FlowFilter;

    #[derive(serde::Deserialize)]
    struct FlowDoc {
        flow: Vec<NodeConfig>,
    }

    #[derive(serde::Deserialize)]
    struct TestDoc {
        test: ConditionConfig,
    }

    fn builder() -> FlowBuilder {
        FlowBuilder::new(&TimeoutConfig::default())
    }

    #[tokio::test]
    async fn test_route_becomes_root_sequence() {
        let flow: FlowDoc = toml::from_str(
            r#"
            flow = [
                { log = {} },
                { response = [ { set_header = { name = "x-a", value = "1" } } ] },
                { abort = [ { log = { label = "recovery" } } ] },
            ]
            "#,
        )
        .unwrap();

        let root = builder().build_route("orders", &flow.flow).unwrap();
        match &root {
            Node::Sequence(children) => {
                assert_eq!(children.len(), 3);
                assert!(matches!(children[1], Node::ResponseOnly(_)));
                assert!(matches!(children[2], Node::AbortRecovery(_)));
            }
            other => panic!("unexpected root {:?}", other),
        }
        assert_eq!(root.leaf_count(), 3);
    }

    #[tokio::test]
    async fn test_leaf_keeps_configured_phases() {
        let flow = vec![NodeConfig::SetHeader(SetHeaderConfig {
            name: "x-a".into(),
            value: "1".into(),
            phases: FlowFilter::Response,
        })];
        let root = builder().build_route("r", &flow).unwrap();
        match root {
            Node::Sequence(children) => match &children[0] {
                Node::Leaf(leaf) => {
                    assert_eq!(leaf.filter, FlowFilter::Response);
                    assert_eq!(leaf.name(), "set_header");
                }
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected root {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_values_fail_the_build() {
        let bad_header = vec![NodeConfig::SetHeader(SetHeaderConfig {
            name: "bad header".into(),
            value: "1".into(),
            phases: FlowFilter::default(),
        })];
        assert_eq!(
            builder().build_route("r", &bad_header).unwrap_err(),
            BuildError::HeaderName("bad header".into())
        );

        let empty_choice = vec![NodeConfig::Choose(ChooseConfig {
            cases: Vec::<CaseConfig>::new(),
            otherwise: Vec::new(),
        })];
        assert_eq!(
            builder().build_route("r", &empty_choice).unwrap_err(),
            BuildError::EmptyChoice
        );
    }

    #[test]
    fn test_compile_condition() {
        let doc: TestDoc = toml::from_str(
            r#"test = { all = [ { method = "get" }, { not = { header = "x-skip" } } ] }"#,
        )
        .unwrap();

        let expr = compile_condition(&doc.test).unwrap();
        assert_eq!(
            expr,
            Expression::All(vec![
                Expression::Method(Method::GET),
                Expression::Not(Box::new(Expression::Header(HeaderName::from_static("x-skip")))),
            ])
        );
        assert_eq!(
            compile_condition(&ConditionConfig::Status(1000)).unwrap_err(),
            BuildError::Status(1000)
        );
    }

    #[test]
    fn test_parse_target() {
        assert!(parse_target("http://127.0.0.1:3000").is_ok());
        assert!(parse_target("http://backend/v1").is_ok());
        assert!(matches!(parse_target("https://backend"), Err(BuildError::Target { .. })));
        assert!(matches!(parse_target("backend:80"), Err(BuildError::Target { .. })));
        assert!(matches!(parse_target("http://backend/?a=1"), Err(BuildError::Target { .. })));
    }
}
