//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile route configs into matchers plus a built flow tree
//! - Look up matching route for a request head
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction; hot reload swaps whole routers
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Equal priorities keep configuration order
//! - Explicit `None` rather than a silent default route

use axum::http::{request::Parts, Method};
use std::sync::Arc;

use crate::config::RouteConfig;
use crate::flow::{BuildError, FlowBuilder, Node};
use crate::routing::matcher::{
    AndMatcher, HostMatcher, Matcher, MethodMatcher, PathPrefixMatcher,
};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub priority: u32,
    matcher: AndMatcher,
    /// Shared by every exchange running on this route.
    pub flow: Arc<Node>,
}

impl Route {
    pub fn matches(&self, parts: &Parts) -> bool {
        self.matcher.matches(parts)
    }
}

/// Priority-ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile every route, building its flow with `builder`.
    pub fn from_config(routes: &[RouteConfig], builder: &FlowBuilder) -> Result<Self, BuildError> {
        let mut compiled = routes
            .iter()
            .map(|route| compile(route, builder))
            .collect::<Result<Vec<_>, _>>()?;

        // stable: ties keep config order
        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        tracing::debug!(routes = compiled.len(), "Route table compiled");
        Ok(Self { routes: compiled })
    }

    /// First route (by priority) matching the request head.
    pub fn match_request(&self, parts: &Parts) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(parts))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn compile(route: &RouteConfig, builder: &FlowBuilder) -> Result<Route, BuildError> {
    let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
    if let Some(host) = &route.host {
        matchers.push(Box::new(HostMatcher::new(host.clone())));
    }
    if let Some(prefix) = &route.path_prefix {
        matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
    }
    if !route.methods.is_empty() {
        let methods = route
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| BuildError::Method(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        matchers.push(Box::new(MethodMatcher::new(methods)));
    }

    Ok(Route {
        name: route.name.clone(),
        priority: route.priority,
        matcher: AndMatcher::new(matchers),
        flow: Arc::new(builder.build_route(&route.name, &route.flow)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, TimeoutConfig};
    use axum::http::Request;

    fn router(toml: &str) -> Router {
        let config = parse_config(toml).unwrap();
        Router::from_config(&config.routes, &FlowBuilder::new(&TimeoutConfig::default())).unwrap()
    }

    fn head(method: Method, uri: &str, host: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("host", host)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_priority_order_and_ties() {
        let router = router(
            r#"
            [[routes]]
            name = "catch-all"
            path_prefix = "/"
            flow = [ { respond = {} } ]

            [[routes]]
            name = "orders"
            path_prefix = "/orders"
            priority = 10
            flow = [ { respond = {} } ]

            [[routes]]
            name = "orders-shadow"
            path_prefix = "/orders"
            priority = 10
            flow = [ { respond = {} } ]
            "#,
        );

        let order: Vec<_> = router.routes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["orders", "orders-shadow", "catch-all"]);

        let hit = router.match_request(&head(Method::GET, "/orders/7", "gw")).unwrap();
        assert_eq!(hit.name, "orders");
        let hit = router.match_request(&head(Method::GET, "/users", "gw")).unwrap();
        assert_eq!(hit.name, "catch-all");
    }

    #[tokio::test]
    async fn test_host_and_method_constraints() {
        let router = router(
            r#"
            [[routes]]
            name = "admin"
            host = "admin.local"
            methods = ["get"]
            flow = [ { respond = { body = "ok" } } ]
            "#,
        );

        assert!(router.match_request(&head(Method::GET, "/", "admin.local")).is_some());
        assert!(router.match_request(&head(Method::POST, "/", "admin.local")).is_none());
        assert!(router.match_request(&head(Method::GET, "/", "public.local")).is_none());
        assert_eq!(router.routes()[0].flow.leaf_count(), 1);
    }

    #[test]
    fn test_empty_router_matches_nothing() {
        let router = Router::default();
        assert!(router.is_empty());
        assert!(router.match_request(&head(Method::GET, "/", "gw")).is_none());
    }
}
