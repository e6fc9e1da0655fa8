//! Property-writing interceptor.

use async_trait::async_trait;
use serde_json::Value;

use crate::exchange::Exchange;
use crate::flow::{Interceptor, InterceptorError, Outcome};

/// Writes a fixed value into the exchange property bag.
#[derive(Debug, Clone)]
pub struct SetProperty {
    key: String,
    value: Value,
}

impl SetProperty {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn apply(&self, exc: &mut Exchange) {
        exc.set_property(self.key.clone(), self.value.clone());
    }
}

#[async_trait]
impl Interceptor for SetProperty {
    fn name(&self) -> &str {
        "set_property"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        self.apply(exc);
        Ok(Outcome::Continue)
    }

    async fn handle_response(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        self.apply(exc);
        Ok(Outcome::Continue)
    }

    async fn handle_abort(&self, exc: &mut Exchange) {
        self.apply(exc);
    }
}
