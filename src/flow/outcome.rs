//! Outcome signals and flow filters.
//!
//! Every handler invocation answers with an [`Outcome`]; every leaf carries a
//! [`FlowFilter`] deciding which of its handlers the controller actually calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal returned by an interceptor to the flow controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Proceed with the next node.
    Continue,
    /// Stop the request pass everywhere and unwind in normal mode.
    Return,
    /// Stop the request pass everywhere and unwind in abort mode.
    Abort,
}

impl Outcome {
    /// True for `Return` and `Abort`.
    pub fn is_short_circuit(self) -> bool {
        !matches!(self, Outcome::Continue)
    }
}

/// The phase a handler is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Request,
    Response,
    Abort,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flow::Request => "request",
            Flow::Response => "response",
            Flow::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// Set of phases a leaf participates in.
///
/// A phase outside the set is skipped and counts as [`Outcome::Continue`]; the
/// leaf still keeps its position in the tree and on the entered stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowFilter {
    Request,
    Response,
    Abort,
    RequestResponse,
    RequestAbort,
    ResponseAbort,
    #[default]
    RequestResponseAbort,
}

impl FlowFilter {
    /// Whether handlers for `flow` should be invoked.
    pub fn handles(self, flow: Flow) -> bool {
        use FlowFilter::*;
        match flow {
            Flow::Request => matches!(
                self,
                Request | RequestResponse | RequestAbort | RequestResponseAbort
            ),
            Flow::Response => matches!(
                self,
                Response | RequestResponse | ResponseAbort | RequestResponseAbort
            ),
            Flow::Abort => matches!(
                self,
                Abort | RequestAbort | ResponseAbort | RequestResponseAbort
            ),
        }
    }
}
