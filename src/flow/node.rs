//! The flow tree.
//!
//! A route's flow is one closed [`Node`] enum. Composite variants only describe
//! control flow; all of their semantics live in the controller's single `match`.
//! Trees are built once and shared read-only through `Arc`.

use std::fmt;
use std::sync::Arc;

use crate::exchange::Exchange;
use crate::flow::{Condition, Flow, FlowFilter, Interceptor};

/// An interceptor placed in the tree together with its flow filter.
#[derive(Clone)]
pub struct Leaf {
    pub interceptor: Arc<dyn Interceptor>,
    pub filter: FlowFilter,
}

impl Leaf {
    pub fn name(&self) -> &str {
        self.interceptor.name()
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.name())
            .field("filter", &self.filter)
            .finish()
    }
}

/// One guarded branch of a [`Node::Choice`].
#[derive(Clone)]
pub struct Case {
    pub condition: Arc<dyn Condition>,
    pub children: Vec<Node>,
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case").field("children", &self.children).finish_non_exhaustive()
    }
}

/// A node of the flow tree.
#[derive(Clone)]
pub enum Node {
    /// A processing unit.
    Leaf(Leaf),
    /// Children run in order on the request, in reverse on the unwind.
    Sequence(Vec<Node>),
    /// Children run on the request pass only.
    RequestOnly(Vec<Node>),
    /// Children run on a normal unwind only.
    ResponseOnly(Vec<Node>),
    /// Children are spliced in when the condition holds, erased otherwise.
    Conditional {
        condition: Arc<dyn Condition>,
        children: Vec<Node>,
    },
    /// Children get a response pass when an abort unwinds through this position.
    AbortRecovery(Vec<Node>),
    /// The first matching case (or `otherwise`) is spliced in.
    Choice { cases: Vec<Case>, otherwise: Vec<Node> },
}

impl Node {
    /// A leaf handling every phase.
    pub fn leaf(interceptor: impl Interceptor) -> Self {
        Self::leaf_with(interceptor, FlowFilter::default())
    }

    pub fn leaf_with(interceptor: impl Interceptor, filter: FlowFilter) -> Self {
        Node::Leaf(Leaf {
            interceptor: Arc::new(interceptor),
            filter,
        })
    }

    pub fn sequence(children: Vec<Node>) -> Self {
        Node::Sequence(children)
    }

    pub fn request_only(children: Vec<Node>) -> Self {
        Node::RequestOnly(children)
    }

    pub fn response_only(children: Vec<Node>) -> Self {
        Node::ResponseOnly(children)
    }

    pub fn conditional(condition: impl Condition, children: Vec<Node>) -> Self {
        Node::Conditional {
            condition: Arc::new(condition),
            children,
        }
    }

    pub fn abort_recovery(children: Vec<Node>) -> Self {
        Node::AbortRecovery(children)
    }

    pub fn choice(cases: Vec<Case>, otherwise: Vec<Node>) -> Self {
        Node::Choice { cases, otherwise }
    }

    /// Number of leaves in the tree, across all branches.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Sequence(children)
            | Node::RequestOnly(children)
            | Node::ResponseOnly(children)
            | Node::AbortRecovery(children)
            | Node::Conditional { children, .. } => children.iter().map(Node::leaf_count).sum(),
            Node::Choice { cases, otherwise } => {
                cases
                    .iter()
                    .flat_map(|c| c.children.iter())
                    .chain(otherwise.iter())
                    .map(Node::leaf_count)
                    .sum()
            }
        }
    }
}

impl Case {
    pub fn new(condition: impl Condition, children: Vec<Node>) -> Self {
        Self {
            condition: Arc::new(condition),
            children,
        }
    }
}

/// Branch of a choice selected for this exchange: the first case whose
/// condition holds, else `otherwise`.
pub(crate) fn choose<'a>(
    cases: &'a [Case],
    otherwise: &'a [Node],
    exc: &Exchange,
    flow: Flow,
) -> &'a [Node] {
    cases
        .iter()
        .find(|case| case.condition.test(exc, flow))
        .map(|case| case.children.as_slice())
        .unwrap_or(otherwise)
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => fmt::Debug::fmt(leaf, f),
            Node::Sequence(children) => f.debug_tuple("Sequence").field(children).finish(),
            Node::RequestOnly(children) => f.debug_tuple("RequestOnly").field(children).finish(),
            Node::ResponseOnly(children) => f.debug_tuple("ResponseOnly").field(children).finish(),
            Node::Conditional { children, .. } => {
                f.debug_tuple("Conditional").field(children).finish()
            }
            Node::AbortRecovery(children) => {
                f.debug_tuple("AbortRecovery").field(children).finish()
            }
            Node::Choice { cases, otherwise } => f
                .debug_struct("Choice")
                .field("cases", cases)
                .field("otherwise", otherwise)
                .finish(),
        }
    }
}
