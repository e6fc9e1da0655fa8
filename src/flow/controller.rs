//! The flow controller: drives one exchange through a flow tree.
//!
//! # Algorithm
//! ```text
//! request pass   depth-first, left to right over the tree
//!                leaves outside request-only blocks are pushed once entered
//!                response-only / abort-recovery blocks are pushed as pending
//!                first Return → normal unwind, first Abort/error → abort unwind
//!
//! unwind         pop until empty
//!   normal       leaf: handle_response      response-only: push its children,
//!                                           expanded one by one as they pop
//!                recovery: skipped          leaf Abort: switch to abort mode
//!   abort        leaf: handle_abort         response-only: skipped
//!                recovery: handle_response on its children, reversed, once
//! ```
//!
//! # Design Decisions
//! - Iterative traversal with explicit cursor and entered stacks (no async recursion)
//! - Every interceptor call goes through `invoke`, the only place where errors
//!   and panics become `Abort`
//! - Abort mode is sticky for the rest of the traversal
//! - No spawning, retries or timeouts here; those belong to interceptors

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::slice;

use crate::exchange::{Exchange, ExchangeState, FlowFailure};
use crate::flow::node::{choose, Leaf, Node};
use crate::flow::stack::{response_step, EnteredStack, Entered, Entry, Origin, ResponseStep};
use crate::flow::{Flow, Interceptor, InterceptorError, Outcome};
use crate::observability::metrics;

/// Unwind mode chosen by the request pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unwind {
    Normal,
    Abort,
}

/// Position inside one composite's children during the request pass.
struct Cursor<'a> {
    nodes: slice::Iter<'a, Node>,
    /// False inside request-only blocks: nothing there is visited again.
    enter: bool,
}

/// Interprets flow trees. Stateless; one instance can serve every exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowController;

impl FlowController {
    pub fn new() -> Self {
        Self
    }

    /// Run the request pass and the unwind for `exc` over `root`.
    ///
    /// Returns the final state, which is also stored on the exchange.
    #[tracing::instrument(name = "flow", skip_all, fields(exchange = %exc.id()))]
    pub async fn run(&self, root: &Node, exc: &mut Exchange) -> ExchangeState {
        let mut stack = EnteredStack::new();

        let mode = self.request_pass(root, exc, &mut stack).await;
        tracing::debug!(mode = ?mode, pending = stack.len(), "request pass finished");

        let state = match self.unwind(mode, exc, &mut stack).await {
            Unwind::Normal => ExchangeState::Completed,
            Unwind::Abort => ExchangeState::Aborted,
        };
        exc.set_state(state);
        state
    }

    async fn request_pass<'a>(
        &self,
        root: &'a Node,
        exc: &mut Exchange,
        stack: &mut EnteredStack<'a>,
    ) -> Unwind {
        let mut cursors = vec![Cursor {
            nodes: slice::from_ref(root).iter(),
            enter: true,
        }];

        while let Some(cursor) = cursors.last_mut() {
            let Some(node) = cursor.nodes.next() else {
                cursors.pop();
                continue;
            };
            let enter = cursor.enter;

            match node {
                Node::Leaf(leaf) => match self.invoke(leaf, Flow::Request, exc).await {
                    Outcome::Continue => {
                        if enter {
                            stack.push(Entry::Leaf(leaf));
                        }
                    }
                    Outcome::Return => {
                        tracing::debug!(interceptor = leaf.name(), "request pass returned early");
                        return Unwind::Normal;
                    }
                    Outcome::Abort => {
                        tracing::debug!(interceptor = leaf.name(), "request pass aborted");
                        return Unwind::Abort;
                    }
                },
                Node::Sequence(children) => cursors.push(Cursor {
                    nodes: children.iter(),
                    enter,
                }),
                Node::RequestOnly(children) => cursors.push(Cursor {
                    nodes: children.iter(),
                    enter: false,
                }),
                Node::ResponseOnly(children) => {
                    if enter {
                        stack.push(Entry::ResponseOnly(children));
                    }
                }
                Node::Conditional {
                    condition,
                    children,
                } => {
                    if condition.test(exc, Flow::Request) {
                        cursors.push(Cursor {
                            nodes: children.iter(),
                            enter,
                        });
                    }
                }
                Node::AbortRecovery(children) => {
                    if enter {
                        stack.push(Entry::Recovery(children));
                    }
                }
                Node::Choice { cases, otherwise } => cursors.push(Cursor {
                    nodes: choose(cases, otherwise, exc, Flow::Request).iter(),
                    enter,
                }),
            }
        }

        Unwind::Normal
    }

    async fn unwind<'a>(
        &self,
        mut mode: Unwind,
        exc: &mut Exchange,
        stack: &mut EnteredStack<'a>,
    ) -> Unwind {
        while let Some(Entered { entry, origin }) = stack.pop() {
            match (mode, entry) {
                (Unwind::Normal, Entry::Leaf(leaf)) => {
                    if self.invoke(leaf, Flow::Response, exc).await == Outcome::Abort {
                        tracing::debug!(interceptor = leaf.name(), "response pass aborted");
                        mode = Unwind::Abort;
                    }
                }
                (Unwind::Normal, Entry::ResponseOnly(children)) => stack.push_pending(children),
                (Unwind::Normal, Entry::Pending(node)) => match response_step(node, exc) {
                    ResponseStep::Leaf(leaf) => {
                        if self.invoke(leaf, Flow::Response, exc).await == Outcome::Abort {
                            tracing::debug!(interceptor = leaf.name(), "response pass aborted");
                            mode = Unwind::Abort;
                        }
                    }
                    ResponseStep::Children(children) => stack.push_pending(children),
                    ResponseStep::Skip => {}
                },
                (Unwind::Normal, Entry::Recovery(_)) => {}
                (Unwind::Abort, _) if origin == Origin::ResponseOnly => {}
                (Unwind::Abort, Entry::Leaf(leaf)) => {
                    self.invoke(leaf, Flow::Abort, exc).await;
                }
                (Unwind::Abort, Entry::ResponseOnly(_) | Entry::Pending(_)) => {}
                (Unwind::Abort, Entry::Recovery(children)) => {
                    self.recover(children, exc).await;
                }
            }
        }
        mode
    }

    /// Response pass over an abort-recovery block, children last to first.
    /// Conditions are tested at their own turn. A failure inside the block
    /// skips the remaining recovery steps; the outer abort carries on regardless.
    async fn recover(&self, children: &[Node], exc: &mut Exchange) {
        let mut pending: Vec<&Node> = children.iter().collect();

        while let Some(node) = pending.pop() {
            match response_step(node, exc) {
                ResponseStep::Leaf(leaf) => {
                    if self.invoke(leaf, Flow::Response, exc).await == Outcome::Abort {
                        tracing::warn!(
                            interceptor = leaf.name(),
                            "recovery step aborted, skipping the rest of the block"
                        );
                        break;
                    }
                }
                ResponseStep::Children(nested) => pending.extend(nested.iter()),
                ResponseStep::Skip => {}
            }
        }
    }

    async fn invoke(&self, leaf: &Leaf, flow: Flow, exc: &mut Exchange) -> Outcome {
        if !leaf.filter.handles(flow) {
            tracing::trace!(interceptor = leaf.name(), %flow, "skipped by flow filter");
            return Outcome::Continue;
        }

        tracing::debug!(interceptor = leaf.name(), %flow, "invoking interceptor");
        let result = AssertUnwindSafe(dispatch(leaf.interceptor.as_ref(), flow, exc))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(error)) => error,
            Err(payload) => InterceptorError::Panicked(panic_message(payload.as_ref())),
        };

        tracing::warn!(
            interceptor = leaf.name(),
            %flow,
            error = %error,
            "interceptor failed"
        );
        metrics::record_interceptor_failure(leaf.name(), flow);
        exc.record_failure(FlowFailure {
            interceptor: leaf.name().to_string(),
            flow,
            error,
        });
        Outcome::Abort
    }
}

async fn dispatch(
    interceptor: &dyn Interceptor,
    flow: Flow,
    exc: &mut Exchange,
) -> Result<Outcome, InterceptorError> {
    match flow {
        Flow::Request => interceptor.handle_request(exc).await,
        Flow::Response => interceptor.handle_response(exc).await,
        Flow::Abort => {
            interceptor.handle_abort(exc).await;
            Ok(Outcome::Continue)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
