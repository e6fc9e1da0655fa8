//! Entered-stack bookkeeping for one traversal.
//!
//! The stack borrows from the shared tree for the duration of a single
//! `FlowController::run` call and is dropped when the unwind finishes.

use crate::exchange::Exchange;
use crate::flow::node::{choose, Leaf, Node};
use crate::flow::Flow;

/// Something the unwind will visit again.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Entry<'a> {
    /// A leaf that took part in the request pass.
    Leaf(&'a Leaf),
    /// A response-only block waiting for a normal unwind.
    ResponseOnly(&'a [Node]),
    /// An abort-recovery block waiting for an abort unwind.
    Recovery(&'a [Node]),
    /// A child of an unwinding response-only block, not yet expanded.
    Pending(&'a Node),
}

/// Where an entry was pushed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    RequestPass,
    /// Pushed while unwinding a response-only block; skipped in abort mode.
    ResponseOnly,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Entered<'a> {
    pub entry: Entry<'a>,
    pub origin: Origin,
}

/// LIFO record of entries eligible for the unwind.
#[derive(Debug, Default)]
pub(crate) struct EnteredStack<'a> {
    entries: Vec<Entered<'a>>,
}

impl<'a> EnteredStack<'a> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, entry: Entry<'a>) {
        self.entries.push(Entered {
            entry,
            origin: Origin::RequestPass,
        });
    }

    pub fn pop(&mut self) -> Option<Entered<'a>> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Push the children of a response-only node so the next pops visit them
    /// in reverse declared order. Each child is expanded only when popped.
    pub fn push_pending(&mut self, children: &'a [Node]) {
        self.entries.extend(children.iter().map(|node| Entered {
            entry: Entry::Pending(node),
            origin: Origin::ResponseOnly,
        }));
    }
}

/// What a response pass does with one node when its turn comes.
pub(crate) enum ResponseStep<'a> {
    /// Call `handle_response`.
    Leaf(&'a Leaf),
    /// Visit these children next, last one first.
    Children(&'a [Node]),
    /// Nothing to do.
    Skip,
}

/// Resolve `node` for a response pass at its own turn, so conditions see the
/// effects of the siblings unwound before it.
///
/// Request-only blocks contribute nothing; nested abort-recovery blocks are
/// inert here because a response pass never unwinds in abort mode through them.
pub(crate) fn response_step<'a>(node: &'a Node, exc: &Exchange) -> ResponseStep<'a> {
    match node {
        Node::Leaf(leaf) => ResponseStep::Leaf(leaf),
        Node::Sequence(children) | Node::ResponseOnly(children) => ResponseStep::Children(children),
        Node::RequestOnly(_) | Node::AbortRecovery(_) => ResponseStep::Skip,
        Node::Conditional {
            condition,
            children,
        } => {
            if condition.test(exc, Flow::Response) {
                ResponseStep::Children(children)
            } else {
                ResponseStep::Skip
            }
        }
        Node::Choice { cases, otherwise } => {
            ResponseStep::Children(choose(cases, otherwise, exc, Flow::Response))
        }
    }
}
