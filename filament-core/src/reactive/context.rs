//! Evaluation Context
//!
//! Tracks which derivation is currently being evaluated. This is what makes
//! dependency discovery automatic: when a cell is read, the arena can ask
//! "who is reading?" and register the edge.
//!
//! # Implementation
//!
//! A thread-local stack holds the ids of in-flight evaluations. Entering an
//! evaluation pushes; the returned guard pops on drop, so the previous
//! current derivation is restored on every exit path, including panics.
//! Stack discipline matters: an eager derivation can start running in the
//! middle of another's evaluation (a write inside a read), and when it
//! finishes the outer derivation must be current again.

use std::cell::RefCell;

use super::arena::NodeId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<NodeId>> = const { RefCell::new(Vec::new()) };
}

/// Guard marking a derivation as current for the extent of one evaluation.
///
/// Popped when dropped; the enclosing evaluation (if any) becomes current
/// again.
pub(crate) struct EvalScope {
    id: NodeId,
}

impl EvalScope {
    /// Make `id` the current derivation until the guard drops.
    pub(crate) fn enter(id: NodeId) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(id));
        Self { id }
    }
}

impl Drop for EvalScope {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(
                popped,
                Some(self.id),
                "evaluation scopes must unwind in stack order"
            );
        });
    }
}

/// The derivation currently being evaluated on this thread, if any.
pub(crate) fn current() -> Option<NodeId> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().copied())
}

/// Whether any derivation is currently being evaluated on this thread.
pub fn is_tracking() -> bool {
    CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_sets_and_restores_current() {
        let id = NodeId::next();

        assert!(!is_tracking());
        assert!(current().is_none());

        {
            let _scope = EvalScope::enter(id);
            assert!(is_tracking());
            assert_eq!(current(), Some(id));
        }

        assert!(!is_tracking());
        assert!(current().is_none());
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let outer = NodeId::next();
        let inner = NodeId::next();

        {
            let _outer = EvalScope::enter(outer);
            assert_eq!(current(), Some(outer));

            {
                let _inner = EvalScope::enter(inner);
                assert_eq!(current(), Some(inner));
            }

            // Inner scope gone, outer is current again.
            assert_eq!(current(), Some(outer));
        }

        assert!(current().is_none());
    }

    #[test]
    fn scope_is_restored_after_panic() {
        let id = NodeId::next();

        let result = std::panic::catch_unwind(|| {
            let _scope = EvalScope::enter(id);
            panic!("evaluation failed");
        });

        assert!(result.is_err());
        assert!(!is_tracking());
    }
}
