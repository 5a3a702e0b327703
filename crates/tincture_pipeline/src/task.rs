//! In-flight pipeline compilations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::description::PipelineDescription;

/// One compilation unit. Completes exactly once; whoever flips the
/// completion flag first publishes the result, later finishers keep their
/// own.
#[derive(Debug)]
pub struct PipelineCreationTask<P> {
    description: PipelineDescription,
    completed: AtomicBool,
    result: OnceLock<Option<Arc<P>>>,
}

impl<P> PipelineCreationTask<P> {
    #[must_use]
    pub fn new(description: PipelineDescription) -> Self {
        Self {
            description,
            completed: AtomicBool::new(false),
            result: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &PipelineDescription {
        &self.description
    }

    /// Whether some thread has claimed completion. The result may still be
    /// in the process of being published.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// The published result, or `None` while the task is in flight. A
    /// published `None` is a failed compilation.
    #[inline]
    #[must_use]
    pub fn result(&self) -> Option<Option<Arc<P>>> {
        self.result.get().cloned()
    }

    /// Blocks until the winner has published.
    #[must_use]
    pub fn wait(&self) -> Option<Arc<P>> {
        self.result.wait().clone()
    }

    /// Flips the completion flag. Returns `true` for exactly one caller, who
    /// must then [`publish`](Self::publish).
    pub(crate) fn claim_completion(&self) -> bool {
        self.completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn publish(&self, result: Option<Arc<P>>) {
        debug_assert!(self.is_completed(), "published without claiming completion");
        let stored = self.result.set(result);
        debug_assert!(stored.is_ok(), "task published twice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tincture_shader::{RenderPassDesc, RenderStepId, UniquePaintProgramId};

    fn task() -> PipelineCreationTask<u32> {
        PipelineCreationTask::new(PipelineDescription::new(
            RenderStepId(0),
            UniquePaintProgramId::INVALID,
            RenderPassDesc::default(),
        ))
    }

    #[test]
    fn only_one_claim_succeeds() {
        let task = task();
        assert!(task.result().is_none());
        assert!(task.claim_completion());
        assert!(!task.claim_completion());
        task.publish(Some(Arc::new(5)));
        assert_eq!(task.wait().as_deref(), Some(&5));
    }

    #[test]
    fn failures_are_published_as_none() {
        let task = task();
        assert!(task.claim_completion());
        task.publish(None);
        assert_eq!(task.result(), Some(None));
    }
}
