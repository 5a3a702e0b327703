//! Pipeline Manager
//!
//! Hands out pipeline handles and makes sure each description is compiled
//! at most once in the common case, with results shared through the
//! [`GlobalPipelineCache`].
//!
//! # Lifecycle of a description
//!
//! ```text
//! request ──► global cache hit ──────────────────────────► Resolved
//!    │
//!    └──────► in-flight task (new or reused) ──► InFlight
//!                                                  │ resolve / precompile
//!                                                  ▼
//!                     compile outside any lock, claim completion,
//!                     winner inserts into the global cache, publishes
//!                     and removes the task
//! ```
//!
//! Two threads can both miss and compile the same description. Only the
//! winner's pipeline becomes canonical; the loser still returns its own
//! pipeline to its caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tincture_shader::{Caps, RenderStepRegistry, ShaderCodeDictionary, ShaderInfo};

use crate::compiler::{PipelineCompiler, PipelineProgram};
use crate::description::{PipelineCacheKey, PipelineDescription};
use crate::global_cache::GlobalPipelineCache;
use crate::task::PipelineCreationTask;

/// A pipeline that is either ready or still being compiled.
#[derive(Debug)]
pub enum PipelineHandle<P> {
    InFlight(Arc<PipelineCreationTask<P>>),
    Resolved(Arc<P>),
}

impl<P> Clone for PipelineHandle<P> {
    fn clone(&self) -> Self {
        match self {
            Self::InFlight(task) => Self::InFlight(Arc::clone(task)),
            Self::Resolved(pipeline) => Self::Resolved(Arc::clone(pipeline)),
        }
    }
}

impl<P> PipelineHandle<P> {
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PipelineStats {
    compilations: AtomicU64,
    cache_hits: AtomicU64,
    task_reuses: AtomicU64,
    lost_races: AtomicU64,
    failures: AtomicU64,
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatsSnapshot {
    pub compilations: u64,
    pub cache_hits: u64,
    pub task_reuses: u64,
    pub lost_races: u64,
    pub failures: u64,
}

impl PipelineStats {
    #[must_use]
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            compilations: self.compilations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            task_reuses: self.task_reuses.load(Ordering::Relaxed),
            lost_races: self.lost_races.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// Settings for a [`PipelineManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineManagerConfig {
    pub caps: Caps,
    /// Tasks beyond this many are compiled but not deduplicated.
    pub max_tasks_in_flight: usize,
    pub label_pipelines: bool,
}

impl Default for PipelineManagerConfig {
    fn default() -> Self {
        Self {
            caps: Caps::default(),
            max_tasks_in_flight: 256,
            label_pipelines: cfg!(debug_assertions),
        }
    }
}

type TaskMap<P> = FxHashMap<PipelineCacheKey, Arc<PipelineCreationTask<P>>>;

/// Deduplicating front end of a [`PipelineCompiler`].
pub struct PipelineManager<C: PipelineCompiler> {
    compiler: C,
    dictionary: Arc<ShaderCodeDictionary>,
    render_steps: Arc<RenderStepRegistry>,
    global_cache: Arc<GlobalPipelineCache<C::Pipeline>>,
    tasks: Mutex<TaskMap<C::Pipeline>>,
    config: PipelineManagerConfig,
    stats: PipelineStats,
}

impl<C: PipelineCompiler> PipelineManager<C> {
    #[must_use]
    pub fn new(
        compiler: C,
        dictionary: Arc<ShaderCodeDictionary>,
        render_steps: Arc<RenderStepRegistry>,
        global_cache: Arc<GlobalPipelineCache<C::Pipeline>>,
        config: PipelineManagerConfig,
    ) -> Self {
        Self {
            compiler,
            dictionary,
            render_steps,
            global_cache,
            tasks: Mutex::new(FxHashMap::default()),
            config,
            stats: PipelineStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    #[inline]
    #[must_use]
    pub fn global_cache(&self) -> &Arc<GlobalPipelineCache<C::Pipeline>> {
        &self.global_cache
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn tasks_in_flight(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Returns a handle for `desc` without compiling anything.
    pub fn request(&self, desc: &PipelineDescription) -> PipelineHandle<C::Pipeline> {
        let key = desc.cache_key();
        if let Some(pipeline) = self.global_cache.get(&key) {
            PipelineStats::bump(&self.stats.cache_hits);
            return PipelineHandle::Resolved(pipeline);
        }

        let mut tasks = self.tasks.lock();
        if let Some(task) = tasks.get(&key) {
            PipelineStats::bump(&self.stats.task_reuses);
            return PipelineHandle::InFlight(Arc::clone(task));
        }
        // The winner inserts into the global cache before removing its task.
        if let Some(pipeline) = self.global_cache.get(&key) {
            PipelineStats::bump(&self.stats.cache_hits);
            return PipelineHandle::Resolved(pipeline);
        }

        let task = Arc::new(PipelineCreationTask::new(*desc));
        if tasks.len() < self.config.max_tasks_in_flight {
            tasks.insert(key, Arc::clone(&task));
        } else {
            log::debug!(
                "Pipeline task map full ({} in flight); {:016x} is not deduplicated",
                tasks.len(),
                key.fx_hash()
            );
        }
        PipelineHandle::InFlight(task)
    }

    /// Requests and immediately compiles `desc`.
    pub fn precompile(&self, desc: &PipelineDescription) -> Option<Arc<C::Pipeline>> {
        let handle = self.request(desc);
        self.resolve(&handle)
    }

    /// The pipeline behind `handle`, compiling it if nobody has yet.
    /// `None` means compilation failed and the draw cannot be rendered.
    pub fn resolve(&self, handle: &PipelineHandle<C::Pipeline>) -> Option<Arc<C::Pipeline>> {
        match handle {
            PipelineHandle::Resolved(pipeline) => Some(Arc::clone(pipeline)),
            PipelineHandle::InFlight(task) => match task.result() {
                Some(result) => result,
                None if task.is_completed() => task.wait(),
                None => self.drive(task),
            },
        }
    }

    fn drive(&self, task: &Arc<PipelineCreationTask<C::Pipeline>>) -> Option<Arc<C::Pipeline>> {
        let desc = *task.description();
        let key = desc.cache_key();
        let compiled = self.compile(&desc).map(Arc::new);

        if !task.claim_completion() {
            PipelineStats::bump(&self.stats.lost_races);
            log::debug!("Lost completion race for pipeline {:016x}", key.fx_hash());
            return compiled;
        }

        let canonical = compiled.map(|pipeline| self.global_cache.insert(key, pipeline));
        task.publish(canonical.clone());

        let mut tasks = self.tasks.lock();
        if tasks.get(&key).is_some_and(|tracked| Arc::ptr_eq(tracked, task)) {
            tasks.remove(&key);
        }
        canonical
    }

    fn compile(&self, desc: &PipelineDescription) -> Option<C::Pipeline> {
        let Some(step) = self.render_steps.get(desc.render_step) else {
            PipelineStats::bump(&self.stats.failures);
            log::warn!("Cannot compile pipeline: unknown render step {}", desc.render_step.as_u32());
            return None;
        };

        let info = match ShaderInfo::make(
            &self.config.caps,
            &self.dictionary,
            &desc.render_pass,
            &step,
            desc.paint_id,
        ) {
            Ok(info) => info,
            Err(e) => {
                PipelineStats::bump(&self.stats.failures);
                log::warn!("Cannot generate programs for {}: {e}", step.name());
                return None;
            }
        };

        PipelineStats::bump(&self.stats.compilations);
        log::debug!("Compiling pipeline {}", info.label());
        let program = PipelineProgram {
            description: desc,
            shader_info: &info,
            render_step: &step,
            label: self.config.label_pipelines.then_some(info.label()),
        };
        let pipeline = self.compiler.compile(&program);
        match &pipeline {
            Some(_) => log::debug!("Compiled pipeline {}", info.label()),
            None => {
                PipelineStats::bump(&self.stats.failures);
                log::warn!("Pipeline compilation failed: {}", info.label());
            }
        }
        pipeline
    }
}
