use rayon::prelude::*;
use tessera_shape_inference::Analyzer;

use crate::diagnostic::Diagnostic;
use crate::env::{env_setting, parse_switch, parse_thread_count};
use crate::expr::Call;
use crate::infer::InferCtx;
use crate::op_registry::OpRegistry;
use crate::struct_info::StructInfo;

/// Options which configure an [`InferencePass`].
#[derive(Clone, Debug)]
pub struct PassOptions {
    parallel: bool,
    num_threads: Option<usize>,
}

impl Default for PassOptions {
    /// Parallel inference is enabled unless the `TESSERA_PARALLEL_INFERENCE`
    /// environment variable disables it. `TESSERA_INFERENCE_THREADS` sets the
    /// size of a dedicated thread pool.
    fn default() -> Self {
        Self {
            parallel: env_setting("TESSERA_PARALLEL_INFERENCE", parse_switch).unwrap_or(true),
            num_threads: env_setting("TESSERA_INFERENCE_THREADS", parse_thread_count),
        }
    }
}

impl PassOptions {
    /// Set whether calls are inferred in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run inference in a dedicated thread pool of the given size, instead of
    /// Rayon's global pool.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }
}

/// Compiler pass which infers the struct info of independent calls.
pub struct InferencePass {
    registry: OpRegistry,
    analyzer: Analyzer,
    options: PassOptions,
    pool: Option<rayon::ThreadPool>,
}

impl InferencePass {
    pub fn new(registry: OpRegistry, options: PassOptions) -> Self {
        let pool = options.num_threads.and_then(|num_threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|index| format!("tessera-infer-{}", index))
                .build()
                .inspect_err(|err| tracing::warn!(%err, "failed to create inference thread pool"))
                .ok()
        });

        Self {
            registry,
            analyzer: Analyzer::new(),
            options,
            pool,
        }
    }

    /// Create a pass with all built-in operators and default options.
    pub fn with_all_ops() -> Self {
        Self::new(OpRegistry::with_all_ops(), PassOptions::default())
    }

    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    /// Infer the struct info of each call.
    ///
    /// Returns one result per call, in the same order as `calls`. A failure
    /// for one call does not affect the others.
    #[tracing::instrument(skip_all, fields(num_calls = calls.len()))]
    pub fn run(&self, calls: &[Call]) -> Vec<Result<StructInfo, Diagnostic>> {
        let ctx = InferCtx::new(&self.analyzer, &self.registry);
        let infer = |call: &Call| self.registry.infer_struct_info(call, &ctx);

        let results: Vec<_> = if self.options.parallel {
            let run_parallel = || calls.par_iter().map(infer).collect::<Vec<_>>();
            match &self.pool {
                Some(pool) => pool.install(run_parallel),
                None => run_parallel(),
            }
        } else {
            calls.iter().map(infer).collect()
        };

        let failures = results.iter().filter(|r| r.is_err()).count();
        tracing::debug!(failures, "inference pass finished");
        results
    }
}
