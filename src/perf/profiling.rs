/// Instrumentation counters for the rendering pipeline
/// Compiled to no-ops unless the `profiling` feature is enabled
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe performance counters for pipeline stages
pub struct FunctionCounters {
    // Command processor
    pub commands_executed: AtomicU64,
    pub draw_calls: AtomicU64,
    pub image_fill_calls: AtomicU64,

    // Geometry
    pub vertices_processed: AtomicU64,
    pub triangles_processed: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_culled: AtomicU64,

    // Fragments
    pub fragments_generated: AtomicU64,
    pub stencil_test_failed: AtomicU64,
    pub depth_test_failed: AtomicU64,
    pub fragments_discarded: AtomicU64,
    pub fragments_written: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            commands_executed: AtomicU64::new(0),
            draw_calls: AtomicU64::new(0),
            image_fill_calls: AtomicU64::new(0),
            vertices_processed: AtomicU64::new(0),
            triangles_processed: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            fragments_generated: AtomicU64::new(0),
            stencil_test_failed: AtomicU64::new(0),
            depth_test_failed: AtomicU64::new(0),
            fragments_discarded: AtomicU64::new(0),
            fragments_written: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 12] {
        [
            &self.commands_executed,
            &self.draw_calls,
            &self.image_fill_calls,
            &self.vertices_processed,
            &self.triangles_processed,
            &self.triangles_clipped,
            &self.triangles_culled,
            &self.fragments_generated,
            &self.stencil_test_failed,
            &self.depth_test_failed,
            &self.fragments_discarded,
            &self.fragments_written,
        ]
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        let [commands_executed, draw_calls, image_fill_calls, vertices_processed, triangles_processed, triangles_clipped, triangles_culled, fragments_generated, stencil_test_failed, depth_test_failed, fragments_discarded, fragments_written] =
            self.all().map(|c| c.load(Ordering::Relaxed));
        CounterSnapshot {
            commands_executed,
            draw_calls,
            image_fill_calls,
            vertices_processed,
            triangles_processed,
            triangles_clipped,
            triangles_culled,
            fragments_generated,
            stencil_test_failed,
            depth_test_failed,
            fragments_discarded,
            fragments_written,
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub commands_executed: u64,
    pub draw_calls: u64,
    pub image_fill_calls: u64,
    pub vertices_processed: u64,
    pub triangles_processed: u64,
    pub triangles_clipped: u64,
    pub triangles_culled: u64,
    pub fragments_generated: u64,
    pub stencil_test_failed: u64,
    pub depth_test_failed: u64,
    pub fragments_discarded: u64,
    pub fragments_written: u64,
}

impl CounterSnapshot {
    /// Print formatted report
    pub fn print_report(&self) {
        println!("\n=== Pipeline Counters Report ===");
        println!("\nCommands:");
        println!("  commands executed:          {:12}", self.commands_executed);
        println!("  draw calls:                 {:12}", self.draw_calls);
        println!("  image fills (clears):       {:12}", self.image_fill_calls);

        println!("\nGeometry:");
        println!("  vertices processed:         {:12}", self.vertices_processed);
        println!("  triangles processed:        {:12}", self.triangles_processed);
        println!("  triangles clipped away:     {:12}", self.triangles_clipped);
        println!("  triangles culled:           {:12}", self.triangles_culled);

        println!("\nFragments:");
        println!("  fragments generated:        {:12}", self.fragments_generated);
        println!("  stencil test failed:        {:12}", self.stencil_test_failed);
        println!("  depth test failed:          {:12}", self.depth_test_failed);
        println!("  discarded by shader:        {:12}", self.fragments_discarded);
        println!("  written:                    {:12}", self.fragments_written);
        if self.fragments_generated > 0 {
            let pass_rate = (self.fragments_written as f64 / self.fragments_generated as f64) * 100.0;
            println!("  write rate:                 {:11.2}%", pass_rate);
        }

        println!();
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
