//! Basic vthread example
//!
//! Shows which runtime and scope provider the host selected, then runs an
//! await-all scope, an any-success race and a few executor tasks.
//!
//! # Environment Variables
//!
//! - `VT_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `VT_FEATURE_LEVEL=1` - Pretend carriers are unavailable (exercise the fallback)
//! - `VT_CARRIER_KEEP_ALIVE_MS=500` - Idle carrier retirement delay

use std::process::ExitCode;
use std::time::{Duration, Instant};

use tracing::{error, info};
use vthread::{logging, StructuredTaskScopes, TaskFailure, VirtualThreads, VtError};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Vt(#[from] VtError),

    #[error("lookup failed: {0}")]
    Lookup(TaskFailure),
}

// VT_LOG_LEVEL=debug cargo run -p vthread-basic
fn main() -> ExitCode {
    logging::init();
    println!("=== vthread Basic Example ===\n");

    match run() {
        Ok(()) => {
            println!("\n=== Example Complete ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "example failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), DemoError> {
    let threads = VirtualThreads::global();
    let scopes = StructuredTaskScopes::global();

    let runtime = threads.runtime();
    let provider = scopes.provider()?;
    println!("Runtime:        {} (priority {})", runtime.runtime_name(), runtime.priority());
    println!("Scope provider: {} (priority {})", provider.provider_name(), provider.priority());

    // Await-all: square 1..=8 concurrently
    let start = Instant::now();
    let sum = scopes.all(Some("squares"), threads.thread_factory("square-"), |scope| {
        let parts = (1..=8_u64)
            .map(|i| {
                scope.fork(move |_| {
                    std::thread::sleep(Duration::from_millis(10));
                    info!(thread = ?vthread::current_thread_name(), i, "squaring");
                    Ok::<_, VtError>(i * i)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        scope.join()?.throw_if_failed()?;
        parts.into_iter().map(|p| p.get()).sum::<Result<u64, _>>()
    })?;
    println!("\nSum of squares 1..=8 = {} in {:?}", sum, start.elapsed());

    // Any-success: the first mirror to answer wins, the others are cancelled
    let mirror = scopes.any(Some("mirrors"), threads.thread_factory("mirror-"), |scope| {
        for (name, delay_ms) in [("slow", 200_u64), ("fast", 5), ("medium", 50)] {
            scope.fork(move |token| {
                let deadline = Instant::now() + Duration::from_millis(delay_ms);
                while Instant::now() < deadline {
                    token.check()?;
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok::<_, VtError>(name)
            })?;
        }
        Ok::<_, DemoError>(scope.result(DemoError::Lookup))
    })??;
    println!("First mirror to answer: {}", mirror);

    // Executor: one thread per task
    let exec = threads.executor_service();
    let handles = (0..4_u32)
        .map(|i| exec.submit(move || vthread::current_thread_name().map(|n| format!("{n} -> {i}"))))
        .collect::<Result<Vec<_>, _>>()?;
    for handle in handles {
        println!("  executor task: {}", handle.get()?.unwrap_or_default());
    }
    exec.close();
    println!("Executor terminated: {}", exec.is_terminated());

    Ok(())
}
