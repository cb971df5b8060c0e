//! Synchronous access to asynchronous stores.
//!
//! Sync cache calls may come from plain threads, from threads of a
//! multi-threaded Tokio runtime, from `spawn_blocking` threads of a
//! current-thread runtime, or (by mistake) from the scheduler thread of a
//! current-thread runtime. The first three are served; the last one fails fast
//! because parking the only scheduler thread would deadlock it.
//!
//! Tokio does not expose which thread drives a current-thread runtime, so the
//! bridge asks the scheduler: it spawns a marker task and waits up to
//! [`SCHEDULER_HANDSHAKE`] for it to run. A marker that runs proves the
//! scheduler is another, free thread. The marker also records the scheduler's
//! thread id, so later calls from that thread fail without waiting.

use crate::{CacheError, CacheResult};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{mpsc, Mutex, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// How long a sync call on a current-thread runtime waits for the scheduler.
pub const SCHEDULER_HANDSHAKE: Duration = Duration::from_millis(200);

static FALLBACK_RUNTIME: OnceLock<Runtime> = OnceLock::new();
static SCHEDULER_THREADS: OnceLock<Mutex<HashSet<ThreadId>>> = OnceLock::new();

/// Drives `future` to completion from synchronous code.
///
/// # Errors
///
/// - [`CacheError::BlockingInAsyncContext`] when called on the scheduler
///   thread of a current-thread runtime, or when that scheduler does not
///   answer within [`SCHEDULER_HANDSHAKE`].
/// - [`CacheError::Backend`] if the fallback runtime cannot be started.
pub fn block_on<F: Future>(future: F) -> CacheResult<F::Output> {
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => {
                ensure_scheduler_is_free(&handle)?;
                Ok(handle.block_on(future))
            }
            _ => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        },
        Err(_) => Ok(fallback_runtime()?.block_on(future)),
    }
}

fn scheduler_threads() -> &'static Mutex<HashSet<ThreadId>> {
    SCHEDULER_THREADS.get_or_init(|| Mutex::new(HashSet::new()))
}

fn is_scheduler_thread(id: ThreadId) -> bool {
    scheduler_threads()
        .lock()
        .map(|threads| threads.contains(&id))
        .unwrap_or(false)
}

/// Fails unless a thread other than the caller is driving the runtime.
fn ensure_scheduler_is_free(handle: &Handle) -> CacheResult<()> {
    let caller = thread::current().id();
    if is_scheduler_thread(caller) {
        return Err(CacheError::BlockingInAsyncContext);
    }

    let (tx, rx) = mpsc::channel();
    handle.spawn(async move {
        let scheduler = thread::current().id();
        if let Ok(mut threads) = scheduler_threads().lock() {
            threads.insert(scheduler);
        }
        let _ = tx.send(scheduler);
    });

    match rx.recv_timeout(SCHEDULER_HANDSHAKE) {
        Ok(scheduler) if scheduler != caller => Ok(()),
        _ => {
            tracing::debug!("Sync cache call on a busy or blocked current-thread scheduler");
            Err(CacheError::BlockingInAsyncContext)
        }
    }
}

fn fallback_runtime() -> CacheResult<&'static Runtime> {
    if let Some(runtime) = FALLBACK_RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("cachet-blocking")
        .enable_all()
        .build()
        .map_err(|e| CacheError::backend("runtime", format!("Failed to start runtime: {}", e)))?;

    // A concurrent caller may have won the race; its runtime is kept.
    if let Err(extra) = FALLBACK_RUNTIME.set(runtime) {
        extra.shutdown_background();
    }

    FALLBACK_RUNTIME
        .get()
        .ok_or_else(|| CacheError::backend("runtime", "Fallback runtime unavailable"))
}
