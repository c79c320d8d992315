//! Runtime helper for spawning the core's long-running loops.

use crate::observability::events;
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::{Builder, Handle};
use tokio::task::AbortHandle;
use tracing::debug;

const COMPONENT: &str = "task_runtime";

/// Handle on a spawned loop. Dropping it leaves the loop running.
#[derive(Debug)]
pub(crate) struct LoopHandle {
    name: &'static str,
    task: AbortHandle,
}

impl LoopHandle {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) fn stop(&self) {
        self.task.abort();
        debug!(
            event = events::LOOP_STOPPED,
            component = COMPONENT,
            loop_name = self.name,
            "loop stop requested"
        );
    }
}

/// Spawns `run_loop` on the ambient tokio runtime, or on a dedicated single-threaded
/// runtime thread when called outside of one.
pub(crate) fn spawn_loop<Fut>(name: &'static str, run_loop: Fut) -> io::Result<LoopHandle>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        let task = handle.spawn(run_loop).abort_handle();
        debug!(
            event = events::LOOP_SPAWNED,
            component = COMPONENT,
            loop_name = name,
            dedicated_thread = false,
            "loop spawned"
        );
        return Ok(LoopHandle { name, task });
    }

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let join = runtime.spawn(run_loop);
    let task = join.abort_handle();
    thread::Builder::new()
        .name(format!("dtn-{name}"))
        .spawn(move || {
            // Cancellation surfaces as a JoinError here; nothing left to do with it.
            let _ = runtime.block_on(join);
        })?;
    debug!(
        event = events::LOOP_SPAWNED,
        component = COMPONENT,
        loop_name = name,
        dedicated_thread = true,
        "loop spawned"
    );
    Ok(LoopHandle { name, task })
}
