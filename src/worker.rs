//! Named worker-thread spawning.
//!
//! Every long-lived task in the station (hardware loop, scheduler, one
//! per notifier subscriber) runs on its own named thread so logs and
//! debuggers can tell them apart.

use std::thread::JoinHandle;

use log::info;

use crate::error::Error;

/// Stack size for workers that do no deep recursion.
pub const DEFAULT_STACK_KB: usize = 64;

/// Spawn `f` on a thread called `name` with a `stack_kb` KiB stack.
pub fn spawn_worker(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    info!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Spawn(name))
}
