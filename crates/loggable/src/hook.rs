// hook.rs — Pre-persist customization of log entries.
//
// Invoked exactly once per synthesized entry, after its version is set and
// before it is staged. Deployments use it to stamp extra context onto the
// entry (a request id in the username, a tenant prefix on the class, ...).

use loggable_entry::LogEntry;

/// Customizes a log entry before it is staged.
///
/// Any field may be changed except `id`, which is restored after the hook
/// returns.
pub trait PrePersistHook<O>: Send {
    fn pre_persist(&mut self, entry: &mut LogEntry, object: &O);
}

/// The default hook: leaves entries untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl<O> PrePersistHook<O> for NoopHook {
    fn pre_persist(&mut self, _entry: &mut LogEntry, _object: &O) {}
}

/// Any `FnMut(&mut LogEntry, &O)` closure is a hook.
impl<O, F> PrePersistHook<O> for F
where
    F: FnMut(&mut LogEntry, &O) + Send,
{
    fn pre_persist(&mut self, entry: &mut LogEntry, object: &O) {
        self(entry, object)
    }
}
