use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Chore watcher daemon that owns the terminal for its own status view.
    Watcher,
    /// Local development runs that drive a workspace interactively.
    LocalDev,
    /// Batch workflows that should be quiet on the console.
    Batch,
    /// Remote agent execution that runs on a different host.
    RemoteAgent,
}

/// Derive the active execution context from environment overrides.
///
/// The watcher flag wins over the remote agent flag, which wins over the
/// batch flag; with no flags set the context is local development.
pub fn detect_context() -> ExecutionContext {
    if flag_enabled("SHIPWRIGHT_WATCHER") {
        return ExecutionContext::Watcher;
    }

    if flag_enabled("SHIPWRIGHT_REMOTE_AGENT") {
        return ExecutionContext::RemoteAgent;
    }

    if flag_enabled("SHIPWRIGHT_BATCH") {
        return ExecutionContext::Batch;
    }

    ExecutionContext::LocalDev
}

fn flag_enabled(name: &str) -> bool {
    env::var(name)
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
