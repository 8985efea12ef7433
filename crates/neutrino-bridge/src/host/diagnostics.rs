use std::backtrace::Backtrace;

/// Log target for messages originating in the host.
pub const HOST_TARGET: &str = "host";

/// One-way informational message from the host.
pub fn log_info(text: &str) {
    log::info!(target: HOST_TARGET, "{text}");
}

/// One-way error message from the host, with the renderer-side call stack
/// appended so the two can be correlated.
pub fn log_error(text: &str) {
    log::error!(target: HOST_TARGET, "{text}\nrenderer backtrace:\n{}", Backtrace::force_capture());
}
