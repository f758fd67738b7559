//! Per-component log scoping.
//!
//! Components never reach for a global logger. Each one is handed a span at
//! construction and instruments its long-running task with it, so every event
//! it emits carries `svc = <name>`.

use tracing::Span;

/// Span identifying one long-lived service inside the process.
pub fn service_span(name: &'static str) -> Span {
    tracing::info_span!("svc", svc = name)
}
