//! Consumer side of the invocation result channel.

use std::time::Duration;

use cronlink_core::InvocationResult;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Which parts of each result get logged.
#[derive(Debug, Clone, Copy)]
pub struct ResponseLog {
    pub print_response: bool,
    pub print_body: bool,
}

/// Log every result until all senders are dropped.
pub async fn drain(mut rx: mpsc::UnboundedReceiver<InvocationResult>, opts: ResponseLog) {
    while let Some(result) = rx.recv().await {
        if opts.print_response {
            log_result(&result, opts.print_body);
        }
    }
    info!("result channel closed");
}

fn log_result(result: &InvocationResult, print_body: bool) {
    let function = qualified(result);
    let topic = result.topic.as_deref().unwrap_or_default();
    let took = format_duration(result.duration);

    if let Some(ref error) = result.error {
        warn!(
            %function,
            %topic,
            status = result.effective_status(),
            duration = %took,
            %error,
            "invocation failed"
        );
        return;
    }

    let status = result.effective_status();
    let body = match result.body {
        Some(ref bytes) if print_body => String::from_utf8_lossy(bytes).into_owned(),
        _ => String::new(),
    };
    if result.is_success() {
        info!(%function, %topic, status, duration = %took, %body, "invoked");
    } else {
        warn!(%function, %topic, status, duration = %took, %body, "invocation returned non-2xx");
    }
}

fn qualified(result: &InvocationResult) -> String {
    if result.namespace.is_empty() {
        result.function.clone()
    } else {
        format!("{}.{}", result.function, result.namespace)
    }
}

/// `120ms` under a second, `2.34s` otherwise.
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
