//! Prometheus metrics for the dispatch core.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec, TextEncoder};

/// Inbound updates accepted for processing, labeled by bot kind.
pub static UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "florabot_updates_total",
        "Inbound updates accepted for processing",
        &["bot_kind"]
    )
    .expect("metric registration")
});

/// Turns that ended in a handler fault (session discarded).
pub static DISPATCH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "florabot_dispatch_failures_total",
        "Turns terminated by a handler fault"
    )
    .expect("metric registration")
});

/// Webhook hits whose routing key resolved to no active bot.
pub static ROUTING_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "florabot_routing_misses_total",
        "Webhook updates for unknown or inactive bots"
    )
    .expect("metric registration")
});

/// Outbound deliveries that failed on the primary action.
pub static DELIVERY_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "florabot_delivery_failures_total",
        "Primary outbound actions that failed to deliver"
    )
    .expect("metric registration")
});

/// Renders the default registry in Prometheus text exposition format.
pub fn gather() -> String {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        UPDATES_TOTAL.with_label_values(&["admin"]).inc();
        DISPATCH_FAILURES_TOTAL.inc();

        let text = gather();
        assert!(text.contains("florabot_updates_total"));
        assert!(text.contains("florabot_dispatch_failures_total"));
    }
}
