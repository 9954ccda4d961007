use super::SessionEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Polls and handles events until `stop` is set or the admin sends `/stop`.
/// Every event of a polled batch is handled before stopping.
pub fn run(engine: &mut SessionEngine, stop: &AtomicBool) {
    info!("Waiting for messages...");
    while !stop.load(Ordering::SeqCst) && !engine.stop_requested() {
        let events = match engine.poll_events() {
            Ok(events) => events,
            Err(err) => {
                warn!("Polling failed: {}", err);
                thread::sleep(POLL_RETRY_DELAY);
                continue;
            }
        };
        for event in events {
            engine.handle_event(event);
        }
    }
    info!("Stopped polling");
}
