//! Subscriber streaming loop
//!
//! One task per connected viewer. The connection owns the receiving end of
//! `sink`; dropping it is how the connection tells the loop to stop.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::hub::Hub;

/// Keep-alive period used by the server unless configured otherwise.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// First event on every stream; unix seconds
    Hello { ts: i64 },
    /// A published payload, forwarded untouched
    Update(Bytes),
    KeepAlive,
}

/// Subscribe to `form_id` and forward to `sink` until the sink closes.
///
/// The handle is always released before this returns.
pub async fn pump(
    hub: Arc<Hub>,
    form_id: String,
    sink: mpsc::Sender<StreamEvent>,
    keepalive: Duration,
) {
    let mut sub = hub.subscribe(&form_id);
    tracing::info!(form_id = %form_id, subscriber = sub.id(), "live stream opened");

    let hello = StreamEvent::Hello { ts: chrono::Utc::now().timestamp() };
    if sink.send(hello).await.is_ok() {
        let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                _ = sink.closed() => break,
                msg = sub.recv() => match msg {
                    Some(payload) => StreamEvent::Update(payload),
                    None => break,
                },
                _ = ticker.tick() => StreamEvent::KeepAlive,
            };
            if sink.send(event).await.is_err() {
                break;
            }
        }
    }

    hub.unsubscribe(&form_id, &sub);
    tracing::info!(form_id = %form_id, subscriber = sub.id(), "live stream closed");
}
