//! Engine Events
//!
//! The playback threads publish onto an mpsc channel; a dedicated emitter
//! thread consumes and fans out to subscribers (the external control plane
//! attaches here). Playback never blocks on a slow consumer.

use std::sync::mpsc::{self, Receiver, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Throttled transport position update ("transport.position").
    TransportPosition {
        player: String,
        clip_id: Uuid,
        position: u64,
        in_point: u64,
        out_point: u64,
        total_frames: u64,
        fps: f32,
    },
    /// A transport finished its configured loop count.
    LoopCompleted {
        player: String,
        clip_id: Uuid,
        iteration: u32,
    },
    /// A playlist advanced to another clip.
    ClipActivated { player: String, clip_id: Uuid },
    /// An output sink was disabled after a fault.
    OutputDisabled { output_id: String, reason: String },
}

pub type Subscriber = Box<dyn Fn(&EngineEvent) + Send + 'static>;

/// Cloneable sender half handed to players and transports.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::SyncSender<EngineEvent>,
}

impl EventBus {
    pub fn publish(&self, event: EngineEvent) {
        // Drop on overflow; events are advisory and playback must not stall.
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("[events] bus full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub struct EventHub {
    bus: EventBus,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl EventHub {
    /// Spawn the emitter thread. Capacity bounds how far publishers can
    /// run ahead of the emitter.
    pub fn spawn() -> Self {
        let (tx, rx): (mpsc::SyncSender<EngineEvent>, Receiver<EngineEvent>) =
            mpsc::sync_channel(256);
        let subscribers: Arc<Mutex<Vec<Subscriber>>> = Arc::new(Mutex::new(Vec::new()));

        let subs = subscribers.clone();
        let handle = thread::Builder::new()
            .name("event-emitter".into())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    debug!("[events] {:?}", event);
                    let guard = subs.lock().expect("event subscribers poisoned");
                    for subscriber in guard.iter() {
                        subscriber(&event);
                    }
                }
            })
            .expect("failed to spawn event emitter");

        Self {
            bus: EventBus { tx },
            subscribers,
            handle: Some(handle),
        }
    }

    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .expect("event subscribers poisoned")
            .push(subscriber);
    }

    /// Drop the sender side and wait for the emitter to drain. Callers
    /// stop the players first so no bus clones outlive this call.
    pub fn shutdown(self) {
        let EventHub {
            bus,
            subscribers: _,
            handle,
        } = self;
        drop(bus);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn subscribers_receive_published_events() {
        let hub = EventHub::spawn();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        hub.subscribe(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let bus = hub.bus();
        let clip = Uuid::new_v4();
        for i in 0..3 {
            bus.publish(EngineEvent::LoopCompleted {
                player: "video".into(),
                clip_id: clip,
                iteration: i,
            });
        }

        // Emitter runs on its own thread; give it a moment.
        for _ in 0..50 {
            if count.load(Ordering::SeqCst) == 3 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
