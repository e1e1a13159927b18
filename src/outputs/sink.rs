//! Output Sinks and Workers
//!
//! Every output runs in its own worker with a single-slot queue;
//! drop-on-full is the overflow policy, so a stalled surface never
//! backpressures the playback thread. Virtual sinks share the frame by
//! reference; display sinks copy across a process boundary.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::frame::Frame;

/// A destination for composed frames.
pub trait OutputSink: Send {
    fn send_frame(&mut self, frame: &Arc<Frame>) -> Result<(), String>;

    fn cleanup(&mut self) {}
}

/// Memory-only sink: publishes the latest frame by reference for
/// in-process consumers (preview fetch, tests).
#[derive(Clone, Default)]
pub struct VirtualSink {
    latest: Arc<Mutex<Option<Arc<Frame>>>>,
}

impl VirtualSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.lock().expect("virtual sink poisoned").clone()
    }
}

impl OutputSink for VirtualSink {
    fn send_frame(&mut self, frame: &Arc<Frame>) -> Result<(), String> {
        // No copy: the receiver is trusted not to mutate.
        *self.latest.lock().expect("virtual sink poisoned") = Some(frame.clone());
        Ok(())
    }
}

/// Display sink: a separate OS process (windowing systems refuse
/// multi-threaded window creation). Frames cross over the child's stdin
/// as a small header plus raw RGB; dropping stdin is the stop signal.
pub struct DisplaySink {
    command: String,
    child: Option<Child>,
}

impl DisplaySink {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            child: None,
        }
    }

    fn ensure_child(&mut self) -> Result<(), String> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new(&self.command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn display process '{}': {}", self.command, e))?;
        info!("[outputs] display process '{}' started (pid {})", self.command, child.id());
        self.child = Some(child);
        Ok(())
    }
}

impl OutputSink for DisplaySink {
    fn send_frame(&mut self, frame: &Arc<Frame>) -> Result<(), String> {
        self.ensure_child()?;
        let child = self.child.as_mut().expect("display child present");
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| "display process stdin closed".to_string())?;

        // Header: width and height as LE u32, then the pixel copy.
        let mut header = [0u8; 8];
        header[0..4].copy_from_slice(&frame.width.to_le_bytes());
        header[4..8].copy_from_slice(&frame.height.to_le_bytes());
        let write = stdin
            .write_all(&header)
            .and_then(|_| stdin.write_all(&frame.pixels));

        if let Err(e) = write {
            // Child died: reap it so the next frame retries a fresh spawn.
            if let Some(mut dead) = self.child.take() {
                let _ = dead.kill();
                let _ = dead.wait();
            }
            return Err(format!("display process write failed: {}", e));
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(mut child) = self.child.take() {
            // Closing stdin is the stop signal; give the process a moment
            // before the hard kill.
            drop(child.stdin.take());
            thread::sleep(Duration::from_millis(100));
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

enum WorkerMessage {
    Frame(Arc<Frame>),
    Stop,
}

/// Worker thread wrapping a sink: single-slot queue, drop-on-full, FPS
/// gate owned by the worker (it owns its transmission cadence). An
/// output that fails mid-run is disabled after one retry.
pub struct OutputWorker {
    tx: mpsc::SyncSender<WorkerMessage>,
    handle: Option<thread::JoinHandle<()>>,
    dropped: Arc<Mutex<u64>>,
}

impl OutputWorker {
    pub fn spawn(output_id: &str, mut sink: Box<dyn OutputSink>, fps: u32) -> Self {
        let (tx, rx) = mpsc::sync_channel::<WorkerMessage>(1);
        let id = output_id.to_string();
        let dropped = Arc::new(Mutex::new(0u64));

        let handle = thread::Builder::new()
            .name(format!("output-{}", id))
            .spawn(move || {
                let interval = if fps > 0 {
                    Duration::from_secs_f64(1.0 / fps as f64)
                } else {
                    Duration::ZERO
                };
                let mut last_send = Instant::now() - interval;
                let mut consecutive_failures = 0u32;

                loop {
                    match rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(WorkerMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(WorkerMessage::Frame(frame)) => {
                            if last_send.elapsed() < interval {
                                continue; // FPS gate, frame dropped
                            }
                            match sink.send_frame(&frame) {
                                Ok(()) => {
                                    consecutive_failures = 0;
                                    last_send = Instant::now();
                                }
                                Err(e) => {
                                    consecutive_failures += 1;
                                    if consecutive_failures == 1 {
                                        warn!("[outputs] '{}' send failed, retrying: {}", id, e);
                                    } else {
                                        error!("[outputs] '{}' disabled after retry: {}", id, e);
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
                sink.cleanup();
            })
            .expect("failed to spawn output worker");

        Self {
            tx,
            handle: Some(handle),
            dropped,
        }
    }

    /// Non-blocking enqueue; on a full slot the frame is dropped.
    pub fn offer(&self, frame: Arc<Frame>) {
        match self.tx.try_send(WorkerMessage::Frame(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                *self.dropped.lock().expect("drop counter poisoned") += 1;
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn dropped_frames(&self) -> u64 {
        *self.dropped.lock().expect("drop counter poisoned")
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn stop(mut self) {
        let _ = self.tx.try_send(WorkerMessage::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
