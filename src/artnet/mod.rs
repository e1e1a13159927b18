//! Art-Net Routing Backend
//!
//! Bridges the compositing engine with the network: samples composed
//! frames at fixture coordinates, renders per-output DMX streams, and
//! emits UDP. The bridge is shared state behind one manager handle: the
//! Art-Net player's sink calls `process_frame` on its own cadence, the
//! control side mutates objects/outputs between ticks.

pub mod channel_map;
pub mod correction;
pub mod models;
pub mod render;
pub mod sender;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, info};

use crate::frame::Frame;
use models::{ArtNetObject, ArtNetOutput};
use render::OutputRenderer;
use sender::ArtNetSender;

#[derive(Clone)]
pub struct RoutingBridge {
    inner: Arc<Mutex<BridgeInner>>,
}

struct BridgeInner {
    objects: HashMap<String, ArtNetObject>,
    outputs: HashMap<String, ArtNetOutput>,
    renderer: OutputRenderer,
    sender: ArtNetSender,
    enabled: bool,
}

impl RoutingBridge {
    pub fn new(canvas_width: u32, canvas_height: u32, broadcast: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BridgeInner {
                objects: HashMap::new(),
                outputs: HashMap::new(),
                renderer: OutputRenderer::new(canvas_width, canvas_height),
                sender: ArtNetSender::new(broadcast),
                enabled: false,
            })),
        }
    }

    pub fn start(&self) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard.enabled = true;
        info!("[artnet] routing bridge started");
    }

    /// Disable and black out every active output.
    pub fn stop(&self) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard.enabled = false;
        blackout_inner(&mut guard);
        info!("[artnet] routing bridge stopped");
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().expect("routing bridge poisoned").enabled
    }

    /// One tick: render eligible outputs and send. Called from the
    /// Art-Net player's sink worker; never blocks on the network.
    pub fn process_frame(&self, frame: &Frame) {
        self.process_frame_at(frame, Instant::now());
    }

    pub fn process_frame_at(&self, frame: &Frame, now: Instant) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        if !guard.enabled || guard.outputs.is_empty() {
            return;
        }

        let BridgeInner {
            objects,
            outputs,
            renderer,
            sender,
            ..
        } = &mut *guard;

        let rendered = renderer.render_frame(frame, objects, outputs, now);
        for (output_id, dmx) in rendered {
            if let Some(output) = outputs.get(&output_id) {
                sender.send(output, &dmx);
            }
        }
    }

    /// Full-zero packet to every active output (shutdown step).
    pub fn blackout(&self) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        blackout_inner(&mut guard);
    }

    pub fn update_canvas_size(&self, width: u32, height: u32) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard.renderer.update_canvas_size(width, height);
    }

    // -- object / output management --

    pub fn upsert_object(&self, object: ArtNetObject) -> Result<(), String> {
        if !channel_map::is_valid_format(&object.channel_order) {
            return Err(format!("unknown channel order '{}'", object.channel_order));
        }
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard.objects.insert(object.id.clone(), object);
        Ok(())
    }

    pub fn remove_object(&self, object_id: &str) -> Result<(), String> {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard
            .objects
            .remove(object_id)
            .map(|_| ())
            .ok_or_else(|| format!("unknown object '{}'", object_id))?;
        // Outputs keep dangling assignments out of their render loop.
        for output in guard.outputs.values_mut() {
            output.assigned_objects.retain(|id| id != object_id);
        }
        Ok(())
    }

    pub fn upsert_output(&self, output: ArtNetOutput) {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard.renderer.reset_output(&output.id);
        guard.sender.reset_output(&output.id);
        debug!("[artnet] output '{}' configured", output.name);
        guard.outputs.insert(output.id.clone(), output);
    }

    pub fn remove_output(&self, output_id: &str) -> Result<(), String> {
        let mut guard = self.inner.lock().expect("routing bridge poisoned");
        guard
            .outputs
            .remove(output_id)
            .ok_or_else(|| format!("unknown output '{}'", output_id))?;
        guard.renderer.reset_output(output_id);
        guard.sender.reset_output(output_id);
        Ok(())
    }

    pub fn objects(&self) -> Vec<ArtNetObject> {
        let guard = self.inner.lock().expect("routing bridge poisoned");
        guard.objects.values().cloned().collect()
    }

    pub fn outputs(&self) -> Vec<ArtNetOutput> {
        let guard = self.inner.lock().expect("routing bridge poisoned");
        guard.outputs.values().cloned().collect()
    }

    /// Last DMX bytes per output, for the DMX monitor.
    pub fn last_frames(&self) -> HashMap<String, Vec<u8>> {
        let guard = self.inner.lock().expect("routing bridge poisoned");
        guard.renderer.all_last_frames().clone()
    }

    pub fn last_send_instant(&self, output_id: &str) -> Option<Instant> {
        let guard = self.inner.lock().expect("routing bridge poisoned");
        guard.renderer.last_send_instant(output_id)
    }
}

fn blackout_inner(inner: &mut BridgeInner) {
    let BridgeInner {
        objects,
        outputs,
        sender,
        ..
    } = inner;
    for output in outputs.values().filter(|o| o.active) {
        let channels: usize = output
            .assigned_objects
            .iter()
            .filter_map(|id| objects.get(id))
            .map(|o| o.points.len() * channel_map::channel_count(&o.channel_order))
            .sum();
        sender.blackout(output, channels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::models::Point;

    #[test]
    fn objects_validate_channel_order() {
        let bridge = RoutingBridge::new(1920, 1080, false);
        let mut object = ArtNetObject::new("obj", "o", vec![Point::new(0.0, 0.0)]);
        object.channel_order = "QQQ".into();
        assert!(bridge.upsert_object(object.clone()).is_err());
        object.channel_order = "BGR".into();
        assert!(bridge.upsert_object(object).is_ok());
    }

    #[test]
    fn removing_an_object_unassigns_it() {
        let bridge = RoutingBridge::new(1920, 1080, false);
        bridge
            .upsert_object(ArtNetObject::new("obj", "o", vec![Point::new(0.0, 0.0)]))
            .unwrap();
        let mut output = ArtNetOutput::new("out", "o", "127.0.0.1");
        output.assigned_objects = vec!["obj".into()];
        bridge.upsert_output(output);

        bridge.remove_object("obj").unwrap();
        assert!(bridge.outputs()[0].assigned_objects.is_empty());
        assert!(bridge.remove_object("obj").is_err());
    }

    #[test]
    fn disabled_bridge_renders_nothing() {
        let bridge = RoutingBridge::new(64, 64, false);
        bridge
            .upsert_object(ArtNetObject::new("obj", "o", vec![Point::new(0.0, 0.0)]))
            .unwrap();
        let mut output = ArtNetOutput::new("out", "o", "127.0.0.1");
        output.assigned_objects = vec!["obj".into()];
        bridge.upsert_output(output);

        let frame = Frame::solid(64, 64, [9, 9, 9]);
        bridge.process_frame(&frame);
        assert!(bridge.last_frames().is_empty());

        bridge.start();
        bridge.process_frame(&frame);
        assert_eq!(bridge.last_frames()["out"], vec![9, 9, 9]);
    }
}
