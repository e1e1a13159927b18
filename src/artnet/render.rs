//! Art-Net Output Rendering
//!
//! Turns a canvas frame into per-output DMX byte streams:
//! FPS gate → per-object sample → object correction → white derivation →
//! output correction → channel remap → flatten → delay ring → delta
//! encoding. The UDP sender consumes the result; this module never
//! touches a socket.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use super::channel_map;
use super::correction::{derive_white, Correction};
use super::models::{ArtNetObject, ArtNetOutput};
use crate::frame::Frame;

struct DeltaState {
    last_sent: Vec<u8>,
    ticks_since_full: u32,
}

#[derive(Default)]
pub struct OutputRenderer {
    canvas_width: u32,
    canvas_height: u32,
    last_send: HashMap<String, Instant>,
    delay_buffers: HashMap<String, VecDeque<Vec<u8>>>,
    delta_states: HashMap<String, DeltaState>,
    /// Final bytes per output, retained for the DMX monitor.
    last_frames: HashMap<String, Vec<u8>>,
    frame_counters: HashMap<String, u64>,
}

impl OutputRenderer {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            ..Default::default()
        }
    }

    pub fn update_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_width = width;
        self.canvas_height = height;
    }

    /// Render one tick for every active output whose FPS gate opens.
    /// `now` is injected so pacing is testable against a synthetic clock.
    pub fn render_frame(
        &mut self,
        frame: &Frame,
        objects: &HashMap<String, ArtNetObject>,
        outputs: &HashMap<String, ArtNetOutput>,
        now: Instant,
    ) -> HashMap<String, Vec<u8>> {
        let mut rendered = HashMap::new();

        for (output_id, output) in outputs {
            if !output.active {
                continue;
            }
            if !self.should_send(output_id, output.fps, now) {
                continue;
            }

            let dmx = self.render_output(frame, output, objects);
            let dmx = self.apply_delay(output_id, output.delay_ms, output.fps, dmx);
            let dmx = self.apply_delta(output_id, output, dmx);

            *self.frame_counters.entry(output_id.clone()).or_insert(0) += 1;
            self.last_frames.insert(output_id.clone(), dmx.clone());
            rendered.insert(output_id.clone(), dmx);
        }

        rendered
    }

    /// The FPS gate is the authoritative rate limit: a tick arriving
    /// before `1/fps` has elapsed is silently dropped.
    fn should_send(&mut self, output_id: &str, fps: u32, now: Instant) -> bool {
        if fps == 0 {
            return false;
        }
        let interval = 1.0 / fps as f64;
        match self.last_send.get(output_id) {
            Some(last) if now.duration_since(*last).as_secs_f64() < interval => false,
            _ => {
                self.last_send.insert(output_id.to_string(), now);
                true
            }
        }
    }

    fn render_output(
        &self,
        frame: &Frame,
        output: &ArtNetOutput,
        objects: &HashMap<String, ArtNetObject>,
    ) -> Vec<u8> {
        let output_correction = Correction::from_output(output);
        let mut channels = Vec::new();

        for object_id in &output.assigned_objects {
            let object = match objects.get(object_id) {
                Some(o) => o,
                None => continue,
            };
            let object_correction = Correction::from_object(object);

            for point in &object.points {
                let sampled =
                    frame.sample_canvas(point.x, point.y, self.canvas_width, self.canvas_height);
                let corrected = object_correction.apply(sampled);
                let derived = derive_white(corrected, object);
                let adjusted = apply_output_correction(&derived, &output_correction);
                let mapped = channel_map::map_channels(&adjusted, &object.channel_order);
                channels.extend_from_slice(&mapped);
            }
        }

        channels
    }

    /// Ring buffer sized `ceil(delay_ms · fps / 1000)`. Until the ring
    /// fills, zeros of matching length go out.
    fn apply_delay(&mut self, output_id: &str, delay_ms: u32, fps: u32, dmx: Vec<u8>) -> Vec<u8> {
        if delay_ms == 0 {
            self.delay_buffers.remove(output_id);
            return dmx;
        }

        let delay_frames =
            (((delay_ms as u64 * fps as u64) + 999) / 1000).max(1) as usize;
        let buffer = self
            .delay_buffers
            .entry(output_id.to_string())
            .or_default();

        let len = dmx.len();
        buffer.push_back(dmx);
        if buffer.len() > delay_frames {
            buffer.pop_front().unwrap_or_else(|| vec![0; len])
        } else {
            vec![0; len]
        }
    }

    /// Suppress sub-threshold channel changes between full frames; a full
    /// frame goes out every `full_frame_interval`-th tick to bound
    /// recovery time for nodes that joined late.
    fn apply_delta(&mut self, output_id: &str, output: &ArtNetOutput, dmx: Vec<u8>) -> Vec<u8> {
        if !output.delta_enabled {
            self.delta_states.remove(output_id);
            return dmx;
        }

        let interval = output.full_frame_interval.max(1);
        let threshold = output.delta_threshold;

        let state = self.delta_states.entry(output_id.to_string()).or_insert(DeltaState {
            last_sent: Vec::new(),
            ticks_since_full: 0,
        });

        state.ticks_since_full += 1;
        let scheduled_full = state.ticks_since_full >= interval;
        // A length change (first frame, reconfigured objects) forces a
        // full frame but does not reset the interval cadence, so the
        // interval-th tick is still genuinely full.
        let bootstrap_full = state.last_sent.len() != dmx.len();

        let out = if scheduled_full || bootstrap_full {
            if scheduled_full {
                state.ticks_since_full = 0;
            }
            dmx
        } else {
            dmx.iter()
                .zip(state.last_sent.iter())
                .map(|(&new, &old)| {
                    if (new as i16 - old as i16).unsigned_abs() < threshold as u16 {
                        old
                    } else {
                        new
                    }
                })
                .collect()
        };

        state.last_sent = out.clone();
        out
    }

    pub fn last_frame(&self, output_id: &str) -> Option<&Vec<u8>> {
        self.last_frames.get(output_id)
    }

    pub fn all_last_frames(&self) -> &HashMap<String, Vec<u8>> {
        &self.last_frames
    }

    pub fn frame_count(&self, output_id: &str) -> u64 {
        self.frame_counters.get(output_id).copied().unwrap_or(0)
    }

    pub fn last_send_instant(&self, output_id: &str) -> Option<Instant> {
        self.last_send.get(output_id).copied()
    }

    pub fn reset_output(&mut self, output_id: &str) {
        self.last_send.remove(output_id);
        self.delay_buffers.remove(output_id);
        self.delta_states.remove(output_id);
        self.last_frames.remove(output_id);
        self.frame_counters.remove(output_id);
    }

    pub fn reset_all(&mut self) {
        self.last_send.clear();
        self.delay_buffers.clear();
        self.delta_states.clear();
        self.last_frames.clear();
        self.frame_counters.clear();
    }
}

/// Output-level correction after white derivation: brightness/contrast
/// touch every channel (whites included); the red/green/blue offsets
/// only make sense on the color channels.
fn apply_output_correction(channels: &[u8], correction: &Correction) -> Vec<u8> {
    if correction.is_identity() {
        return channels.to_vec();
    }
    if channels.len() == 3 {
        return correction.apply([channels[0], channels[1], channels[2]]).to_vec();
    }

    let rgb = correction.apply([channels[0], channels[1], channels[2]]);
    let white_only = Correction {
        red: 0,
        green: 0,
        blue: 0,
        ..*correction
    };
    let mut out = rgb.to_vec();
    for &white in &channels[3..] {
        out.push(white_only.apply([white, white, white])[0]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artnet::models::Point;
    use std::time::Duration;

    fn three_point_object() -> ArtNetObject {
        ArtNetObject::new(
            "obj-1",
            "Strip",
            vec![
                Point::new(0.0, 0.0),
                Point::new(960.0, 540.0),
                Point::new(1919.0, 1079.0),
            ],
        )
    }

    fn output_with(objects: &[&str]) -> ArtNetOutput {
        let mut output = ArtNetOutput::new("out-1", "Main", "192.168.1.10");
        output.assigned_objects = objects.iter().map(|s| s.to_string()).collect();
        output
    }

    fn render_once(
        renderer: &mut OutputRenderer,
        frame: &Frame,
        objects: &HashMap<String, ArtNetObject>,
        outputs: &HashMap<String, ArtNetOutput>,
        now: Instant,
    ) -> HashMap<String, Vec<u8>> {
        renderer.render_frame(frame, objects, outputs, now)
    }

    #[test]
    fn constant_frame_yields_expected_dmx_payload() {
        // Scenario S1: three points, RGB order, zero corrections.
        let mut renderer = OutputRenderer::new(1920, 1080);
        let frame = Frame::solid(1920, 1080, [10, 20, 30]);
        let mut objects = HashMap::new();
        objects.insert("obj-1".to_string(), three_point_object());
        let mut outputs = HashMap::new();
        outputs.insert("out-1".to_string(), output_with(&["obj-1"]));

        let rendered = render_once(&mut renderer, &frame, &objects, &outputs, Instant::now());
        assert_eq!(
            rendered["out-1"],
            vec![10, 20, 30, 10, 20, 30, 10, 20, 30]
        );
    }

    #[test]
    fn grb_remap_swaps_payload_channels() {
        // Scenario S2.
        let mut renderer = OutputRenderer::new(1920, 1080);
        let frame = Frame::solid(1920, 1080, [10, 20, 30]);
        let mut object = three_point_object();
        object.channel_order = "GRB".to_string();
        let mut objects = HashMap::new();
        objects.insert("obj-1".to_string(), object);
        let mut outputs = HashMap::new();
        outputs.insert("out-1".to_string(), output_with(&["obj-1"]));

        let rendered = render_once(&mut renderer, &frame, &objects, &outputs, Instant::now());
        assert_eq!(
            rendered["out-1"],
            vec![20, 10, 30, 20, 10, 30, 20, 10, 30]
        );
    }

    #[test]
    fn fps_gate_limits_to_target_rate() {
        // Scenario S6: 1000 ticks over one second at fps 30.
        let mut renderer = OutputRenderer::new(64, 64);
        let frame = Frame::solid(64, 64, [1, 2, 3]);
        let mut objects = HashMap::new();
        objects.insert(
            "obj-1".to_string(),
            ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]),
        );
        let mut outputs = HashMap::new();
        let mut output = output_with(&["obj-1"]);
        output.fps = 30;
        outputs.insert("out-1".to_string(), output);

        let start = Instant::now();
        let mut sent = 0;
        for ms in 0..1000u64 {
            let now = start + Duration::from_millis(ms);
            if !render_once(&mut renderer, &frame, &objects, &outputs, now).is_empty() {
                sent += 1;
            }
        }
        assert!((29..=31).contains(&sent), "sent {} packets", sent);
    }

    #[test]
    fn delay_ring_emits_zeros_until_full() {
        let mut renderer = OutputRenderer::new(64, 64);
        let mut objects = HashMap::new();
        objects.insert(
            "obj-1".to_string(),
            ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]),
        );
        let mut outputs = HashMap::new();
        let mut output = output_with(&["obj-1"]);
        // 100 ms at 30 fps → 3-frame ring.
        output.delay_ms = 100;
        output.fps = 30;
        outputs.insert("out-1".to_string(), output);

        let start = Instant::now();
        let frame = Frame::solid(64, 64, [50, 60, 70]);
        let mut emissions = Vec::new();
        for tick in 0..5u64 {
            let now = start + Duration::from_millis(34 * tick);
            let rendered = render_once(&mut renderer, &frame, &objects, &outputs, now);
            emissions.push(rendered["out-1"].clone());
        }

        // First three ticks fill the ring: zeros out. Then the first
        // real frame surfaces.
        assert_eq!(emissions[0], vec![0, 0, 0]);
        assert_eq!(emissions[1], vec![0, 0, 0]);
        assert_eq!(emissions[2], vec![0, 0, 0]);
        assert_eq!(emissions[3], vec![50, 60, 70]);
        assert_eq!(emissions[4], vec![50, 60, 70]);
    }

    #[test]
    fn delta_suppresses_small_changes_until_full_frame() {
        let mut renderer = OutputRenderer::new(64, 64);
        let mut objects = HashMap::new();
        objects.insert(
            "obj-1".to_string(),
            ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]),
        );
        let mut outputs = HashMap::new();
        let mut output = output_with(&["obj-1"]);
        output.delta_enabled = true;
        output.delta_threshold = 8;
        output.full_frame_interval = 4;
        outputs.insert("out-1".to_string(), output);

        let start = Instant::now();
        let mut tick = 0u64;
        let mut run = |renderer: &mut OutputRenderer, rgb: [u8; 3]| {
            let frame = Frame::solid(64, 64, rgb);
            tick += 1;
            let now = start + Duration::from_millis(34 * tick);
            renderer.render_frame(&frame, &objects, &outputs, now)["out-1"].clone()
        };

        // Tick 1 bootstraps (empty baseline → full) without touching the
        // interval cadence.
        assert_eq!(run(&mut renderer, [100, 100, 100]), vec![100, 100, 100]);
        // +3 is below threshold 8: suppressed to the baseline.
        assert_eq!(run(&mut renderer, [103, 100, 100]), vec![100, 100, 100]);
        // +20 passes.
        assert_eq!(run(&mut renderer, [120, 100, 100]), vec![120, 100, 100]);
        // Tick 4 is the full-frame interval: everything goes out verbatim.
        assert_eq!(run(&mut renderer, [121, 101, 101]), vec![121, 101, 101]);
    }

    #[test]
    fn inactive_output_renders_nothing() {
        let mut renderer = OutputRenderer::new(64, 64);
        let frame = Frame::solid(64, 64, [1, 1, 1]);
        let mut objects = HashMap::new();
        objects.insert(
            "obj-1".to_string(),
            ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]),
        );
        let mut outputs = HashMap::new();
        let mut output = output_with(&["obj-1"]);
        output.active = false;
        outputs.insert("out-1".to_string(), output);

        let rendered = renderer.render_frame(&frame, &objects, &outputs, Instant::now());
        assert!(rendered.is_empty());
    }

    #[test]
    fn object_correction_applies_before_output_correction() {
        let mut renderer = OutputRenderer::new(64, 64);
        let frame = Frame::solid(64, 64, [100, 100, 100]);
        let mut object = ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]);
        object.brightness = 20;
        let mut objects = HashMap::new();
        objects.insert("obj-1".to_string(), object);
        let mut output = output_with(&["obj-1"]);
        output.red = -40;
        let mut outputs = HashMap::new();
        outputs.insert("out-1".to_string(), output);

        let rendered = renderer.render_frame(&frame, &objects, &outputs, Instant::now());
        // 100 + 20 (object) → then output red offset −40 → 80.
        assert_eq!(rendered["out-1"], vec![80, 120, 120]);
    }

    #[test]
    fn last_frames_are_retained_for_the_monitor() {
        let mut renderer = OutputRenderer::new(1920, 1080);
        let frame = Frame::solid(1920, 1080, [10, 20, 30]);
        let mut objects = HashMap::new();
        objects.insert("obj-1".to_string(), three_point_object());
        let mut outputs = HashMap::new();
        outputs.insert("out-1".to_string(), output_with(&["obj-1"]));

        renderer.render_frame(&frame, &objects, &outputs, Instant::now());
        assert_eq!(
            renderer.last_frame("out-1").unwrap(),
            &vec![10, 20, 30, 10, 20, 30, 10, 20, 30]
        );
        assert_eq!(renderer.frame_count("out-1"), 1);
    }
}
