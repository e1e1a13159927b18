//! Generator Plugins
//!
//! Procedural frame sources. Each generator advertises a `duration` so the
//! playlist can auto-advance; the `GeneratorSource` adapter turns any
//! generator into a seekable `FrameSource` for the transport machine.

pub mod checkerboard;
pub mod circles;
pub mod noise;
pub mod oscillator;
pub mod plasma;
pub mod rainbow_wave;
pub mod solid_color;
pub mod static_picture;

use crate::frame::Frame;
use crate::plugin::{FrameSource, Generator, Plugin};

/// Frame count reported for sources with no finite duration (live-style
/// generators). Large enough that the transport never reaches it.
pub const STREAM_TOTAL_FRAMES: u64 = 1_000_000_000;

/// Adapts a generator to the `FrameSource` contract: a writable frame
/// cursor, frame count derived from the advertised duration, and
/// time = cursor / fps so seeking is frame-accurate.
pub struct GeneratorSource {
    generator: Box<dyn Generator>,
    width: u32,
    height: u32,
    fps: f32,
    cursor: u64,
}

impl GeneratorSource {
    pub fn new(generator: Box<dyn Generator>, width: u32, height: u32, fps: f32) -> Self {
        Self {
            generator,
            width,
            height,
            fps: if fps > 0.0 { fps } else { 30.0 },
            cursor: 0,
        }
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn generator_mut(&mut self) -> &mut dyn Generator {
        self.generator.as_mut()
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl FrameSource for GeneratorSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, String> {
        let time = self.cursor as f64 / self.fps as f64;
        let frame = self
            .generator
            .generate(self.width, self.height, self.cursor, time, self.fps)?;
        self.cursor = self.cursor.saturating_add(1);
        Ok(Some(frame))
    }

    fn total_frames(&self) -> u64 {
        match self.generator.duration_s() {
            Some(seconds) => ((seconds * self.fps as f64).round() as u64).max(1),
            None => STREAM_TOTAL_FRAMES,
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }

    fn current_frame(&self) -> u64 {
        self.cursor
    }

    fn seek(&mut self, frame: u64) {
        self.cursor = frame;
    }

    fn plugin_mut(&mut self) -> Option<&mut dyn Plugin> {
        Some(self.generator.as_mut() as &mut dyn Plugin)
    }

    fn duration_s(&self) -> Option<f64> {
        self.generator.duration_s()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::ParamMap;

    #[test]
    fn generator_source_seeks_and_counts() {
        let generator =
            crate::plugin::create_generator("checkerboard", &ParamMap::new()).unwrap();
        let mut source = GeneratorSource::new(generator, 32, 32, 30.0);

        assert_eq!(source.current_frame(), 0);
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (32, 32));
        assert_eq!(source.current_frame(), 1);

        source.seek(100);
        assert_eq!(source.current_frame(), 100);

        // Default checkerboard duration 10 s at 30 fps.
        assert_eq!(source.total_frames(), 300);
    }
}
