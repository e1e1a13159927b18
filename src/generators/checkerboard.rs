//! Black and white checkerboard pattern.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "checkerboard",
    name: "Checkerboard",
    description: "Black and white checkerboard with configurable columns and rows",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("columns", "Columns", 8, 1, 64, "Number of columns"),
    ParamSpec::int("rows", "Rows", 8, 1, 64, "Number of rows"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct Checkerboard {
    columns: u32,
    rows: u32,
    duration: u32,
}

impl Checkerboard {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            columns: params["columns"].as_i64().unwrap_or(8).clamp(1, 64) as u32,
            rows: params["rows"].as_i64().unwrap_or(8).clamp(1, 64) as u32,
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }
}

impl Plugin for Checkerboard {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "columns" => {
                self.columns = value.as_i64().unwrap_or(self.columns as i64).clamp(1, 64) as u32;
                true
            }
            "rows" => {
                self.rows = value.as_i64().unwrap_or(self.rows as i64).clamp(1, 64) as u32;
                true
            }
            "duration" => {
                self.duration =
                    value.as_i64().unwrap_or(self.duration as i64).clamp(1, 600) as u32;
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("columns".into(), ParamValue::Int(self.columns as i64));
        map.insert("rows".into(), ParamValue::Int(self.rows as i64));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for Checkerboard {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        _time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        let cell_w = width as f32 / self.columns as f32;
        let cell_h = height as f32 / self.rows as f32;

        for row in 0..self.rows {
            for col in 0..self.columns {
                if (row + col) % 2 != 0 {
                    continue;
                }
                let x_start = (col as f32 * cell_w) as u32;
                let x_end = (((col + 1) as f32 * cell_w) as u32).min(width);
                let y_start = (row as f32 * cell_h) as u32;
                let y_end = (((row + 1) as f32 * cell_h) as u32).min(height);
                for y in y_start..y_end {
                    for x in x_start..x_end {
                        frame.put(x, y, [255, 255, 255]);
                    }
                }
            }
        }

        Ok(frame)
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}
