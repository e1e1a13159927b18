//! Canvas Slices
//!
//! A slice routes a sub-area of the canvas to one output surface:
//! axis-aligned rectangles with optional rotation, arbitrary quads with
//! perspective transform, and an ordered set of masks that zero covered
//! pixels. A composition groups sub-slice placements into one output
//! frame of arbitrary size.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Mask {
    Rect { x: f32, y: f32, w: f32, h: f32 },
    Circle { cx: f32, cy: f32, radius: f32 },
    Polygon { points: Vec<Corner> },
}

impl Mask {
    /// Whether a slice-space pixel is covered (and therefore zeroed).
    fn covers(&self, px: f32, py: f32) -> bool {
        match self {
            Mask::Rect { x, y, w, h } => px >= *x && px < x + w && py >= *y && py < y + h,
            Mask::Circle { cx, cy, radius } => {
                let dx = px - cx;
                let dy = py - cy;
                dx * dx + dy * dy <= radius * radius
            }
            Mask::Polygon { points } => {
                if points.len() < 3 {
                    return false;
                }
                // Even-odd ray cast.
                let mut inside = false;
                let mut j = points.len() - 1;
                for i in 0..points.len() {
                    let (pi, pj) = (&points[i], &points[j]);
                    if (pi.y > py) != (pj.y > py)
                        && px < (pj.x - pi.x) * (py - pi.y) / (pj.y - pi.y) + pi.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Degrees, counter-clockwise, around the slice center.
    #[serde(default)]
    pub rotation: f32,
    /// When set, the slice is the perspective quad spanned by these four
    /// canvas-space corners (top-left, top-right, bottom-right,
    /// bottom-left) instead of the rectangle.
    #[serde(default)]
    pub transform_corners: Option<[Corner; 4]>,
    #[serde(default)]
    pub masks: Vec<Mask>,
}

impl Slice {
    pub fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            w,
            h,
            rotation: 0.0,
            transform_corners: None,
            masks: Vec::new(),
        }
    }

    /// Extract this slice from the canvas. Output size is `w × h`
    /// (rounded); out-of-canvas samples read black.
    pub fn extract(&self, canvas: &Frame) -> Frame {
        let out_w = (self.w.round() as u32).max(1);
        let out_h = (self.h.round() as u32).max(1);
        let mut out = Frame::new(out_w, out_h);

        for oy in 0..out_h {
            for ox in 0..out_w {
                let (sx, sy) = self.source_coords(ox as f32 + 0.5, oy as f32 + 0.5, out_w, out_h);
                let rgb = sample_or_black(canvas, sx, sy);
                out.put(ox, oy, rgb);
            }
        }

        if !self.masks.is_empty() {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let covered = self
                        .masks
                        .iter()
                        .any(|m| m.covers(ox as f32 + 0.5, oy as f32 + 0.5));
                    if covered {
                        out.put(ox, oy, [0, 0, 0]);
                    }
                }
            }
        }

        out
    }

    /// Map a slice-space coordinate to canvas space.
    fn source_coords(&self, ox: f32, oy: f32, out_w: u32, out_h: u32) -> (f32, f32) {
        let u = ox / out_w as f32;
        let v = oy / out_h as f32;

        if let Some(corners) = &self.transform_corners {
            // Bilinear interpolation across the quad; adequate perspective
            // approximation for LED-surface routing.
            let top_x = corners[0].x + (corners[1].x - corners[0].x) * u;
            let top_y = corners[0].y + (corners[1].y - corners[0].y) * u;
            let bottom_x = corners[3].x + (corners[2].x - corners[3].x) * u;
            let bottom_y = corners[3].y + (corners[2].y - corners[3].y) * u;
            return (top_x + (bottom_x - top_x) * v, top_y + (bottom_y - top_y) * v);
        }

        let local_x = u * self.w;
        let local_y = v * self.h;

        if self.rotation.abs() > f32::EPSILON {
            let angle = -self.rotation.to_radians();
            let (sin, cos) = angle.sin_cos();
            let cx = self.w / 2.0;
            let cy = self.h / 2.0;
            let dx = local_x - cx;
            let dy = local_y - cy;
            return (
                self.x + cx + dx * cos - dy * sin,
                self.y + cy + dx * sin + dy * cos,
            );
        }

        (self.x + local_x, self.y + local_y)
    }
}

fn sample_or_black(canvas: &Frame, x: f32, y: f32) -> [u8; 3] {
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    if xi < 0 || yi < 0 || xi >= canvas.width as i64 || yi >= canvas.height as i64 {
        return [0, 0, 0];
    }
    canvas.get(xi as u32, yi as u32)
}

/// One placed sub-slice inside a composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub slice_id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Groups multiple sub-slice placements into one output frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub placements: Vec<Placement>,
}

impl Composition {
    pub fn render(&self, canvas: &Frame, slices: &[Slice]) -> Frame {
        let mut out = Frame::new(self.width.max(1), self.height.max(1));

        for placement in &self.placements {
            let slice = match slices.iter().find(|s| s.id == placement.slice_id) {
                Some(s) => s,
                None => continue,
            };
            let extracted = slice.extract(canvas);
            let w = (placement.w.round() as u32).max(1);
            let h = (placement.h.round() as u32).max(1);
            let scaled = extracted.resize_nearest(w, h);

            let dx = placement.x.round() as i64;
            let dy = placement.y.round() as i64;
            for y in 0..h {
                let ty = dy + y as i64;
                if ty < 0 || ty >= out.height as i64 {
                    continue;
                }
                for x in 0..w {
                    let tx = dx + x as i64;
                    if tx < 0 || tx >= out.width as i64 {
                        continue;
                    }
                    out.put(tx as u32, ty as u32, scaled.get(x, y));
                }
            }
        }

        out
    }
}
