//! Playlist and Transition Runtime
//!
//! Ordered clip items with auto-advance driven by the transport's
//! loop-completed signal (or source EOF), and the clip-to-clip crossfade
//! scheduler: during a transition window both clips render and the
//! transition plugin blends them along an eased progress curve.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::ClipRegistry;
use crate::frame::Frame;
use crate::plugin::{create_transition, EffectContext, ParamMap, ParamValue, Transition};
use crate::transitions::Easing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub plugin_id: String,
    pub duration_s: f64,
    pub easing: Easing,
}

impl Default for TransitionRequest {
    fn default() -> Self {
        Self {
            plugin_id: "fade".to_string(),
            duration_s: 1.0,
            easing: Easing::Linear,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub clip: Uuid,
    /// Requested transition into the *next* item; hard cut when unset.
    pub transition: Option<TransitionRequest>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Playlist {
    pub items: Vec<PlaylistItem>,
    pub active: Option<usize>,
    pub auto_advance: bool,
    pub loop_playlist: bool,
}

/// Outcome of a playlist advance.
pub struct Advance {
    pub outgoing: Option<Uuid>,
    pub incoming: Uuid,
    pub transition: Option<TransitionRequest>,
}

impl Playlist {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            active: None,
            auto_advance: true,
            loop_playlist: true,
        }
    }

    pub fn active_clip(&self) -> Option<Uuid> {
        self.active.and_then(|i| self.items.get(i)).map(|item| item.clip)
    }

    pub fn add_item(&mut self, clip: Uuid, transition: Option<TransitionRequest>) {
        self.items.push(PlaylistItem { clip, transition });
        if self.active.is_none() {
            self.active = Some(0);
        }
    }

    pub fn remove_item(&mut self, index: usize) -> Result<(), String> {
        if index >= self.items.len() {
            return Err(format!("playlist index {} out of range", index));
        }
        self.items.remove(index);
        match self.active {
            Some(_) if self.items.is_empty() => self.active = None,
            Some(a) if a >= index && a > 0 => self.active = Some(a - 1),
            _ => {}
        }
        Ok(())
    }

    /// Step to the next item. Returns `None` at the end of a
    /// non-looping playlist.
    pub fn advance(&mut self) -> Option<Advance> {
        if self.items.is_empty() {
            return None;
        }
        let current = self.active.unwrap_or(0);
        let next = current + 1;
        let next = if next >= self.items.len() {
            if !self.loop_playlist {
                return None;
            }
            0
        } else {
            next
        };
        if next == current && self.items.len() == 1 {
            return None; // single item: nothing to advance to
        }

        let outgoing = self.items.get(current).map(|i| i.clip);
        let transition = self.items.get(current).and_then(|i| i.transition.clone());
        self.active = Some(next);
        Some(Advance {
            outgoing,
            incoming: self.items[next].clip,
            transition,
        })
    }

    pub fn select(&mut self, index: usize) -> Result<Advance, String> {
        if index >= self.items.len() {
            return Err(format!("playlist index {} out of range", index));
        }
        let outgoing = self.active_clip();
        let transition = self
            .active
            .and_then(|i| self.items.get(i))
            .and_then(|i| i.transition.clone());
        self.active = Some(index);
        Ok(Advance {
            outgoing,
            incoming: self.items[index].clip,
            transition,
        })
    }
}

/// A running crossfade. Owned by the player for the duration of the
/// window; the outgoing clip is released when progress reaches 1.
pub struct ActiveTransition {
    plugin: Box<dyn Transition>,
    easing: Easing,
    pub outgoing: Uuid,
    duration_s: f64,
    elapsed_s: f64,
}

impl ActiveTransition {
    pub fn start(request: &TransitionRequest, outgoing: Uuid) -> Result<Self, String> {
        let mut config = ParamMap::new();
        config.insert("duration".into(), ParamValue::Float(request.duration_s));
        config.insert(
            "easing".into(),
            ParamValue::Select(request.easing.name().to_string()),
        );
        let plugin = create_transition(&request.plugin_id, &config)?;
        Ok(Self {
            plugin,
            easing: request.easing,
            outgoing,
            duration_s: request.duration_s.max(0.01),
            elapsed_s: 0.0,
        })
    }

    pub fn progress(&self) -> f32 {
        (self.elapsed_s / self.duration_s).clamp(0.0, 1.0) as f32
    }

    pub fn finished(&self) -> bool {
        self.elapsed_s >= self.duration_s
    }

    /// Blend one tick. `incoming_canvas` is the already-composited frame
    /// of the incoming clip; the outgoing clip renders through the
    /// registry so its own effect chain stays live during the window.
    pub fn blend_tick(
        &mut self,
        registry: &ClipRegistry,
        incoming_canvas: Frame,
        ctx: &EffectContext,
        tick_seconds: f64,
    ) -> Frame {
        self.elapsed_s += tick_seconds;
        let progress = self.easing.apply(self.progress());

        let outgoing_frame = registry
            .tick_clip(&self.outgoing, ctx)
            .map(|f| {
                if f.width != incoming_canvas.width || f.height != incoming_canvas.height {
                    f.resize_nearest(incoming_canvas.width, incoming_canvas.height)
                } else {
                    f
                }
            })
            .unwrap_or_else(|| Frame::new(incoming_canvas.width, incoming_canvas.height));

        self.plugin
            .blend(&outgoing_frame, &incoming_canvas, progress)
            .unwrap_or(incoming_canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Clip;

    fn clip_id() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn first_item_becomes_active() {
        let mut playlist = Playlist::new();
        assert!(playlist.active_clip().is_none());
        let a = clip_id();
        playlist.add_item(a, None);
        assert_eq!(playlist.active_clip(), Some(a));
    }

    #[test]
    fn advance_wraps_when_looping() {
        let mut playlist = Playlist::new();
        let (a, b) = (clip_id(), clip_id());
        playlist.add_item(a, None);
        playlist.add_item(b, None);

        let step = playlist.advance().unwrap();
        assert_eq!(step.outgoing, Some(a));
        assert_eq!(step.incoming, b);

        let step = playlist.advance().unwrap();
        assert_eq!(step.incoming, a);
    }

    #[test]
    fn non_looping_playlist_stops_at_end() {
        let mut playlist = Playlist::new();
        playlist.loop_playlist = false;
        playlist.add_item(clip_id(), None);
        playlist.add_item(clip_id(), None);
        assert!(playlist.advance().is_some());
        assert!(playlist.advance().is_none());
    }

    #[test]
    fn remove_keeps_active_stable() {
        let mut playlist = Playlist::new();
        let (a, b, c) = (clip_id(), clip_id(), clip_id());
        playlist.add_item(a, None);
        playlist.add_item(b, None);
        playlist.add_item(c, None);
        playlist.select(2).unwrap();

        playlist.remove_item(0).unwrap();
        assert_eq!(playlist.active_clip(), Some(c));
        assert!(playlist.remove_item(9).is_err());
    }

    #[test]
    fn transition_window_blends_and_finishes() {
        let registry = ClipRegistry::new();
        let mut config = ParamMap::new();
        config.insert("color".into(), ParamValue::Color("#000000".into()));
        let outgoing =
            registry.insert(Clip::from_generator("solid_color", &config, 8, 8, 30.0).unwrap());

        let request = TransitionRequest {
            plugin_id: "fade".into(),
            duration_s: 1.0,
            easing: Easing::Linear,
        };
        let mut transition = ActiveTransition::start(&request, outgoing).unwrap();
        let ctx = EffectContext::new(0.0, 0, 30.0, 8, 8);

        // Half way through a 1 s fade from black to white.
        let mid = transition.blend_tick(&registry, Frame::solid(8, 8, [255, 255, 255]), &ctx, 0.5);
        assert_eq!(mid.get(0, 0), [128, 128, 128]);
        assert!(!transition.finished());

        let end = transition.blend_tick(&registry, Frame::solid(8, 8, [255, 255, 255]), &ctx, 0.5);
        assert_eq!(end.get(0, 0), [255, 255, 255]);
        assert!(transition.finished());
    }

    #[test]
    fn unknown_transition_plugin_is_an_error() {
        let request = TransitionRequest {
            plugin_id: "wipe".into(),
            duration_s: 1.0,
            easing: Easing::Linear,
        };
        assert!(ActiveTransition::start(&request, clip_id()).is_err());
    }
}
