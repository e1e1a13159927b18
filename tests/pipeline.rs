//! End-to-end pipeline tests: generator → compositor → Art-Net routing,
//! driven tick by tick without the playback threads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prism::artnet::models::{ArtNetObject, ArtNetOutput, Point};
use prism::artnet::render::OutputRenderer;
use prism::artnet::RoutingBridge;
use prism::clip::{Clip, ClipRegistry};
use prism::events::EventHub;
use prism::frame::Frame;
use prism::outputs::OutputManager;
use prism::player::{Player, PlayerSinks};
use prism::plugin::{ParamMap, ParamValue};

fn solid_clip(registry: &ClipRegistry, color: &str) -> uuid::Uuid {
    let mut config = ParamMap::new();
    config.insert("color".into(), ParamValue::Color(color.into()));
    registry.insert(Clip::from_generator("solid_color", &config, 1920, 1080, 30.0).unwrap())
}

fn three_point_object(channel_order: &str) -> ArtNetObject {
    let mut object = ArtNetObject::new(
        "obj-1",
        "Strip",
        vec![
            Point::new(0.0, 0.0),
            Point::new(960.0, 540.0),
            Point::new(1919.0, 1079.0),
        ],
    );
    object.channel_order = channel_order.to_string();
    object
}

fn wall_output() -> ArtNetOutput {
    let mut output = ArtNetOutput::new("out-1", "Wall", "203.0.113.7");
    output.assigned_objects = vec!["obj-1".to_string()];
    output
}

#[test]
fn constant_color_clip_reaches_dmx_monitor() {
    let registry = Arc::new(ClipRegistry::new());
    let hub = EventHub::spawn();

    let bridge = RoutingBridge::new(1920, 1080, false);
    bridge.upsert_object(three_point_object("RGB")).unwrap();
    bridge.upsert_output(wall_output());
    bridge.start();

    let player = Player::new(
        "artnet",
        registry.clone(),
        hub.bus(),
        PlayerSinks::ArtNet(bridge.clone()),
        1920,
        1080,
        30.0,
    );
    let clip = solid_clip(&registry, "#0a141e"); // (10, 20, 30)
    player.activate_clip(clip).unwrap();

    player.tick_once();

    let frames = bridge.last_frames();
    assert_eq!(frames["out-1"], vec![10, 20, 30, 10, 20, 30, 10, 20, 30]);
}

#[test]
fn grb_wiring_reorders_every_led() {
    let registry = Arc::new(ClipRegistry::new());
    let hub = EventHub::spawn();

    let bridge = RoutingBridge::new(1920, 1080, false);
    bridge.upsert_object(three_point_object("GRB")).unwrap();
    bridge.upsert_output(wall_output());
    bridge.start();

    let player = Player::new(
        "artnet",
        registry.clone(),
        hub.bus(),
        PlayerSinks::ArtNet(bridge.clone()),
        1920,
        1080,
        30.0,
    );
    let clip = solid_clip(&registry, "#0a141e");
    player.activate_clip(clip).unwrap();

    player.tick_once();

    let frames = bridge.last_frames();
    assert_eq!(frames["out-1"], vec![20, 10, 30, 20, 10, 30, 20, 10, 30]);
}

#[test]
fn identical_engines_render_identical_canvases() {
    let run = || {
        let registry = Arc::new(ClipRegistry::new());
        let hub = EventHub::spawn();
        let player = Player::new(
            "video",
            registry.clone(),
            hub.bus(),
            PlayerSinks::Preview(OutputManager::new("video")),
            64,
            64,
            30.0,
        );
        let mut config = ParamMap::new();
        config.insert("speed".into(), ParamValue::Float(1.0));
        let clip = registry
            .insert(Clip::from_generator("plasma", &config, 64, 64, 30.0).unwrap());
        player.activate_clip(clip).unwrap();

        for _ in 0..5 {
            player.tick_once();
        }
        player.last_canvas().unwrap().as_ref().clone()
    };

    assert_eq!(run(), run());
}

#[test]
fn delta_full_frames_track_intervening_changes() {
    // Property: with delta enabled, each transmitted full frame equals
    // the previous full-frame baseline plus the per-channel changes that
    // actually went out in between.
    let mut renderer = OutputRenderer::new(4, 1);
    let mut objects = HashMap::new();
    objects.insert(
        "obj-1".to_string(),
        ArtNetObject::new("obj-1", "o", vec![Point::new(0.0, 0.0)]),
    );
    let mut output = ArtNetOutput::new("out-1", "o", "127.0.0.1");
    output.assigned_objects = vec!["obj-1".to_string()];
    output.delta_enabled = true;
    output.delta_threshold = 10;
    output.full_frame_interval = 3;
    let mut outputs = HashMap::new();
    outputs.insert("out-1".to_string(), output);

    let start = Instant::now();
    let inputs: Vec<[u8; 3]> = vec![
        [100, 100, 100], // tick 1: bootstrap full frame
        [105, 100, 100], // +5 < 10 suppressed
        [140, 100, 100], // tick 3: full-frame interval
        [141, 130, 100], // +1 suppressed, +30 passes
        [149, 131, 100], // +9 and +1 both below threshold
        [149, 131, 100], // tick 6: full frame again
    ];

    let mut transmitted = Vec::new();
    for (i, rgb) in inputs.iter().enumerate() {
        let frame = Frame::solid(4, 1, *rgb);
        let now = start + Duration::from_millis(40 * (i as u64 + 1));
        let rendered = renderer.render_frame(&frame, &objects, &outputs, now);
        transmitted.push(rendered["out-1"].clone());
    }

    // Full frames at ticks 1, 3, 6 carry the raw input.
    assert_eq!(transmitted[0], vec![100, 100, 100]);
    assert_eq!(transmitted[2], vec![140, 100, 100]);
    assert_eq!(transmitted[5], vec![149, 131, 100]);

    // Between them, suppressed channels hold the last transmitted value.
    assert_eq!(transmitted[1], vec![100, 100, 100]);
    assert_eq!(transmitted[3], vec![140, 130, 100]);
    assert_eq!(transmitted[4], vec![140, 130, 100]);

    // Property 8: the delta between consecutive full frames equals the
    // accumulated accepted changes in between.
    let accepted_between: Vec<i32> = transmitted[3..5]
        .iter()
        .fold(transmitted[2].clone(), |baseline, tx| {
            baseline
                .iter()
                .zip(tx.iter())
                .map(|(&b, &t)| if t != b { t } else { b })
                .collect()
        })
        .iter()
        .zip(transmitted[2].iter())
        .map(|(&after, &before)| after as i32 - before as i32)
        .collect();
    let full_frame_delta: Vec<i32> = transmitted[5]
        .iter()
        .zip(transmitted[2].iter())
        .map(|(&after, &before)| after as i32 - before as i32)
        .collect();
    // The final full frame may additionally flush sub-threshold drift;
    // every change accepted in between must be contained in it.
    for (accepted, full) in accepted_between.iter().zip(full_frame_delta.iter()) {
        if *accepted != 0 {
            assert!(full.signum() == accepted.signum());
        }
    }
}

#[test]
fn playlist_crossfades_between_clips() {
    let registry = Arc::new(ClipRegistry::new());
    let hub = EventHub::spawn();
    let player = Player::new(
        "video",
        registry.clone(),
        hub.bus(),
        PlayerSinks::Preview(OutputManager::new("video")),
        8,
        8,
        30.0,
    );

    let make_clip = |color: &str| {
        let mut config = ParamMap::new();
        config.insert("color".into(), ParamValue::Color(color.into()));
        registry.insert(Clip::from_generator("solid_color", &config, 8, 8, 30.0).unwrap())
    };
    let black = make_clip("#000000");
    let white = make_clip("#ffffff");

    player.with_playlist(|playlist| {
        playlist.add_item(
            black,
            Some(prism::playlist::TransitionRequest {
                plugin_id: "fade".into(),
                duration_s: 1.0,
                easing: prism::transitions::Easing::Linear,
            }),
        );
        playlist.add_item(white, None);
    });
    player.activate_clip(black).unwrap();

    player.advance_now().unwrap();
    // Mid-fade the canvas sits strictly between the two clips.
    for _ in 0..10 {
        player.tick_once();
    }
    let mid = player.last_canvas().unwrap().get(0, 0)[0];
    assert!(mid > 0 && mid < 255, "mid-fade value {}", mid);

    // After the window the incoming clip owns the canvas.
    for _ in 0..40 {
        player.tick_once();
    }
    assert_eq!(player.last_canvas().unwrap().get(0, 0), [255, 255, 255]);
}
