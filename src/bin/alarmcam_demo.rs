//! Feeds a synthetic scene through the detector and prints every detection
//! as one JSON line.

use std::error::Error;

use alarmcam_lib::api::{AlarmCamera, AlarmHandler};
use alarmcam_lib::core::motion::{DetectionEvent, DetectorConfig, DetectorError};
use alarmcam_lib::core::video::Frame;
use alarmcam_lib::init_logging;
use log::{info, warn};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const BASE: u8 = 110;
const TICK_MS: u64 = 100;

struct JsonPrinter;

impl AlarmHandler for JsonPrinter {
    fn on_detection(&mut self, event: &DetectionEvent, evidence_errors: &[DetectorError]) {
        for e in evidence_errors {
            warn!("event {}: evidence missing: {}", event.id(), e);
        }
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to serialize event {}: {}", event.id(), e),
        }
    }

    fn on_pause_change(&mut self, paused: bool, remaining_ms: Option<u64>) {
        info!("pause: paused={} remaining_ms={:?}", paused, remaining_ms);
    }
}

/// Static scene; an intruder block walks in from frame 30, the lights come
/// on at frame 80.
fn scene(frame_number: u64) -> Frame {
    let brightness = if frame_number >= 80 { BASE + 70 } else { BASE };
    let mut data = vec![brightness; (WIDTH * HEIGHT) as usize];
    if (30..60).contains(&frame_number) {
        let x0 = 10 + (frame_number - 30) as u32 * 3;
        for y in 40..80 {
            for x in x0..(x0 + 24).min(WIDTH) {
                data[(y * WIDTH + x) as usize] = 230;
            }
        }
    }
    Frame::gray(WIDTH, HEIGHT, data, frame_number * TICK_MS, frame_number)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => DetectorConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => DetectorConfig::default(),
    };
    let mut camera = AlarmCamera::with_config(config)?;
    let mut printer = JsonPrinter;

    camera.start(0);
    for frame_number in 0..120 {
        let now_ms = (frame_number + 1) * TICK_MS;
        camera.push_frame(Some(scene(frame_number)), now_ms, &mut printer);
    }
    camera.stop();

    let stats = camera.stats();
    eprintln!("{}", serde_json::to_string(&stats)?);
    Ok(())
}
