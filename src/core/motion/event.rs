use log::warn;
use serde::Serialize;

use super::decider::{BoundingBox, Decision};
use super::error::DetectorError;
use super::evidence::{render_marked, EvidenceImage, EvidenceRaster, EvidenceSink};
use crate::core::video::GrayPlane;

/// One detection, handed to collaborators and never mutated afterwards.
///
/// Serializing it yields the numeric record only; evidence images are left
/// to the caller to store however it sees fit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    id: u64,
    timestamp_ms: u64,
    frame_number: u64,
    sudden_light: bool,
    motion: bool,
    ratio: f64,
    mean_diff: f64,
    bbox: Option<BoundingBox>,
    #[serde(skip)]
    before_image: Option<EvidenceImage>,
    #[serde(skip)]
    after_image: Option<EvidenceImage>,
    #[serde(skip)]
    background_image: Option<EvidenceImage>,
    #[serde(skip)]
    marked_image: Option<EvidenceImage>,
}

impl DetectionEvent {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn sudden_light(&self) -> bool {
        self.sudden_light
    }

    pub fn motion(&self) -> bool {
        self.motion
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn mean_diff(&self) -> f64 {
        self.mean_diff
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn before_image(&self) -> Option<&EvidenceImage> {
        self.before_image.as_ref()
    }

    pub fn after_image(&self) -> Option<&EvidenceImage> {
        self.after_image.as_ref()
    }

    pub fn background_image(&self) -> Option<&EvidenceImage> {
        self.background_image.as_ref()
    }

    pub fn marked_image(&self) -> Option<&EvidenceImage> {
        self.marked_image.as_ref()
    }
}

/// Planes captured at trigger time.
#[derive(Debug, Clone, Copy)]
pub struct EvidencePlanes<'a> {
    /// Previous processed frame, or the current one on the first tick.
    pub before: &'a GrayPlane,
    pub after: &'a GrayPlane,
    pub background: &'a GrayPlane,
}

pub struct DetectionEventBuilder {
    event: DetectionEvent,
    errors: Vec<DetectorError>,
}

impl DetectionEventBuilder {
    pub fn new(id: u64, timestamp_ms: u64) -> Self {
        Self {
            event: DetectionEvent {
                id,
                timestamp_ms,
                frame_number: 0,
                sudden_light: false,
                motion: false,
                ratio: 0.0,
                mean_diff: 0.0,
                bbox: None,
                before_image: None,
                after_image: None,
                background_image: None,
                marked_image: None,
            },
            errors: Vec::new(),
        }
    }

    pub fn frame_number(mut self, frame_number: u64) -> Self {
        self.event.frame_number = frame_number;
        self
    }

    pub fn decision(mut self, decision: &Decision) -> Self {
        self.event.sudden_light = decision.sudden_light;
        self.event.motion = decision.motion;
        self.event.bbox = decision.bbox;
        self
    }

    pub fn metrics(mut self, ratio: f64, mean_diff: f64) -> Self {
        self.event.ratio = ratio;
        self.event.mean_diff = mean_diff;
        self
    }

    /// Renders the four evidence images concurrently. A failed image leaves
    /// its field empty and is reported from [`build`](Self::build); it never
    /// blocks the event itself.
    pub fn evidence(
        mut self,
        sink: &dyn EvidenceSink,
        planes: EvidencePlanes<'_>,
        output_size: (u32, u32),
    ) -> Self {
        let bbox = self.event.bbox;
        let ((before, after), (background, marked)) = rayon::join(
            || {
                rayon::join(
                    || sink.render(EvidenceRaster::from_plane(planes.before)),
                    || sink.render(EvidenceRaster::from_plane(planes.after)),
                )
            },
            || {
                rayon::join(
                    || sink.render(EvidenceRaster::from_plane(planes.background)),
                    || {
                        render_marked(planes.after, bbox, output_size)
                            .and_then(|img| sink.render(EvidenceRaster::from_rgb(&img)))
                    },
                )
            },
        );

        self.event.before_image = self.keep(before);
        self.event.after_image = self.keep(after);
        self.event.background_image = self.keep(background);
        self.event.marked_image = self.keep(marked);
        self
    }

    fn keep(&mut self, result: Result<EvidenceImage, DetectorError>) -> Option<EvidenceImage> {
        match result {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("⚠️ DetectionEventBuilder: evidence image dropped: {}", e);
                self.errors.push(e);
                None
            }
        }
    }

    pub fn build(self) -> (DetectionEvent, Vec<DetectorError>) {
        (self.event, self.errors)
    }
}
