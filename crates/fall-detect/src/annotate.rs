//! Detection overlays

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use video_io::VideoFrame;

use crate::classify::{FallStatus, ScoredDetection};
use crate::detection::BoundingBox;

const FALL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const NORMAL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TRACK_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const BAR_BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

/// Overlays may spill this many pixels past the canvas edge
const MARGIN: i32 = 16;

fn clamp_to_canvas(value: i32, extent: u32) -> i32 {
    let limit = i32::try_from(extent).unwrap_or(i32::MAX).saturating_add(MARGIN);
    value.clamp(-MARGIN, limit)
}

/// Draws boxes, fall markers and score bars onto frame copies
#[derive(Debug, Clone)]
pub struct Annotator {
    /// Box outline thickness in pixels
    pub thickness: u32,
    /// Fall marker radius in pixels
    pub marker_radius: i32,
    /// Score bar height in pixels
    pub bar_height: u32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            thickness: 2,
            marker_radius: 5,
            bar_height: 6,
        }
    }
}

impl Annotator {
    /// Annotated copy of `frame`; the input is left untouched.
    ///
    /// Frames whose buffer does not match their dimensions are copied as-is.
    pub fn annotate(&self, frame: &VideoFrame, people: &[ScoredDetection]) -> VideoFrame {
        let Some(mut canvas) = frame.to_image() else {
            return frame.clone();
        };

        for person in people {
            self.draw_person(&mut canvas, person);
        }

        VideoFrame::from_image(canvas, frame.sequence)
    }

    fn draw_person(&self, canvas: &mut RgbImage, person: &ScoredDetection) {
        let raw = person.detection.bbox;
        let (canvas_width, canvas_height) = canvas.dimensions();
        let bbox = BoundingBox::new(
            clamp_to_canvas(raw.x1, canvas_width),
            clamp_to_canvas(raw.y1, canvas_height),
            clamp_to_canvas(raw.x2, canvas_width),
            clamp_to_canvas(raw.y2, canvas_height),
        );
        let color = match person.status {
            FallStatus::Fall => FALL_COLOR,
            FallStatus::Normal => NORMAL_COLOR,
        };

        let width = bbox.width().max(1);
        let height = bbox.height().max(1);
        for inset in 0..self.thickness.min(width / 2).min(height / 2).max(1) {
            let rect = Rect::at(bbox.x1 + inset as i32, bbox.y1 + inset as i32)
                .of_size((width - 2 * inset).max(1), (height - 2 * inset).max(1));
            draw_hollow_rect_mut(canvas, rect, color);
        }

        if person.status == FallStatus::Fall {
            draw_filled_circle_mut(canvas, (bbox.x1, bbox.y1), self.marker_radius, FALL_COLOR);
        }

        // Score bar under the box, full width = score 1.0
        let bar_y = bbox.y2 + 2;
        draw_filled_rect_mut(canvas, Rect::at(bbox.x1, bar_y).of_size(width, self.bar_height.max(1)), BAR_BACKGROUND);
        let filled = (width as f32 * person.assessment.fall_score.clamp(0.0, 1.0)).round() as u32;
        if filled > 0 {
            draw_filled_rect_mut(canvas, Rect::at(bbox.x1, bar_y).of_size(filled, self.bar_height.max(1)), color);
        }

        // Track tick above the box, offset by track id
        let tick_x = bbox.x1 + (person.detection.track_id.rem_euclid(width as i64)) as i32;
        draw_filled_rect_mut(canvas, Rect::at(tick_x, bbox.y1 - 4).of_size(2, 4), TRACK_COLOR);
    }
}
