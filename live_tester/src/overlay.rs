// Rendering of the status window, the face cam and the landmark overlay.
// What to show is decided by `grip_vision::display`; this module only draws it.

use grip_vision::core_modules::landmark::HAND_CONNECTIONS;
use grip_vision::display::{Bgr, DisplayStatus, FACE_CAM_LABEL, FACE_CAM_SIZE, STATUS_WINDOW_SIZE};
use grip_vision::pipeline::{CarriedHand, FrameAnalysis};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size},
    imgproc,
    prelude::*,
};

const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;

fn scalar(color: Bgr) -> Scalar {
    Scalar::new(color.0 as f64, color.1 as f64, color.2 as f64, 0.0)
}

/// Text with a thick black outline underneath.
fn outlined_text(img: &mut Mat, text: &str, origin: Point, scale: f64, color: Scalar, thickness: i32, outline: i32) -> opencv::Result<()> {
    imgproc::put_text(img, text, origin, FONT, scale, Scalar::all(0.0), thickness + outline, imgproc::LINE_AA, false)?;
    imgproc::put_text(img, text, origin, FONT, scale, color, thickness, imgproc::LINE_AA, false)
}

/// The big full-window status card, one centered line per `\n` of the label.
pub fn status_window(status: DisplayStatus) -> opencv::Result<Mat> {
    let (width, height) = STATUS_WINDOW_SIZE;
    let mut canvas = Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, scalar(status.background()))?;

    let scale = 5.0;
    let thickness = 12;
    let line_spacing = 30;

    let lines: Vec<&str> = status.label().split('\n').collect();
    let mut sizes = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut baseline = 0;
        sizes.push(imgproc::get_text_size(line, FONT, scale, thickness, &mut baseline)?);
    }

    let total_height: i32 = sizes.iter().map(|s| s.height).sum::<i32>() + line_spacing * (lines.len() as i32 - 1);
    let mut y = (height - total_height) / 2 + sizes.first().map(|s| s.height).unwrap_or(0);
    for (line, size) in lines.iter().zip(&sizes) {
        let x = (width - size.width) / 2;
        outlined_text(&mut canvas, line, Point::new(x, y), scale, scalar(status.text_color()), thickness, 8)?;
        y += size.height + line_spacing;
    }
    Ok(canvas)
}

/// A shrunken copy of the feed with a label banner across the top.
pub fn face_cam(frame: &Mat) -> opencv::Result<Mat> {
    let (width, height) = FACE_CAM_SIZE;
    let mut small = Mat::default();
    imgproc::resize(frame, &mut small, Size::new(width, height), 0.0, 0.0, imgproc::INTER_LINEAR)?;

    let mut banner = small.try_clone()?;
    imgproc::rectangle(
        &mut banner,
        Rect::new(0, 0, width, 60),
        scalar(DisplayStatus::Performative.background()),
        -1,
        imgproc::LINE_8,
        0,
    )?;
    let mut blended = Mat::default();
    core::add_weighted(&banner, 0.7, &small, 0.3, 0.0, &mut blended, -1)?;

    let scale = 1.2;
    let thickness = 3;
    let mut baseline = 0;
    let size = imgproc::get_text_size(FACE_CAM_LABEL, FONT, scale, thickness, &mut baseline)?;
    let origin = Point::new((width - size.width) / 2, 40);
    outlined_text(&mut blended, FACE_CAM_LABEL, origin, scale, scalar(DisplayStatus::Performative.text_color()), thickness, 2)?;
    Ok(blended)
}

fn to_pixel(frame_size: Size, x: f32, y: f32) -> Point {
    Point::new((x * frame_size.width as f32) as i32, (y * frame_size.height as f32) as i32)
}

/// Skeletons for current hands, dimmed for hands carried over from earlier frames.
pub fn draw_hands<'a>(frame: &mut Mat, hands: impl Iterator<Item = &'a CarriedHand>) -> opencv::Result<()> {
    let size = frame.size()?;
    for carried in hands {
        let (bone, joint) = if carried.frames_since_seen == 0 {
            (Scalar::new(255.0, 255.0, 255.0, 0.0), Scalar::new(0.0, 0.0, 255.0, 0.0))
        } else {
            (Scalar::all(110.0), Scalar::all(110.0))
        };
        let points: Vec<Point> = carried
            .observation
            .landmarks
            .iter()
            .map(|lm| to_pixel(size, lm.x, lm.y))
            .collect();

        for &(a, b) in HAND_CONNECTIONS.iter() {
            imgproc::line(frame, points[a], points[b], bone, 2, imgproc::LINE_AA, 0)?;
        }
        for &p in &points {
            imgproc::circle(frame, p, 4, joint, -1, imgproc::LINE_AA, 0)?;
        }
    }
    Ok(())
}

/// Per-frame debug readout plus the quit hint along the bottom edge.
pub fn draw_status_line(frame: &mut Mat, analysis: &FrameAnalysis) -> opencv::Result<()> {
    let rows = frame.rows();
    let c = &analysis.classification;
    let readout = format!(
        "hands: {}  two-hand: {}  one-hand: {}  phase: {}",
        c.hand_count,
        c.two_hand,
        c.single_hand,
        analysis.phase.as_str()
    );
    let grey = Scalar::all(200.0);
    imgproc::put_text(frame, &readout, Point::new(10, rows - 45), FONT, 0.6, grey, 1, imgproc::LINE_AA, false)?;
    imgproc::put_text(frame, "Press 'q' to quit", Point::new(10, rows - 20), FONT, 0.6, grey, 1, imgproc::LINE_AA, false)?;
    Ok(())
}
