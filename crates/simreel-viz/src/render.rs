//! Observation-to-image conversion and metric overlays

use image::imageops::{self, FilterType};
use image::{GenericImage, Rgb, RgbImage};
use plotters::prelude::*;
use serde_json::Value;

use simreel_core::{DepthImage, Frame, Observations, Result, SimError, StepInfo};

/// Tint blended over the border of colour views on collision
const COLLISION_RED: [u8; 3] = [255, 0, 0];
const COLLISION_ALPHA: f32 = 0.4;

/// Build one frame from all visual sensors of an observation.
///
/// Colour sensors come first, then depth sensors, each group in sensor-name
/// order. Every panel is scaled to the height of the first one and the
/// panels are laid out left to right. When `info` reports
/// `collisions.is_collision`, colour panels get a red border.
pub fn observations_to_image(observations: &Observations, info: &StepInfo) -> Result<Frame> {
    let collided = is_collision(info);

    let mut panels: Vec<RgbImage> = observations
        .color_sensors()
        .map(|(_, img)| {
            if collided {
                draw_collision(img)
            } else {
                img.clone()
            }
        })
        .collect();
    panels.extend(observations.depth_sensors().map(|(_, depth)| depth_to_rgb(depth)));

    let Some(first) = panels.first() else {
        return Err(SimError::Render(
            "observation has no colour or depth sensor to draw".to_string(),
        ));
    };
    let target_h = first.height();

    let panels: Vec<RgbImage> = panels
        .into_iter()
        .map(|panel| fit_height(panel, target_h))
        .collect::<Result<_>>()?;

    let total_w: u32 = panels.iter().map(RgbImage::width).sum();
    let mut canvas = RgbImage::new(total_w, target_h);
    let mut x = 0;
    for panel in &panels {
        canvas.copy_from(panel, x, 0)?;
        x += panel.width();
    }
    Ok(canvas)
}

/// Convert a normalised depth image to grey RGB
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn depth_to_rgb(depth: &DepthImage) -> RgbImage {
    RgbImage::from_fn(depth.width(), depth.height(), |x, y| {
        let d = depth.get_pixel(x, y).0[0];
        let d = if d.is_nan() { 0.0 } else { d.clamp(0.0, 1.0) };
        let v = (d * 255.0).round() as u8;
        Rgb([v, v, v])
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fit_height(panel: RgbImage, target_h: u32) -> Result<RgbImage> {
    if panel.width() == 0 || panel.height() == 0 {
        return Err(SimError::Render(format!(
            "cannot draw an empty {}x{} sensor image",
            panel.width(),
            panel.height()
        )));
    }
    if panel.height() == target_h {
        return Ok(panel);
    }
    let scale = f64::from(target_h) / f64::from(panel.height());
    let new_w = (f64::from(panel.width()) * scale).round().max(1.0) as u32;
    Ok(imageops::resize(&panel, new_w, target_h, FilterType::Nearest))
}

fn is_collision(info: &StepInfo) -> bool {
    info.get("collisions")
        .and_then(|c| c.get("is_collision"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Blend a red band over the border of a view
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_collision(view: &RgbImage) -> RgbImage {
    let offset = view.height().div_ceil(15);
    let (w, h) = view.dimensions();
    let mut out = view.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let inside = x >= offset && y >= offset && x + offset < w && y + offset < h;
        if inside {
            continue;
        }
        for (channel, red) in pixel.0.iter_mut().zip(COLLISION_RED) {
            let blended = COLLISION_ALPHA * f32::from(red) + (1.0 - COLLISION_ALPHA) * f32::from(*channel);
            *channel = blended.round() as u8;
        }
    }
    out
}

/// Format step info as overlay lines.
///
/// Nested keys are joined with `.`; numbers and booleans print with two
/// decimals, strings verbatim.
#[must_use]
pub fn format_metric_lines(info: &StepInfo) -> Vec<String> {
    info.flatten()
        .into_iter()
        .map(|(key, value)| match value {
            Value::Number(n) => format!("{key}: {:.2}", n.as_f64().unwrap_or(f64::NAN)),
            Value::Bool(b) => format!("{key}: {:.2}", if b { 1.0 } else { 0.0 }),
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect()
}

/// Draw the step metrics as text in the top-left corner of a frame.
///
/// Returns the frame unchanged when there is nothing to show.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn overlay_frame(frame: &Frame, info: &StepInfo) -> Result<Frame> {
    let lines = format_metric_lines(info);
    if lines.is_empty() {
        return Ok(frame.clone());
    }

    let (width, height) = frame.dimensions();
    let font_px = (height / 24).max(10);
    let line_h = font_px as i32 + 2;
    let mut buffer = frame.clone().into_raw();

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        let style = ("sans-serif", f64::from(font_px)).into_font().color(&WHITE);

        let mut text_w = 0;
        for line in &lines {
            let (w, _) = root.estimate_text_size(line, &style).map_err(overlay_error)?;
            text_w = text_w.max(w);
        }
        let band_h = line_h * lines.len() as i32 + 4;
        root.draw(&Rectangle::new(
            [(0, 0), (text_w as i32 + 8, band_h)],
            BLACK.mix(0.5).filled(),
        ))
        .map_err(overlay_error)?;

        for (i, line) in lines.iter().enumerate() {
            let y = 2 + line_h * i as i32;
            root.draw(&Text::new(line.as_str(), (4, y), style.clone()))
                .map_err(overlay_error)?;
        }
        root.present().map_err(overlay_error)?;
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| SimError::Render("overlay buffer has the wrong size".to_string()))
}

fn overlay_error<E: std::fmt::Display>(err: E) -> SimError {
    SimError::Render(format!("metric overlay failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use serde_json::json;
    use simreel_core::SensorReading;

    fn solid(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn test_panels_are_concatenated() {
        let obs = Observations::new()
            .with("rgb", SensorReading::Color(solid(8, 6, 10)))
            .with("depth", SensorReading::Depth(DepthImage::from_pixel(4, 6, Luma([1.0]))))
            .with("state", SensorReading::Vector(vec![1.0]));

        let frame = observations_to_image(&obs, &StepInfo::new()).unwrap();
        assert_eq!(frame.dimensions(), (12, 6));
        assert_eq!(*frame.get_pixel(0, 0), Rgb([10, 10, 10]));
        assert_eq!(*frame.get_pixel(8, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_panels_scaled_to_first_height() {
        let obs = Observations::new()
            .with("a_rgb", SensorReading::Color(solid(10, 10, 0)))
            .with("b_rgb", SensorReading::Color(solid(10, 20, 0)));

        let frame = observations_to_image(&obs, &StepInfo::new()).unwrap();
        assert_eq!(frame.dimensions(), (15, 10));
    }

    #[test]
    fn test_no_visual_sensor_is_an_error() {
        let obs = Observations::new().with("gps", SensorReading::Vector(vec![0.0, 0.0]));
        assert!(matches!(
            observations_to_image(&obs, &StepInfo::new()),
            Err(SimError::Render(_))
        ));
    }

    #[test]
    fn test_empty_panel_is_an_error() {
        let obs = Observations::new()
            .with("rgb", SensorReading::Color(solid(8, 6, 0)))
            .with("depth", SensorReading::Depth(DepthImage::new(4, 0)));
        assert!(matches!(
            observations_to_image(&obs, &StepInfo::new()),
            Err(SimError::Render(_))
        ));

        let obs = Observations::new().with("rgb", SensorReading::Color(solid(0, 0, 0)));
        assert!(observations_to_image(&obs, &StepInfo::new()).is_err());
    }

    #[test]
    fn test_collision_tints_border() {
        let obs = Observations::new().with("rgb", SensorReading::Color(solid(30, 30, 0)));
        let info = StepInfo::new().with("collisions", json!({"is_collision": true}));

        let frame = observations_to_image(&obs, &info).unwrap();
        assert_eq!(*frame.get_pixel(0, 0), Rgb([102, 0, 0]));
        assert_eq!(*frame.get_pixel(15, 15), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_depth_clamped() {
        let mut depth = DepthImage::new(3, 1);
        depth.put_pixel(0, 0, Luma([-1.0]));
        depth.put_pixel(1, 0, Luma([0.5]));
        depth.put_pixel(2, 0, Luma([7.0]));
        let rgb = depth_to_rgb(&depth);
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [128, 128, 128]);
        assert_eq!(rgb.get_pixel(2, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_metric_lines() {
        let info = StepInfo::new()
            .with("distance_to_goal", 1.23456)
            .with("success", true)
            .with("task", "pick")
            .with("balance", json!({"upright": false}));

        assert_eq!(
            format_metric_lines(&info),
            vec![
                "balance.upright: 0.00".to_string(),
                "distance_to_goal: 1.23".to_string(),
                "success: 1.00".to_string(),
                "task: pick".to_string(),
            ]
        );
    }

    #[test]
    fn test_overlay_draws_metric_band() {
        let frame = solid(320, 240, 128);
        let info = StepInfo::new()
            .with("cart_position", 0.0132)
            .with("pole_angle", -0.021)
            .with("steps", 7)
            .with("balance", json!({"upright": true, "centered": true}));

        let out = overlay_frame(&frame, &info).unwrap();

        assert_eq!(out.dimensions(), frame.dimensions());
        // Translucent black band over the top-left corner
        let corner = out.get_pixel(1, 1).0;
        assert!(corner.iter().all(|&c| c < 128), "band not drawn: {corner:?}");
        let changed = out
            .enumerate_pixels()
            .filter(|(x, y, p)| *x < 160 && *y < 80 && **p != Rgb([128, 128, 128]))
            .count();
        assert!(changed > 0);
        // Far corner is untouched
        assert_eq!(*out.get_pixel(315, 235), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_overlay_without_metrics_is_identity() {
        let frame = solid(16, 16, 42);
        let out = overlay_frame(&frame, &StepInfo::new()).unwrap();
        assert_eq!(out, frame);
    }
}
