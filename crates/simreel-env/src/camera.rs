//! Headless camera for the cart-pole scene
//!
//! Draws the scene into an in-memory RGB buffer with plotters' bitmap
//! backend; the depth image is derived from the same render.

use image::{Luma, Rgb, RgbImage};
use plotters::prelude::*;

use simreel_core::{DepthImage, Result, SimError};

const SKY: RGBColor = RGBColor(235, 240, 250);
const FLOOR: RGBColor = RGBColor(190, 180, 160);
const TRACK: RGBColor = RGBColor(40, 40, 40);
const CART: RGBColor = RGBColor(30, 60, 120);
const POLE: RGBColor = RGBColor(200, 120, 60);
const AXLE: RGBColor = RGBColor(120, 120, 140);

/// Depth assigned to the cart and pole
const OBJECT_DEPTH: f32 = 0.45;

/// Scene geometry in world units, as seen by the camera
#[derive(Debug, Clone, Copy)]
pub(crate) struct SceneView {
    /// Cart position along the track
    pub x: f64,
    /// Pole angle from vertical (radians, positive leans right)
    pub theta: f64,
    /// Half the pole length
    pub half_length: f64,
    /// Visible half-width of the track
    pub x_threshold: f64,
}

/// Pixel-space layout derived from the image size
struct Layout {
    scale: f64,
    track_y: i32,
    cart_w: i32,
    cart_h: i32,
    pole_w: u32,
}

impl Layout {
    fn new(width: u32, height: u32, view: &SceneView) -> Self {
        let world_width = view.x_threshold * 2.0;
        let cart_w = (f64::from(width) / 12.0).round().max(4.0);
        Self {
            scale: f64::from(width) / world_width,
            track_y: (f64::from(height) * 0.7).round() as i32,
            cart_w: cart_w as i32,
            cart_h: (cart_w * 0.6).round() as i32,
            pole_w: (width / 60).max(2),
        }
    }
}

/// Render the colour view of the scene
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn render_rgb(view: &SceneView, width: u32, height: u32) -> Result<RgbImage> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let layout = Layout::new(width, height, view);

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&SKY).map_err(draw_error)?;

        let w = width as i32;
        let h = height as i32;
        root.draw(&Rectangle::new([(0, layout.track_y), (w, h)], FLOOR.filled()))
            .map_err(draw_error)?;
        root.draw(&PathElement::new(
            vec![(0, layout.track_y), (w, layout.track_y)],
            TRACK.stroke_width(1),
        ))
        .map_err(draw_error)?;

        let cart_x = (view.x * layout.scale + f64::from(width) / 2.0).round() as i32;
        let cart_top = layout.track_y - layout.cart_h;
        root.draw(&Rectangle::new(
            [
                (cart_x - layout.cart_w / 2, cart_top),
                (cart_x + layout.cart_w / 2, layout.track_y),
            ],
            CART.filled(),
        ))
        .map_err(draw_error)?;

        let pole_px = 2.0 * view.half_length * layout.scale;
        let tip = (
            cart_x + (pole_px * view.theta.sin()).round() as i32,
            cart_top - (pole_px * view.theta.cos()).round() as i32,
        );
        root.draw(&PathElement::new(
            vec![(cart_x, cart_top), tip],
            POLE.stroke_width(layout.pole_w),
        ))
        .map_err(draw_error)?;
        root.draw(&Circle::new(
            (cart_x, cart_top),
            layout.pole_w.max(3),
            AXLE.filled(),
        ))
        .map_err(draw_error)?;

        root.present().map_err(draw_error)?;
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| SimError::Render("camera buffer has the wrong size".to_string()))
}

/// Derive a depth image from a colour render.
///
/// Sky is at the far plane, the floor recedes from the bottom edge to the
/// horizon, and anything else is the cart or pole.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn depth_from_rgb(rgb: &RgbImage) -> DepthImage {
    let height = rgb.height();
    let horizon = (f64::from(height) * 0.7).round() as u32;
    let sky = Rgb([SKY.0, SKY.1, SKY.2]);
    let floor = Rgb([FLOOR.0, FLOOR.1, FLOOR.2]);

    DepthImage::from_fn(rgb.width(), height, |x, y| {
        let pixel = rgb.get_pixel(x, y);
        let depth = if *pixel == sky {
            1.0
        } else if *pixel == floor {
            let span = (height - horizon).max(1) as f32;
            let below = y.saturating_sub(horizon) as f32;
            1.0 - 0.5 * (below / span)
        } else {
            OBJECT_DEPTH
        };
        Luma([depth])
    })
}

fn draw_error<E: std::fmt::Display>(err: E) -> SimError {
    SimError::Render(format!("camera draw failed: {err}"))
}
