//! Canvas 2D backend
//!
//! Replays [`DrawCmd`]s onto the page's canvas.

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use super::draw::{DrawCmd, css_rgba};
use crate::assets::AssetStore;

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        log::info!("Canvas {}x{}", canvas.width(), canvas.height());
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Drawing surface size in canvas pixels
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    pub fn render(&self, cmds: &[DrawCmd], images: &AssetStore<HtmlImageElement>) {
        for cmd in cmds {
            if let Err(e) = self.draw(cmd, images) {
                log::debug!("Draw failed: {e:?}");
            }
        }
    }

    fn draw(&self, cmd: &DrawCmd, images: &AssetStore<HtmlImageElement>) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        match cmd {
            DrawCmd::Clear { size } => {
                ctx.clear_rect(0.0, 0.0, f64::from(size.x), f64::from(size.y));
            }
            DrawCmd::Image {
                key,
                top_left,
                size,
            } => {
                // Bitmap may still be decoding
                if let Some(image) = images.get(key).filter(|img| img.complete()) {
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        image,
                        f64::from(top_left.x),
                        f64::from(top_left.y),
                        f64::from(*size),
                        f64::from(*size),
                    )?;
                }
            }
            DrawCmd::FillCircle {
                center,
                radius,
                color,
            } => {
                ctx.begin_path();
                ctx.set_fill_style_str(&css_rgba(*color));
                ctx.arc(
                    f64::from(center.x),
                    f64::from(center.y),
                    f64::from(radius.max(0.0)),
                    0.0,
                    TAU,
                )?;
                ctx.fill();
            }
            DrawCmd::StrokeCircle {
                center,
                radius,
                line_width,
                color,
            } => {
                ctx.begin_path();
                ctx.set_line_width(f64::from(*line_width));
                ctx.set_stroke_style_str(&css_rgba(*color));
                ctx.arc(
                    f64::from(center.x),
                    f64::from(center.y),
                    f64::from(radius.max(0.0)),
                    0.0,
                    TAU,
                )?;
                ctx.stroke();
            }
        }
        Ok(())
    }
}
