//! Draw commands for the 2D canvas
//!
//! The render pass only builds a list of these; the browser backend
//! replays them onto a `CanvasRenderingContext2d`.

use glam::Vec2;

/// One canvas operation. Colors are straight RGBA in 0..=1.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    /// Clear the whole surface
    Clear { size: Vec2 },
    /// Bitmap from the image store, drawn into a square
    Image {
        key: String,
        top_left: Vec2,
        size: f32,
    },
    FillCircle {
        center: Vec2,
        radius: f32,
        color: [f32; 4],
    },
    StrokeCircle {
        center: Vec2,
        radius: f32,
        line_width: f32,
        color: [f32; 4],
    },
}

impl DrawCmd {
    pub const fn fill_circle(center: Vec2, radius: f32, color: [f32; 4]) -> Self {
        Self::FillCircle {
            center,
            radius,
            color,
        }
    }
}

/// Scale a color's alpha
pub fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], color[3] * alpha.clamp(0.0, 1.0)]
}

/// CSS `rgba(...)` string for a color
pub fn css_rgba(color: [f32; 4]) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        color[3].clamp(0.0, 1.0)
    )
}

/// Colors for game elements
pub mod colors {
    /// Solid target when its image isn't available (#f44336)
    pub const TARGET_FALLBACK: [f32; 4] = [244.0 / 255.0, 67.0 / 255.0, 54.0 / 255.0, 1.0];
    /// Critical zone marker on fallback targets
    pub const CRITICAL_MARKER: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    /// Background swap burst
    pub const BURST_RING: [f32; 4] = [1.0, 180.0 / 255.0, 80.0 / 255.0, 1.0];
    pub const BURST_SHARD: [f32; 4] = [1.0, 200.0 / 255.0, 80.0 / 255.0, 1.0];
}
