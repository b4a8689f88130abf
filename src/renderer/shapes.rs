//! Draw command generation for targets and effects

use glam::Vec2;

use super::draw::{DrawCmd, colors, with_alpha};
use crate::sim::{Effect, Target};

/// A target: its bitmap if one is ready, else a solid disc with the
/// critical zone marked in white
pub fn target(target: &Target, image_ready: bool, out: &mut Vec<DrawCmd>) {
    if image_ready {
        out.push(DrawCmd::Image {
            key: target.asset_key.clone(),
            top_left: target.pos - Vec2::splat(target.radius),
            size: target.radius * 2.0,
        });
        return;
    }
    out.push(DrawCmd::fill_circle(
        target.pos,
        target.radius,
        colors::TARGET_FALLBACK,
    ));
    out.push(DrawCmd::fill_circle(
        target.pos,
        target.preset.critical_threshold_px,
        colors::CRITICAL_MARKER,
    ));
}

/// Expanding ring plus orbiting shards, centered on the surface
pub fn burst(effect: &Effect, now: f64, surface: Vec2, out: &mut Vec<DrawCmd>) {
    let progress = effect.progress(now);
    if progress >= 1.0 {
        return;
    }
    let eased = progress.clamp(0.0, 1.0) as f32;
    let alpha = (1.0 - eased) * 0.6;
    let center = surface * 0.5;
    let max_radius = surface.max_element() * 0.6;
    let radius = effect.base_radius + max_radius * eased;

    out.push(DrawCmd::StrokeCircle {
        center,
        radius,
        line_width: 6.0 * (1.0 - eased),
        color: with_alpha(effect.stroke, alpha),
    });

    for shard in &effect.shards {
        let angle = shard.angle + eased * shard.spin;
        let pos = center + Vec2::from_angle(angle) * (radius * shard.scale);
        out.push(DrawCmd::fill_circle(
            pos,
            shard.size * (1.0 - eased * 0.5),
            with_alpha(shard.fill, alpha * 0.8),
        ));
    }
}

/// Full frame: clear, targets in spawn order, then effects on top
pub fn scene<'a>(
    surface: Vec2,
    targets: impl IntoIterator<Item = &'a Target>,
    effects: &[Effect],
    now: f64,
    image_ready: impl Fn(&str) -> bool,
) -> Vec<DrawCmd> {
    let mut out = vec![DrawCmd::Clear { size: surface }];
    for t in targets {
        target(t, image_ready(&t.asset_key), &mut out);
    }
    for effect in effects {
        burst(effect, now, surface, &mut out);
    }
    out
}
