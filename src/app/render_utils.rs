use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use super::projector::{BadgeTone, BannerTone, NodeTone};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn node_tone_color(tone: NodeTone) -> Color32 {
    match tone {
        NodeTone::Alert => Color32::from_rgb(0xff, 0x44, 0x44),
        NodeTone::Positive => Color32::from_rgb(0x4c, 0xaf, 0x50),
        NodeTone::Neutral => Color32::from_rgb(0x66, 0x66, 0x66),
    }
}

pub(super) fn badge_color(tone: BadgeTone) -> Color32 {
    match tone {
        BadgeTone::Success => Color32::from_rgb(40, 167, 69),
        BadgeTone::Danger => Color32::from_rgb(220, 53, 69),
        BadgeTone::Secondary => Color32::from_rgb(108, 117, 125),
    }
}

pub(super) fn banner_color(tone: BannerTone) -> Color32 {
    match tone {
        BannerTone::Neutral => Color32::from_gray(200),
        BannerTone::Info => Color32::from_rgb(103, 196, 255),
        BannerTone::Success => Color32::from_rgb(92, 200, 110),
        BannerTone::Warning => Color32::from_rgb(246, 194, 80),
        BannerTone::Danger => Color32::from_rgb(240, 96, 96),
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn screen_and_world_transforms_are_inverse() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let pan = vec2(35.0, -12.0);
        let world = vec2(120.0, -48.0);

        let screen = world_to_screen(rect, pan, 1.7, world);
        let back = screen_to_world(rect, pan, 1.7, screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn alert_nodes_stand_out_from_neutral_ones() {
        assert_ne!(node_tone_color(NodeTone::Alert), node_tone_color(NodeTone::Neutral));
        assert_ne!(node_tone_color(NodeTone::Positive), node_tone_color(NodeTone::Neutral));
    }
}
