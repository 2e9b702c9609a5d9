/// Space below a citation badge, in CSS pixels, under which its preview opens upward.
pub const PREVIEW_FLIP_MARGIN_PX: f64 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewPlacement {
    #[default]
    Below,
    Above,
}

/// Chooses where the hover preview opens relative to its trigger.
pub fn preview_placement(trigger_bottom: f64, viewport_height: f64) -> PreviewPlacement {
    if viewport_height - trigger_bottom < PREVIEW_FLIP_MARGIN_PX {
        PreviewPlacement::Above
    } else {
        PreviewPlacement::Below
    }
}
