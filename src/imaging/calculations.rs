//! Pure calculation functions for cover-crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Integer arithmetic throughout: ratios are compared by cross-multiplying
//! so that equal aspect ratios never lose a pixel to float rounding.

/// Calculate the resize dimensions that cover a target box.
///
/// If the source is relatively taller than the target (`h/w > th/tw`), width
/// snaps to the target width and height overshoots; otherwise height snaps to
/// the target height and width overshoots. The overshooting edge is floored,
/// and never drops below the target.
///
/// # Examples
/// ```
/// # use wallpress::imaging::calculate_cover_dimensions;
/// // 1080x1920 into 150x200: taller than 3:4, width matches
/// assert_eq!(calculate_cover_dimensions((1080, 1920), (150, 200)), (150, 266));
///
/// // 1000x1250 into 720x960: wider than 3:4, height matches
/// assert_eq!(calculate_cover_dimensions((1000, 1250), (720, 960)), (768, 960));
/// ```
pub fn calculate_cover_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0 as u64, target.1 as u64);

    if src_h * tgt_w > tgt_h * src_w {
        // Source is taller: width matches, height overshoots
        let h = (tgt_w * src_h / src_w).max(tgt_h);
        (target.0, h as u32)
    } else {
        // Source is wider (or equal): height matches, width overshoots
        let w = (tgt_h * src_w / src_h).max(tgt_w);
        (w as u32, target.1)
    }
}

/// Crop rectangle `(left, top, width, height)` centering `target` inside `resized`.
///
/// Offsets use floor division, so an odd surplus leaves the extra pixel on
/// the right/bottom edge.
pub fn center_crop_box(resized: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let left = resized.0.saturating_sub(target.0) / 2;
    let top = resized.1.saturating_sub(target.1) / 2;
    (left, top, target.0, target.1)
}
