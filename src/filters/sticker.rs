//! Overlay chain construction for sticker elements.

use crate::timeline::StickerPlacement;
use crate::types::TimeSec;

/// Builds the filtergraph fragment that composites one sticker input
/// over the video stream.
///
/// The sticker input is scaled to its placed size, converted to RGBA so
/// opacity can be applied uniformly, then overlaid at its position only
/// inside its timeline window. `input_index` is the ffmpeg input holding
/// the sticker image; `base_label`/`out_label` are the surrounding video
/// stream labels.
pub fn build_sticker_chain(
    input_index: usize,
    base_label: &str,
    out_label: &str,
    placement: &StickerPlacement,
    start: TimeSec,
    end: TimeSec,
) -> String {
    let prepared = format!("stk{}", input_index);
    let opacity = placement.opacity.clamp(0.0, 1.0);

    format!(
        "[{idx}:v]scale={w}:{h},format=rgba,colorchannelmixer=aa={op:.3}[{prep}];\
         [{base}][{prep}]overlay={x:.0}:{y:.0}:enable='between(t,{start:.3},{end:.3})'[{out}]",
        idx = input_index,
        w = placement.size.width,
        h = placement.size.height,
        op = opacity,
        prep = prepared,
        base = base_label,
        x = placement.position.x,
        y = placement.position.y,
        start = start,
        end = end,
        out = out_label,
    )
}
