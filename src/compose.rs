//! Video filter graph for the framed composite over the blurred backdrop.
//!
//! Input streams: `0` is the top track, `1` the long video and, when a frame
//! image is used, `frame_input` its still picture. The graph ends in `[vout]`.

use crate::config::LayoutConfig;

fn even(v: f64) -> u32 {
    let v = v.round().max(2.0) as u32;
    v + v % 2
}

/// Long video cropped from both sides and the bottom, fit into the strip box.
fn strip_chain(layout: &LayoutConfig) -> String {
    let keep_w = 1.0 - 2.0 * layout.side_crop;
    let keep_h = 1.0 - layout.bottom_crop;
    let (w, h) = (layout.strip_box.width, layout.strip_box.height);
    format!(
        "[fg]crop=iw*{keep_w:.4}:ih*{keep_h:.4}:iw*{side:.4}:0,\
scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,\
pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1[strip]",
        side = layout.side_crop
    )
}

/// Top track stacked over the strip, padded to the frame size, frame on top.
fn frame_chain(layout: &LayoutConfig, frame_input: Option<usize>) -> String {
    let stack = layout.stack_size();
    let frame = layout.frame_size();
    let mut out = format!(
        "[0:v]setsar=1,pad={sw}:ih:(ow-iw)/2:0:color=black[topw];\
[strip]pad={sw}:ih:(ow-iw)/2:0:color=black[stripw];\
[topw][stripw]vstack=inputs=2:shortest=1[stack];\
[stack]pad={fw}:{fh}:(ow-iw)/2:(oh-ih)/2:color=black",
        sw = stack.width,
        fw = frame.width,
        fh = frame.height
    );
    match frame_input {
        Some(idx) => out.push_str(&format!(
            "[stackpad];\
[{idx}:v]scale={fw}:{fh}:force_original_aspect_ratio=increase,crop={fw}:{fh},format=rgba[frame];\
[stackpad][frame]overlay=0:0[framed]",
            fw = frame.width,
            fh = frame.height
        )),
        None => out.push_str("[framed]"),
    }
    out
}

/// Long video zoomed past the canvas, cropped off-center vertically, blurred.
fn background_chain(layout: &LayoutConfig) -> String {
    let (cw, ch) = (layout.canvas.width, layout.canvas.height);
    let zw = even(cw as f64 * layout.background_zoom);
    let zh = even(ch as f64 * layout.background_zoom);
    let mut out = format!(
        "[bgsrc]scale={zw}:{zh}:force_original_aspect_ratio=increase,\
crop={cw}:{ch}:(iw-{cw})/2:(ih-{ch})*{voff:.4}",
        voff = layout.background_vertical_offset
    );
    if layout.background_blur > 0 {
        out.push_str(&format!(",boxblur={}:1", layout.background_blur));
    }
    out.push_str(",setsar=1[bg]");
    out
}

pub fn composite_filter(layout: &LayoutConfig, fps: u32, frame_input: Option<usize>) -> String {
    [
        "[1:v]split=2[fg][bgsrc]".to_string(),
        strip_chain(layout),
        frame_chain(layout, frame_input),
        background_chain(layout),
        format!("[bg][framed]overlay=(W-w)/2:(H-h)/2:shortest=1,fps={fps},format=yuv420p[vout]"),
    ]
    .join(";")
}
