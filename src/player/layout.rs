//! Aspect-fit placement of the video surface on the display.

use crate::engine::VideoSize;

/// Display dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
}

/// Size and centered offset of the video surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoLayout {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Fit the video inside the display, preserving its aspect ratio
///
/// A video wider than the display takes the full width, anything else takes
/// the full height. Unknown video dimensions fill the display.
pub fn fit_to_screen(video: VideoSize, display: DisplayMetrics) -> VideoLayout {
    if video.width == 0 || video.height == 0 || display.height == 0 {
        return VideoLayout {
            width: display.width,
            height: display.height,
            x: 0,
            y: 0,
        };
    }

    let video_aspect = video.width as f32 / video.height as f32;
    let screen_aspect = display.width as f32 / display.height as f32;

    let (width, height) = if video_aspect > screen_aspect {
        (display.width, (display.width as f32 / video_aspect) as u32)
    } else {
        ((video_aspect * display.height as f32) as u32, display.height)
    };

    VideoLayout {
        width,
        height,
        x: display.width.saturating_sub(width) / 2,
        y: display.height.saturating_sub(height) / 2,
    }
}
