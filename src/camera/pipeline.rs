//! GStreamer launch description for the capture/encode pipeline
//!
//! Kept free of GStreamer types so the layout can be checked without a
//! GStreamer installation.

use tracing::warn;

use super::platform::{resolve_source, PlatformInfo};
use crate::config::{CameraConfig, SourceKind};

/// Element names looked up after parsing
pub const CROP_ELEMENT: &str = "crop";
pub const ENCODER_ELEMENT: &str = "encoder";
pub const SINK_ELEMENT: &str = "sink";

/// strftime layout of the burned-in timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Frame size after the optional flip, in which crop coordinates are given.
///
/// Quarter-turn rotations swap width and height.
pub fn frame_size(camera: &CameraConfig) -> (u32, u32) {
    match camera.flip_method.as_deref() {
        Some("rotate-90") | Some("rotate-270") => (camera.height, camera.width),
        _ => (camera.width, camera.height),
    }
}

/// Builds the full launch string:
/// source, caps, flip, crop, rescale to the fixed output size, overlay,
/// JPEG encoder, appsink.
pub fn describe(camera: &CameraConfig, platform: PlatformInfo) -> String {
    let mut pipeline = source_element(camera, resolve_source(camera.source, platform));

    if let Some(ref flip) = camera.flip_method {
        pipeline.push_str(&flip_element(flip));
    }

    let (width, height) = frame_size(camera);
    pipeline.push_str(&format!(
        " ! videocrop name={crop} ! videoscale ! video/x-raw,width={w},height={h} ! videoconvert",
        crop = CROP_ELEMENT,
        w = width,
        h = height,
    ));

    if camera.timestamp_overlay {
        pipeline.push_str(&format!(
            " ! clockoverlay time-format=\"{}\" halignment=left valignment=top shaded-background=true",
            TIMESTAMP_FORMAT
        ));
    }

    pipeline.push_str(&format!(
        " ! queue max-size-buffers=2 leaky=downstream ! jpegenc name={enc} quality={q} ! appsink name={sink}",
        enc = ENCODER_ELEMENT,
        q = camera.quality,
        sink = SINK_ELEMENT,
    ));

    pipeline
}

fn source_element(camera: &CameraConfig, source: SourceKind) -> String {
    let caps = format!(
        "width={},height={},framerate={}/1",
        camera.width, camera.height, camera.fps
    );

    match source {
        SourceKind::Libcamera => {
            let name = if camera.device.is_empty() {
                String::new()
            } else {
                format!(" camera-name=\"{}\"", camera.device)
            };
            format!("libcamerasrc{} ! video/x-raw,format=NV12,{}", name, caps)
        }
        SourceKind::V4l2 => {
            let device = if camera.device.is_empty() {
                "/dev/video0"
            } else {
                camera.device.as_str()
            };
            format!("v4l2src device={} ! video/x-raw,{}", device, caps)
        }
        SourceKind::Avf => {
            let index = if camera.device.is_empty() {
                "0"
            } else {
                camera.device.as_str()
            };
            format!("avfvideosrc device-index={} ! video/x-raw,{}", index, caps)
        }
        SourceKind::Test | SourceKind::Auto => {
            format!("videotestsrc is-live=true pattern=ball ! video/x-raw,{}", caps)
        }
    }
}

/// Gets GStreamer flip element
fn flip_element(method: &str) -> String {
    match method {
        "none" => String::new(),
        "vertical-flip" => " ! videoflip video-direction=5".to_string(),
        "horizontal-flip" => " ! videoflip video-direction=4".to_string(),
        "rotate-180" => " ! videoflip video-direction=2".to_string(),
        "rotate-90" => " ! videoflip video-direction=1".to_string(),
        "rotate-270" => " ! videoflip video-direction=3".to_string(),
        _ => {
            warn!(method = %method, "Unknown flip method");
            String::new()
        }
    }
}
