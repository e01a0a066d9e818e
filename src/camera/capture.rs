//! GStreamer-based MJPEG capture

use bytes::Bytes;
use futures_util::StreamExt;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::crop::{CropControl, CropError, CropRegion};
use super::pipeline::{self, CROP_ELEMENT, ENCODER_ELEMENT, SINK_ELEMENT};
use super::platform;
use crate::config::CameraConfig;
use crate::streaming::FrameSink;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("GStreamer error: {0}")]
    Gst(#[from] gst::glib::Error),

    #[error("state change error: {0}")]
    StateChange(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("error from {source_name}: {message}")]
    Bus {
        source_name: String,
        message: String,
    },

    #[error("camera pipeline reached end of stream")]
    EndOfStream,
}

/// Statistics for capture
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    /// Raw frames that reached the encoder
    pub frames_captured: u64,
    /// JPEG frames handed to the sink
    pub frames_encoded: u64,
}

/// GStreamer capture/encode pipeline feeding a [`FrameSink`].
///
/// The pipeline is built up front so its crop control is usable before
/// `start()`. Dropping the capture always returns the pipeline to NULL.
pub struct Capture {
    pipeline: gst::Pipeline,
    crop: Arc<PipelineCrop>,

    // State
    is_running: Arc<AtomicBool>,
    bus_task: Option<JoinHandle<()>>,
    failure_rx: Option<oneshot::Receiver<CaptureError>>,

    // Statistics
    captured_count: Arc<AtomicU64>,
    encoded_count: Arc<AtomicU64>,
}

impl Capture {
    /// Builds the pipeline described by `config` and wires it to `sink`
    pub fn new(config: &CameraConfig, sink: Arc<dyn FrameSink>) -> Result<Self, CaptureError> {
        gst::init()?;

        let desc = pipeline::describe(config, platform::detect_platform());
        debug!(pipeline = %desc, "Creating GStreamer pipeline");

        let pipeline = gst::parse::launch(&desc)?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| CaptureError::Pipeline("Not a pipeline".to_string()))?;

        let crop_element = element(&pipeline, CROP_ELEMENT)?;
        let encoder = element(&pipeline, ENCODER_ELEMENT)?;
        let app_sink = element(&pipeline, SINK_ELEMENT)?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| CaptureError::Pipeline("Not an appsink".to_string()))?;

        let is_running = Arc::new(AtomicBool::new(false));
        let captured_count = Arc::new(AtomicU64::new(0));
        let encoded_count = Arc::new(AtomicU64::new(0));

        // Per-frame hook ahead of the encoder
        let encoder_pad = encoder
            .static_pad("sink")
            .ok_or_else(|| CaptureError::Pipeline("Encoder has no sink pad".to_string()))?;
        let captured = Arc::clone(&captured_count);
        encoder_pad.add_probe(gst::PadProbeType::BUFFER, move |_, _| {
            captured.fetch_add(1, Ordering::Relaxed);
            gst::PadProbeReturn::Ok
        });

        // Keep the appsink queue short: only the newest frame matters
        app_sink.set_property("max-buffers", 2u32);
        app_sink.set_property("drop", true);
        app_sink.set_property("emit-signals", false);
        app_sink.set_property("sync", false);

        let running = Arc::clone(&is_running);
        let encoded = Arc::clone(&encoded_count);
        app_sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink_element| {
                    let sample = sink_element
                        .pull_sample()
                        .map_err(|_| gst::FlowError::Error)?;
                    if !running.load(Ordering::Relaxed) {
                        return Ok(gst::FlowSuccess::Ok);
                    }

                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    // the buffer is owned by the pipeline, so copy once into Bytes
                    sink.write_frame(Bytes::copy_from_slice(map.as_slice()));
                    encoded.fetch_add(1, Ordering::Relaxed);

                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let crop = Arc::new(PipelineCrop {
            element: crop_element,
            size: pipeline::frame_size(config),
        });

        info!(
            source = ?platform::resolve_source(config.source, platform::detect_platform()),
            resolution = %format!("{}x{}", config.width, config.height),
            fps = config.fps,
            quality = config.quality,
            "MJPEG capture pipeline created"
        );

        Ok(Self {
            pipeline,
            crop,
            is_running,
            bus_task: None,
            failure_rx: None,
            captured_count,
            encoded_count,
        })
    }

    /// Crop control bound to this pipeline's `videocrop` element
    pub fn crop_control(&self) -> Arc<dyn CropControl> {
        self.crop.clone()
    }

    /// Starts capture. Must be called inside a tokio runtime (the bus is
    /// watched from a task).
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running.load(Ordering::Relaxed) {
            return Err(CaptureError::Pipeline("Already running".to_string()));
        }

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| CaptureError::Pipeline("Pipeline has no bus".to_string()))?;
        let (failure_tx, failure_rx) = oneshot::channel();
        self.bus_task = Some(tokio::spawn(watch_bus(bus, failure_tx)));
        self.failure_rx = Some(failure_rx);

        self.is_running.store(true, Ordering::Relaxed);
        if let Err(e) = self.pipeline.set_state(gst::State::Playing) {
            self.is_running.store(false, Ordering::Relaxed);
            return Err(CaptureError::StateChange(format!("{:?}", e)));
        }

        info!("MJPEG capture started");
        Ok(())
    }

    /// Resolves when the pipeline reports an error or end of stream.
    ///
    /// Pends forever if capture was never started or the watcher is gone.
    pub async fn failed(&mut self) -> CaptureError {
        match self.failure_rx.as_mut() {
            Some(rx) => match rx.await {
                Ok(err) => err,
                Err(_) => std::future::pending().await,
            },
            None => std::future::pending().await,
        }
    }

    /// Stops capture
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.is_running.swap(false, Ordering::Relaxed) {
            return Ok(());
        }

        info!("Stopping MJPEG capture");

        if let Some(task) = self.bus_task.take() {
            task.abort();
        }

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| CaptureError::StateChange(format!("{:?}", e)))?;

        let stats = self.get_stats();
        info!(
            captured = stats.frames_captured,
            encoded = stats.frames_encoded,
            "MJPEG capture stopped"
        );

        Ok(())
    }

    /// Gets capture statistics
    pub fn get_stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.captured_count.load(Ordering::Relaxed),
            frames_encoded: self.encoded_count.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(task) = self.bus_task.take() {
            task.abort();
        }
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn element(pipeline: &gst::Pipeline, name: &str) -> Result<gst::Element, CaptureError> {
    pipeline
        .by_name(name)
        .ok_or_else(|| CaptureError::Pipeline(format!("No element named '{}'", name)))
}

/// Forwards the first fatal bus message; logs everything else of interest
async fn watch_bus(bus: gst::Bus, failure_tx: oneshot::Sender<CaptureError>) {
    use gst::MessageView;

    let mut messages = bus.stream();
    while let Some(msg) = messages.next().await {
        match msg.view() {
            MessageView::Error(err) => {
                let source_name = msg
                    .src()
                    .map(|s| s.path_string().to_string())
                    .unwrap_or_else(|| "pipeline".to_string());
                error!(
                    source = %source_name,
                    error = %err.error(),
                    debug = ?err.debug(),
                    "Camera pipeline error"
                );
                let _ = failure_tx.send(CaptureError::Bus {
                    source_name,
                    message: err.error().to_string(),
                });
                return;
            }
            MessageView::Eos(_) => {
                warn!("Camera pipeline reached end of stream");
                let _ = failure_tx.send(CaptureError::EndOfStream);
                return;
            }
            MessageView::Warning(w) => {
                warn!(error = %w.error(), debug = ?w.debug(), "Camera pipeline warning");
            }
            _ => {}
        }
    }
}

/// [`CropControl`] backed by a `videocrop` element.
///
/// Converts the region into per-edge trims; `videoscale` downstream keeps the
/// output resolution fixed whatever the crop.
struct PipelineCrop {
    element: gst::Element,
    size: (u32, u32),
}

impl CropControl for PipelineCrop {
    fn pixel_array_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_crop(&self, region: CropRegion) -> Result<(), CropError> {
        let (width, height) = self.size;
        if !region.fits_within(width, height) {
            return Err(CropError::OutOfBounds {
                region,
                width,
                height,
            });
        }

        let left = region.x as i32;
        let top = region.y as i32;
        let right = (width - region.x - region.width) as i32;
        let bottom = (height - region.y - region.height) as i32;
        debug!(left, top, right, bottom, "Updating videocrop");

        self.element.set_property("left", left);
        self.element.set_property("top", top);
        self.element.set_property("right", right);
        self.element.set_property("bottom", bottom);
        Ok(())
    }
}
