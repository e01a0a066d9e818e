//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Statistics log interval (seconds), 0 disables
    #[serde(default = "default_stats_interval")]
    pub stats_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            port: default_port(),
            stats_interval_seconds: default_stats_interval(),
        }
    }
}

/// Camera source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Pick from the detected platform
    #[default]
    Auto,
    /// `libcamerasrc` (Raspberry Pi camera stack)
    Libcamera,
    /// `v4l2src`
    V4l2,
    /// `avfvideosrc` (macOS)
    Avf,
    /// `videotestsrc`, no hardware needed
    Test,
}

/// Camera capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub source: SourceKind,

    /// Source-specific device selector
    /// - libcamera: camera name, e.g. "/base/soc/i2c0mux/i2c@1/imx219@10"
    /// - v4l2: device node, e.g. "/dev/video0"
    /// - avf: device index, e.g. "0"
    /// Empty lets the source pick its first camera.
    #[serde(default)]
    pub device: String,

    /// Native capture width; zoom crops are computed against it
    #[serde(default = "default_width")]
    pub width: u32,

    /// Native capture height
    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Flip method (optional)
    /// - "vertical-flip"
    /// - "horizontal-flip"
    /// - "rotate-180"
    /// - "rotate-90"
    /// - "rotate-270"
    #[serde(default)]
    pub flip_method: Option<String>,

    /// Burn the wall-clock time into each frame
    #[serde(default = "default_timestamp_overlay")]
    pub timestamp_overlay: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            device: String::new(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            quality: default_quality(),
            flip_method: None,
            timestamp_overlay: default_timestamp_overlay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_stats_interval() -> u64 {
    30
}
fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_fps() -> u32 {
    30
}
fn default_quality() -> u32 {
    85
}
fn default_timestamp_overlay() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

const FLIP_METHODS: &[&str] = &[
    "none",
    "vertical-flip",
    "horizontal-flip",
    "rotate-180",
    "rotate-90",
    "rotate-270",
];

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads `path` if it exists, otherwise returns the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Address the HTTP listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_ip, self.server.port)
    }

    /// Validates configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        let cam = &self.camera;

        // level 5 must still leave at least one pixel
        if cam.width < 5 || cam.height < 5 {
            return Err(ConfigError::Invalid(format!(
                "camera: width and height must be at least 5, got {}x{}",
                cam.width, cam.height
            )));
        }

        if cam.fps == 0 || cam.fps > 120 {
            return Err(ConfigError::Invalid(format!(
                "camera: FPS must be between 1 and 120, got {}",
                cam.fps
            )));
        }

        if cam.quality == 0 || cam.quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "camera: quality must be between 1 and 100, got {}",
                cam.quality
            )));
        }

        if let Some(ref flip) = cam.flip_method {
            if !FLIP_METHODS.contains(&flip.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "camera: unknown flip method {:?}",
                    flip
                )));
            }
        }

        Ok(())
    }
}
