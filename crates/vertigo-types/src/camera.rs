//! Camera stream parameters.
//!
//! These mirror the parameter object of the camera subsystem, which uses
//! `PascalCase` field names on the wire.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Automatic white balance mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AwbMode {
    /// Fully automatic.
    #[default]
    #[serde(rename = "awb-auto")]
    Auto,
    /// Incandescent lighting.
    #[serde(rename = "awb-incandescent")]
    Incandescent,
    /// Tungsten lighting.
    #[serde(rename = "awb-tungsten")]
    Tungsten,
    /// Fluorescent lighting.
    #[serde(rename = "awb-fluorescent")]
    Fluorescent,
    /// Indoor lighting.
    #[serde(rename = "awb-indoor")]
    Indoor,
    /// Daylight.
    #[serde(rename = "awb-daylight")]
    Daylight,
    /// Cloudy daylight.
    #[serde(rename = "awb-cloudy")]
    Cloudy,
    /// Custom gains.
    #[serde(rename = "awb-custom")]
    Custom,
}

/// Auto focus mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AutoFocusMode {
    /// Lens position is set manually.
    #[serde(rename = "manual-focus")]
    Manual,
    /// Single-shot auto focus.
    #[default]
    #[serde(rename = "automatic-auto-focus")]
    Automatic,
    /// Continuous auto focus.
    #[serde(rename = "continuous-auto-focus")]
    Continuous,
}

/// Auto focus search range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AfRange {
    /// Normal range.
    #[default]
    #[serde(rename = "af-range-normal")]
    Normal,
    /// Close-up range.
    #[serde(rename = "af-range-macro")]
    Macro,
    /// Full range.
    #[serde(rename = "af-range-full")]
    Full,
}

/// Complete camera stream parameter set.
///
/// [`Default`] yields the camera subsystem's defaults; partial requests
/// are merged over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct CameraParameters {
    /// Capture frame rate.
    pub framerate: u32,
    /// Resolution of the recorded file.
    pub file_resolution: Resolution,
    /// Bitrate of the recorded file in kbit/s.
    pub file_bitrate: u32,
    /// Encoder speed preset for the recorded file.
    pub file_speed_preset: String,
    /// Resolution of the live stream.
    pub stream_resolution: Resolution,
    /// Bitrate of the live stream in kbit/s.
    pub stream_bitrate: u32,
    /// RTSP URL the live stream is published to.
    pub rtsp_server_path: String,
    /// White balance mode.
    pub awb_mode: AwbMode,
    /// Focus mode.
    pub auto_focus_mode: AutoFocusMode,
    /// Focus range.
    pub af_range: AfRange,
    /// Lens position in dioptres, used in manual focus.
    pub lens_position: f64,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            framerate: 30,
            file_resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            file_bitrate: 1500,
            file_speed_preset: String::from("fast"),
            stream_resolution: Resolution {
                width: 854,
                height: 480,
            },
            stream_bitrate: 400,
            rtsp_server_path: String::from("rtsp://localhost:8554/camera-live"),
            awb_mode: AwbMode::Auto,
            auto_focus_mode: AutoFocusMode::Automatic,
            af_range: AfRange::Normal,
            lens_position: 0.0,
        }
    }
}

impl CameraParameters {
    /// Overlay a partial JSON object onto the defaults.
    ///
    /// Top-level fields present in `partial` replace the default value
    /// whole; absent fields keep their default.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if an overlaid field has the
    /// wrong shape.
    pub fn merged_over_defaults(
        partial: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut base = match serde_json::to_value(Self::default())? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in partial {
            base.insert(key.clone(), value.clone());
        }
        serde_json::from_value(serde_json::Value::Object(base))
    }
}
