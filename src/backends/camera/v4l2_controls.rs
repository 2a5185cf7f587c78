// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 focus control interface
//!
//! Used by the GStreamer driver when the source is a plain `v4l2src` device
//! and focus cannot be pushed through element properties.

use super::types::{BackendError, BackendResult, FocusMode};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Focus control (manual focus position)
pub const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;
/// Continuous auto focus enable
pub const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;
/// One-shot auto focus trigger (button control)
pub const V4L2_CID_AUTO_FOCUS_START: u32 = V4L2_CID_CAMERA_CLASS_BASE + 28;

const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// Calculated as: (dir << 30) | (size << 16) | ('V' << 8) | nr

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Range information about a V4L2 control
#[derive(Debug, Clone)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub default_value: i32,
    pub flags: u32,
}

impl ControlInfo {
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Map a normalized position in [0, 1] onto the control's range
    pub fn denormalize(&self, normalized: f32) -> i32 {
        let span = (self.maximum - self.minimum) as f32;
        self.minimum + (normalized.clamp(0.0, 1.0) * span).round() as i32
    }

    /// Map a raw control value back to [0, 1]
    pub fn normalize(&self, value: i32) -> f32 {
        let span = self.maximum - self.minimum;
        if span <= 0 {
            return 0.0;
        }
        ((value - self.minimum) as f32 / span as f32).clamp(0.0, 1.0)
    }
}

fn extract_name(bytes: &[u8; 32]) -> String {
    let name_len = bytes.iter().position(|&c| c == 0).unwrap_or(32);
    String::from_utf8_lossy(&bytes[..name_len]).to_string()
}

/// Query if a control exists and get its information
pub fn query_control(device_path: &str, control_id: u32) -> Option<ControlInfo> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL, &mut qctrl as *mut V4l2Queryctrl) };

    if result < 0 {
        return None;
    }

    Some(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

/// Get current value of a control
pub fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_G_CTRL, &mut ctrl as *mut V4l2Control) };

    if result < 0 {
        debug!(device_path, control_id, "Failed to get V4L2 control");
        return None;
    }

    Some(ctrl.value)
}

/// Set value of a control
pub fn set_control(device_path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file = File::open(device_path).map_err(|e| format!("Failed to open device: {}", e))?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };

    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(
            device_path,
            control_id,
            value,
            ?errno,
            "Failed to set V4L2 control"
        );
        return Err(format!("Failed to set control: {}", errno));
    }

    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }

    Ok(())
}

/// Check if a control is available on the device
pub fn has_control(device_path: &str, control_id: u32) -> bool {
    query_control(device_path, control_id)
        .map(|info| !info.is_disabled())
        .unwrap_or(false)
}

/// Apply a focus mode through the V4L2 auto-focus switch
///
/// Auto and Manual both disable continuous focus; Auto then relies on
/// [`trigger_autofocus`].
pub fn set_focus_mode(device_path: &str, mode: FocusMode) -> BackendResult<()> {
    if !has_control(device_path, V4L2_CID_FOCUS_AUTO) {
        return Err(BackendError::ControlFailed(format!(
            "{} has no auto-focus control",
            device_path
        )));
    }
    let value = i32::from(mode == FocusMode::Continuous);
    set_control(device_path, V4L2_CID_FOCUS_AUTO, value).map_err(BackendError::ControlFailed)
}

/// Start a single auto-focus cycle
pub fn trigger_autofocus(device_path: &str) -> BackendResult<()> {
    set_control(device_path, V4L2_CID_AUTO_FOCUS_START, 1).map_err(BackendError::ControlFailed)
}

/// Move the lens to a normalized position
pub fn set_lens_position(device_path: &str, normalized: f32) -> BackendResult<()> {
    let info = query_control(device_path, V4L2_CID_FOCUS_ABSOLUTE).ok_or_else(|| {
        BackendError::ControlFailed(format!("{} has no absolute focus control", device_path))
    })?;
    set_control(device_path, V4L2_CID_FOCUS_ABSOLUTE, info.denormalize(normalized))
        .map_err(BackendError::ControlFailed)
}

/// Read the lens position back, normalized to [0, 1]
pub fn lens_position(device_path: &str) -> Option<f32> {
    let info = query_control(device_path, V4L2_CID_FOCUS_ABSOLUTE)?;
    let value = get_control(device_path, V4L2_CID_FOCUS_ABSOLUTE)?;
    Some(info.normalize(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focus_info(minimum: i32, maximum: i32) -> ControlInfo {
        ControlInfo {
            id: V4L2_CID_FOCUS_ABSOLUTE,
            name: "Focus, Absolute".to_string(),
            minimum,
            maximum,
            default_value: minimum,
            flags: 0,
        }
    }

    #[test]
    fn test_control_id_values() {
        assert_eq!(V4L2_CID_FOCUS_ABSOLUTE, 0x009a090a);
        assert_eq!(V4L2_CID_FOCUS_AUTO, 0x009a090c);
        assert_eq!(V4L2_CID_AUTO_FOCUS_START, 0x009a091c);
    }

    #[test]
    fn test_normalized_position_maps_onto_range() {
        let info = focus_info(0, 1023);
        assert_eq!(info.denormalize(0.0), 0);
        assert_eq!(info.denormalize(1.0), 1023);
        assert_eq!(info.denormalize(2.0), 1023);
        assert!((info.normalize(info.denormalize(0.5)) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_empty_range_normalizes_to_zero() {
        assert_eq!(focus_info(5, 5).normalize(5), 0.0);
    }

    #[test]
    fn test_missing_device_reports_no_control() {
        assert!(!has_control("/dev/picam-does-not-exist", V4L2_CID_FOCUS_AUTO));
        assert!(lens_position("/dev/picam-does-not-exist").is_none());
    }
}
