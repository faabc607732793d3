use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::errors::*;
use crate::frame::PixelLayout;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
	pub front_device: String,
	pub rear_device: String,
	pub webcam_interval: (u32, u32),
	pub webcam_resolution: (u32, u32),
	pub webcam_format: PixelLayout,
	pub front_facing: bool,
	pub state_path: String,
	pub model_path: String,
	pub min_face_size_front: f32,
	pub min_face_size_rear: f32,
	pub max_gap_frames: u32,
	pub eye_closed_threshold: f32,
	pub jitter_threshold: f32,
	pub poll_interval_ms: u64,
	pub redraw_interval_ms: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self{
			front_device: "/dev/video0".to_string(),
			rear_device: "/dev/video1".to_string(),
			webcam_interval: (1, 30),
			// Low resolution keeps detection fast
			webcam_resolution: (320, 240),
			webcam_format: PixelLayout::Yuyv,
			front_facing: true,
			state_path: "/tmp/googly.state.json".to_string(),
			model_path: "model/seeta_fd_frontal_v1.0.bin".to_string(),
			min_face_size_front: 0.55,
			min_face_size_rear: 0.15,
			max_gap_frames: 3,
			eye_closed_threshold: 0.0,
			jitter_threshold: 30.0,
			poll_interval_ms: 5,
			redraw_interval_ms: 50,
		}
	}
}

impl Config {
	pub fn from_json(raw: &str) -> Result<Self> {
		let config: Config = serde_json::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		let (width, height) = self.webcam_resolution;
		let valid = width > 0 && height > 0
			&& self.webcam_interval.0 > 0
			&& self.webcam_interval.1 > 0
			&& self.poll_interval_ms > 0
			&& self.redraw_interval_ms > 0
			&& self.jitter_threshold.is_finite()
			&& self.eye_closed_threshold.is_finite()
			&& self.min_face_size_front.is_finite()
			&& self.min_face_size_rear.is_finite();

		if !valid {
			return Err(Error::new(ErrorType::InvalidConfig));
		}
		Ok(())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn redraw_interval(&self) -> Duration {
		Duration::from_millis(self.redraw_interval_ms)
	}

	pub fn device(&self, front_facing: bool) -> &str {
		if front_facing {
			&self.front_device
		} else {
			&self.rear_device
		}
	}

	pub fn min_face_size(&self, front_facing: bool) -> f32 {
		if front_facing {
			self.min_face_size_front
		} else {
			self.min_face_size_rear
		}
	}
}

// Facing survives restarts the way a saved instance
// state would.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
	pub is_front_facing: bool,
}

impl SavedState {
	pub fn load(path: &str) -> Option<Self> {
		let raw = fs::read_to_string(path).ok()?;
		serde_json::from_str(&raw).ok()
	}

	pub fn save(&self, path: &str) -> Result<()> {
		let raw = serde_json::to_string(self)?;
		fs::write(path, raw)?;
		Ok(())
	}
}

// Googly is a global config passed around
// all threads.
pub struct Googly {
	pub config: Config,
}

impl Googly {
	pub fn new() -> Result<Self> {
		Ok(Self{
			config: Config::default(),
		})
	}

	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let raw = fs::read_to_string(path)?;
		Ok(Self{
			config: Config::from_json(&raw)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let g = Googly::new().expect("default config");
		assert!(g.config.validate().is_ok());
		assert_eq!(g.config.jitter_threshold, 30.0);
		assert_eq!(g.config.webcam_resolution, (320, 240));
	}

	#[test]
	fn partial_json_falls_back_to_defaults() {
		let config = Config::from_json(
			r#"{"frontFacing": false, "maxGapFrames": 5, "webcamFormat": "NV21"}"#)
			.expect("partial config should parse");
		assert!(!config.front_facing);
		assert_eq!(config.max_gap_frames, 5);
		assert_eq!(config.webcam_format, PixelLayout::Nv21);
		assert_eq!(config.poll_interval_ms, 5);
	}

	#[test]
	fn unknown_keys_and_bad_values_are_rejected() {
		assert!(Config::from_json(r#"{"socketPath": "/tmp/x"}"#).is_err());
		assert!(Config::from_json(r#"{"webcamResolution": [0, 240]}"#).is_err());
		assert!(Config::from_json(r#"{"pollIntervalMs": 0}"#).is_err());
	}

	#[test]
	fn facing_selects_device_and_face_size() {
		let config = Config::default();
		assert_eq!(config.device(true), "/dev/video0");
		assert_eq!(config.device(false), "/dev/video1");
		assert_eq!(config.min_face_size(false), 0.15);
	}

	#[test]
	fn saved_state_round_trips_through_disk() {
		let path = std::env::temp_dir()
			.join(format!("googly-state-{}.json", std::process::id()));
		let path = path.to_string_lossy().to_string();
		SavedState{is_front_facing: false}.save(&path).expect("save");
		assert_eq!(SavedState::load(&path),
			Some(SavedState{is_front_facing: false}));
		let _ = fs::remove_file(&path);
		assert_eq!(SavedState::load(&path), None);
	}
}
