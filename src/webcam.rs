use rscam::Camera;

use crate::errors::*;
use crate::googly::Config;
use crate::{info, error, tags};

// A raw buffer straight from the sensor, layout given by
// the configured pixel format.
pub struct RawFrame {
	pub data: Vec<u8>,
	pub width: u32,
	pub height: u32,
}

pub trait FrameSource: Send {
	fn capture(&mut self) -> Result<RawFrame>;
}

pub struct Webcam {
	camera: Camera,
	resolution: (u32, u32),
}

impl Webcam {
	pub fn open(config: &Config, front_facing: bool) -> Result<Self> {
		let device = config.device(front_facing);
		info!("opening camera", tags![
			("webcam_device", device),
			("webcam_interval", &format!("{:?}", &config.webcam_interval)),
			("webcam_resolution", &format!("{:?}", &config.webcam_resolution)),
			("front_facing", &front_facing.to_string())
		]);

		let mut camera = Camera::new(device).map_err(|e| {
			error!("couldn't open camera", tags![
				("webcam_device", device),
				("error", &e.to_string())
			]);
			Error::new(ErrorType::CameraUnavailable)
		})?;

		camera.start(&rscam::Config{
			interval: config.webcam_interval,
			resolution: config.webcam_resolution,
			format: config.webcam_format.fourcc(),
			nbuffers: 2,
			field: rscam::FIELD_NONE,
		})?;

		// Check it's working
		for _ in 0..3 {
			camera.capture()?;
		}

		Ok(Self{
			camera: camera,
			resolution: config.webcam_resolution,
		})
	}
}

impl FrameSource for Webcam {
	fn capture(&mut self) -> Result<RawFrame> {
		let frame = self.camera.capture()?;
		Ok(RawFrame{
			data: frame[..].to_vec(),
			width: self.resolution.0,
			height: self.resolution.1,
		})
	}
}

// Camera::drop stops the stream and releases the device
impl Drop for Webcam {
	fn drop(&mut self) {
		info!("releasing camera");
	}
}
