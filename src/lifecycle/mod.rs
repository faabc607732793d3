use std::sync::Arc;

use crate::detector::{Detector, RustfaceDetector};
use crate::errors::*;
use crate::googly::{Config, Googly, SavedState};
use crate::overlay::RenderTarget;
use crate::pupil::locator::{GradientLocator, PupilLocator};
use crate::webcam::{FrameSource, Webcam};
use crate::{info, error, tags};

pub mod generation;
use generation::Generation;

// Backend builds the pieces of a generation. Swapped out
// in tests so no camera is needed.
pub trait Backend {
	fn open_source(&self, config: &Config, front_facing: bool) -> Result<Box<dyn FrameSource>>;
	fn detector(&self, config: &Config, front_facing: bool) -> Box<dyn Detector>;
	fn locator(&self) -> Arc<dyn PupilLocator>;
}

pub struct DeviceBackend{}

impl Backend for DeviceBackend {
	fn open_source(&self, config: &Config, front_facing: bool) -> Result<Box<dyn FrameSource>> {
		Ok(Box::new(Webcam::open(config, front_facing)?))
	}

	fn detector(&self, config: &Config, front_facing: bool) -> Box<dyn Detector> {
		Box::new(RustfaceDetector::new(&config.model_path,
			config.min_face_size(front_facing), config.max_gap_frames))
	}

	fn locator(&self) -> Arc<dyn PupilLocator> {
		Arc::new(GradientLocator::new())
	}
}

// App owns at most one running generation and moves it
// through start, pause, resume, flip and destroy.
pub struct App {
	g: Arc<Googly>,
	backend: Box<dyn Backend>,
	render: Arc<dyn RenderTarget>,
	front_facing: bool,
	generation: Option<Generation>,
}

impl App {
	pub fn new(g: Arc<Googly>,
		       backend: Box<dyn Backend>,
		       render: Arc<dyn RenderTarget>) -> Self {
		let front_facing = match SavedState::load(&g.config.state_path) {
			Some(state) => {
				info!("restoring saved facing", tags![
					("front_facing", &state.is_front_facing.to_string())
				]);
				state.is_front_facing
			},
			None => g.config.front_facing,
		};

		Self{
			g: g,
			backend: backend,
			render: render,
			front_facing: front_facing,
			generation: None,
		}
	}

	#[cfg(test)]
	pub fn front_facing(&self) -> bool {
		self.front_facing
	}

	pub fn is_running(&self) -> bool {
		self.generation.as_ref().map_or(false, |g| g.is_running())
	}

	// Does nothing if a generation is already running
	pub fn start(&mut self) -> Result<()> {
		if self.is_running() {
			return Ok(());
		}

		let config = &self.g.config;
		let detector = self.backend.detector(config, self.front_facing);
		let source = self.backend.open_source(config, self.front_facing).map_err(|e| {
			error!("couldn't start camera source", tags![
				("front_facing", &self.front_facing.to_string()),
				("error", &e.to_string())
			]);
			e
		})?;

		self.generation = Some(Generation::start(config, self.front_facing, source,
			detector, self.backend.locator(), self.render.clone())?);
		Ok(())
	}

	// Stops both workers, then the detector and camera
	fn release(&mut self) {
		if let Some(mut generation) = self.generation.take() {
			generation.stop();
		}
	}

	pub fn pause(&mut self) {
		info!("pausing");
		self.release();
	}

	pub fn resume(&mut self) -> Result<()> {
		info!("resuming");
		self.start()
	}

	pub fn flip(&mut self) -> Result<()> {
		self.front_facing = !self.front_facing;
		info!("flipping camera", tags![
			("front_facing", &self.front_facing.to_string())
		]);

		let state = SavedState{is_front_facing: self.front_facing};
		if let Err(e) = state.save(&self.g.config.state_path) {
			error!("couldn't save facing", tags![
				("path", &self.g.config.state_path),
				("error", &e.to_string())
			]);
		}

		self.release();
		self.start()
	}

	pub fn destroy(&mut self) {
		if self.generation.is_some() {
			info!("destroying");
		}
		self.release();
	}
}

impl Drop for App {
	fn drop(&mut self) {
		self.destroy();
	}
}
