use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{Builder, JoinHandle, sleep};
use std::time::Duration;

use crate::detector::Detector;
use crate::errors::*;
use crate::exchange::FrameDispatcher;
use crate::exchange::mailbox::mailbox;
use crate::face::Eye;
use crate::googly::Config;
use crate::overlay::RenderTarget;
use crate::pupil::PupilWorker;
use crate::pupil::locator::PupilLocator;
use crate::tracker::registry::{FaceRegistry, ProcessorMode};
use crate::webcam::FrameSource;
use crate::{info, error, tags};

// Back off after a failed capture
const CAPTURE_RETRY: Duration = Duration::from_millis(100);

// A Generation is one camera + detector + both pupil
// workers. Generations never overlap: the old one is
// stopped completely before the next is started.
pub struct Generation {
	front_facing: bool,
	// Left then right
	workers: Vec<PupilWorker>,
	stop: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl Generation {
	pub fn start(config: &Config,
		         front_facing: bool,
		         source: Box<dyn FrameSource>,
		         detector: Box<dyn Detector>,
		         locator: Arc<dyn PupilLocator>,
		         render: Arc<dyn RenderTarget>) -> Result<Self> {
		info!("starting generation", tags![
			("front_facing", &front_facing.to_string())
		]);

		let (left_sx, left_rx) = mailbox();
		let (right_sx, right_rx) = mailbox();

		// Workers first so the first frame has somewhere to go
		let mut workers = Vec::with_capacity(2);
		for (eye, rx) in vec![(Eye::Left, left_rx), (Eye::Right, right_rx)] {
			workers.push(PupilWorker::spawn(eye, rx, locator.clone(), render.clone(),
				config.jitter_threshold, config.poll_interval())?);
		}

		let dispatcher = FrameDispatcher::new(detector, config.webcam_format,
			left_sx, right_sx);
		let mode = if front_facing {
			ProcessorMode::LargestFace
		} else {
			ProcessorMode::MultiFace
		};
		let registry = FaceRegistry::new(mode, config.max_gap_frames,
			config.eye_closed_threshold, render);

		let stop = Arc::new(AtomicBool::new(false));
		let s = stop.clone();
		let handle = Builder::new()
			.name("detection".to_string())
			.spawn(move || detection_run(source, dispatcher, registry, s))
			.map_err(|e| {
				error!("couldn't spawn detection thread", tags![
					("error", &e.to_string())
				]);
				Error::new(ErrorType::WorkerSpawn)
			})?;

		Ok(Self{
			front_facing: front_facing,
			workers: workers,
			stop: stop,
			handle: Some(handle),
		})
	}

	pub fn is_running(&self) -> bool {
		self.handle.is_some()
	}

	// Workers go first so none of them can publish into a
	// render target the next generation owns. Then the
	// detection loop is joined, which drops the camera and
	// the detector.
	pub fn stop(&mut self) {
		for worker in self.workers.iter_mut() {
			worker.stop();
		}

		self.stop.store(true, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				error!("detection thread panicked");
			}
			info!("generation stopped", tags![
				("front_facing", &self.front_facing.to_string())
			]);
		}
	}
}

impl Drop for Generation {
	fn drop(&mut self) {
		self.stop();
	}
}

fn detection_run(mut source: Box<dyn FrameSource>,
	             mut dispatcher: FrameDispatcher,
	             mut registry: FaceRegistry,
	             stop: Arc<AtomicBool>) {
	info!("capture started");

	while !stop.load(Ordering::SeqCst) {
		let raw = match source.capture() {
			Ok(raw) => raw,
			Err(e) => {
				error!("couldn't read frame", tags![
					("error", &e.to_string())
				]);
				sleep(CAPTURE_RETRY);
				continue;
			},
		};

		let detections = match dispatcher.on_frame(&raw.data, raw.width, raw.height) {
			Ok(detections) => detections,
			Err(e) => {
				error!("dropping frame", tags![
					("error", &e.to_string())
				]);
				continue;
			},
		};

		let seeds = registry.process(&detections);
		dispatcher.set_seeds(seeds);
	}

	registry.clear();
	info!("capture stopped", tags![
		("frames", &dispatcher.frames_dispatched().to_string()),
		("coalesced", &dispatcher.frames_coalesced().to_string())
	]);
}
