use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

use crate::errors::*;
use crate::exchange::mailbox::{Receiver, Recv};
use crate::exchange::msgs::PupilJob;
use crate::face::{Eye, Point};
use crate::overlay::RenderTarget;
use crate::{info, error, tags};

pub mod locator;
use locator::PupilLocator;

// PupilState holds the last accepted pupil for one eye and
// decides what to do with each locator result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PupilState {
	last_good: Option<Point>,
	jitter_threshold: f32,
}

impl PupilState {
	pub fn new(jitter_threshold: f32) -> Self {
		Self{
			last_good: None,
			jitter_threshold: jitter_threshold,
		}
	}

	#[cfg(test)]
	pub fn last_good(&self) -> Option<Point> {
		self.last_good
	}

	// A candidate with both coordinates nonzero is a hit. On a
	// miss the previous pupil is kept unless the eye has moved
	// further than the jitter threshold, in which case x is
	// zeroed and the pupil is hidden.
	pub fn accept(&mut self, candidate: (f32, f32), seed: Point) -> Option<Point> {
		let (cx, cy) = candidate;
		if cx != 0.0 && cy != 0.0 {
			self.last_good = Some(Point::new(cx, cy));
		} else if let Some(last) = self.last_good.as_mut() {
			if (last.x - seed.x).abs() > self.jitter_threshold {
				last.x = 0.0;
			}
		}
		self.last_good
	}
}

pub struct PupilWorker {
	eye: Eye,
	stop: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl PupilWorker {
	pub fn spawn(eye: Eye,
		         receiver: Receiver<PupilJob>,
		         locator: Arc<dyn PupilLocator>,
		         render: Arc<dyn RenderTarget>,
		         jitter_threshold: f32,
		         poll_interval: Duration) -> Result<Self> {
		let stop = Arc::new(AtomicBool::new(false));
		let s = stop.clone();

		let handle = Builder::new()
			.name(format!("pupil_{}", eye.as_str()))
			.spawn(move || {
				info!("pupil worker started", tags![
					("eye", eye.as_str())
				]);
				let calls = worker_run(eye, receiver, locator, render,
					PupilState::new(jitter_threshold), poll_interval, s);
				info!("pupil worker stopped", tags![
					("eye", eye.as_str()),
					("locator_calls", &calls.to_string())
				]);
			})
			.map_err(|e| {
				error!("couldn't spawn pupil worker", tags![
					("eye", eye.as_str()),
					("error", &e.to_string())
				]);
				Error::new(ErrorType::WorkerSpawn)
			})?;

		Ok(Self{
			eye: eye,
			stop: stop,
			handle: Some(handle),
		})
	}

	#[cfg(test)]
	pub fn is_running(&self) -> bool {
		self.handle.is_some()
	}

	// Blocks until the loop has exited. A locator call in
	// flight finishes first, nothing is published after.
	pub fn stop(&mut self) {
		self.stop.store(true, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				error!("pupil worker panicked", tags![
					("eye", self.eye.as_str())
				]);
			}
		}
	}
}

impl Drop for PupilWorker {
	fn drop(&mut self) {
		self.stop();
	}
}

// Returns the number of locator calls made
fn worker_run(eye: Eye,
	          receiver: Receiver<PupilJob>,
	          locator: Arc<dyn PupilLocator>,
	          render: Arc<dyn RenderTarget>,
	          mut state: PupilState,
	          poll_interval: Duration,
	          stop: Arc<AtomicBool>) -> u64 {
	let mut calls = 0;

	while !stop.load(Ordering::SeqCst) {
		let job = match receiver.recv_timeout(poll_interval) {
			Recv::Ready(job) => job,
			Recv::Empty => continue,
			// The dispatcher went away with its generation
			Recv::Closed => break,
		};

		// stop() may have landed while we were waiting
		if stop.load(Ordering::SeqCst) {
			break;
		}

		// Nothing to seed the search with yet
		let seed = match job.seed {
			Some(seed) => seed,
			None => continue,
		};

		let frame = &job.frame;
		let candidate = locator.locate(&frame.luma, seed.x, seed.y,
			frame.height, frame.width, job.inter_eye_distance);
		calls += 1;

		let published = state.accept(candidate, seed);
		render.set_pupil(eye, published);
		render.request_redraw();
	}

	calls
}
