use crate::detector::Detector;
use crate::errors::*;
use crate::face::{Detections, Eye};
use crate::frame::{Frame, PixelLayout};
use crate::{info, warn};

pub mod mailbox;
use mailbox::{Delivery, Sender};
pub mod msgs;
use msgs::{PupilJob, Seeds};

// FrameDispatcher sits on the detection callback. Every
// frame is copied once per pupil worker, both workers are
// signalled, then the frame goes to the face detector.
// Nothing here waits on the workers.
pub struct FrameDispatcher {
	detector: Box<dyn Detector>,
	layout: PixelLayout,
	left: Sender<PupilJob>,
	right: Sender<PupilJob>,
	seeds: Seeds,
	sequence: u64,
	operational: bool,
	warned: bool,
	// Frames a worker never got to see
	coalesced: u64,
}

impl FrameDispatcher {
	pub fn new(detector: Box<dyn Detector>,
		       layout: PixelLayout,
		       left: Sender<PupilJob>,
		       right: Sender<PupilJob>) -> Self {
		let mut d = Self{
			detector: detector,
			layout: layout,
			left: left,
			right: right,
			seeds: Seeds::default(),
			sequence: 0,
			operational: false,
			warned: false,
			coalesced: 0,
		};
		d.check_operational();
		d
	}

	// The detection engine may still be loading. Warn once
	// and keep going, it will come up on its own.
	fn check_operational(&mut self) {
		let operational = self.detector.is_operational();
		if !operational && !self.warned {
			warn!("face detector dependencies are not yet available");
			self.warned = true;
		} else if operational && !self.operational && self.warned {
			info!("face detector is now operational");
		}
		self.operational = operational;
	}

	#[cfg(test)]
	pub fn is_operational(&self) -> bool {
		self.operational
	}

	// Seeds go out with the next frame
	pub fn set_seeds(&mut self, seeds: Seeds) {
		self.seeds = seeds;
	}

	pub fn frames_dispatched(&self) -> u64 {
		self.sequence
	}

	pub fn frames_coalesced(&self) -> u64 {
		self.coalesced
	}

	pub fn on_frame(&mut self, raw: &[u8], width: u32, height: u32) -> Result<Detections> {
		let frame = Frame::from_raw(raw, width, height, self.layout, self.sequence)?;
		self.sequence += 1;

		// Each worker owns its copy from here on
		let left_job = PupilJob{
			frame: frame.clone(),
			seed: self.seeds.for_eye(Eye::Left),
			inter_eye_distance: self.seeds.inter_eye_distance,
		};
		let right_job = PupilJob{
			frame: frame.clone(),
			seed: self.seeds.for_eye(Eye::Right),
			inter_eye_distance: self.seeds.inter_eye_distance,
		};

		for delivery in [self.left.send(left_job), self.right.send(right_job)].iter() {
			if *delivery == Delivery::Replaced {
				self.coalesced += 1;
			}
		}

		self.check_operational();
		Ok(self.detector.detect(&frame))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicBool, Ordering};

	use crate::face::*;
	use crate::testing::{face_at, ScriptedDetector};
	use mailbox::{mailbox, Recv};

	fn planar(width: u32, height: u32, fill: u8) -> Vec<u8> {
		vec![fill; (width * height * 3 / 2) as usize]
	}

	#[test]
	fn both_workers_get_their_own_copy() {
		let (lsx, lrx) = mailbox();
		let (rsx, rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::new(vec![])),
			PixelLayout::Nv21, lsx, rsx);
		d.set_seeds(Seeds{
			left: Some(Point::new(10.0, 12.0)),
			right: Some(Point::new(30.0, 12.0)),
			inter_eye_distance: 20.0,
		});
		d.on_frame(&planar(4, 2, 7), 4, 2).expect("frame");

		let left = match lrx.try_recv() {
			Recv::Ready(job) => job,
			other => panic!("left worker got {:?}", other),
		};
		let right = match rrx.try_recv() {
			Recv::Ready(job) => job,
			other => panic!("right worker got {:?}", other),
		};

		assert_eq!(left.frame, right.frame);
		assert_ne!(left.frame.luma.as_ptr(), right.frame.luma.as_ptr());
		assert_eq!(left.frame.luma, vec![7; 8]);
		assert_eq!((left.frame.width, left.frame.height), (4, 2));
		assert_eq!(left.seed, Some(Point::new(10.0, 12.0)));
		assert_eq!(right.seed, Some(Point::new(30.0, 12.0)));
		assert_eq!(right.inter_eye_distance, 20.0);
	}

	#[test]
	fn signals_go_out_without_seeds() {
		let (lsx, lrx) = mailbox();
		let (rsx, rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::new(vec![])),
			PixelLayout::Nv12, lsx, rsx);
		d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame");

		match (lrx.try_recv(), rrx.try_recv()) {
			(Recv::Ready(l), Recv::Ready(r)) => {
				assert_eq!(l.seed, None);
				assert_eq!(r.seed, None);
			},
			other => panic!("expected two jobs, got {:?}", other),
		}
	}

	#[test]
	fn unconsumed_frames_are_replaced() {
		let (lsx, lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::new(vec![])),
			PixelLayout::Nv21, lsx, rsx);
		for fill in 1..=3 {
			d.on_frame(&planar(2, 2, fill), 2, 2).expect("frame");
		}
		assert_eq!(d.frames_dispatched(), 3);
		assert_eq!(d.frames_coalesced(), 4);

		match lrx.try_recv() {
			Recv::Ready(job) => {
				assert_eq!(job.frame.sequence, 2);
				assert_eq!(job.frame.luma, vec![3; 4]);
			},
			other => panic!("left worker got {:?}", other),
		}
	}

	#[test]
	fn detections_are_returned_unchanged() {
		let mut detections = Detections::new();
		detections.insert(3, face_at(BoundingBox::new(1.0, 2.0, 3.0, 4.0),
			&[(Landmark::LeftEye, 1.5, 2.5)]));
		let (lsx, _lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(
			Box::new(ScriptedDetector::new(vec![detections.clone()])),
			PixelLayout::Nv21, lsx, rsx);

		assert_eq!(d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame"), detections);
		assert!(d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame").is_empty());
	}

	#[test]
	fn bad_frame_signals_nobody() {
		let (lsx, lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::new(vec![])),
			PixelLayout::Nv21, lsx, rsx);
		assert!(d.on_frame(&[1, 2], 4, 4).is_err());
		assert_eq!(lrx.try_recv(), Recv::Empty);
		assert_eq!(d.frames_dispatched(), 0);
	}

	#[test]
	fn degraded_detector_keeps_dispatching() {
		let (lsx, lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::not_operational()),
			PixelLayout::Nv21, lsx, rsx);
		assert!(!d.is_operational());
		assert!(d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame").is_empty());
		match lrx.try_recv() {
			Recv::Ready(_) => {},
			other => panic!("left worker got {:?}", other),
		}
	}

	// Comes up once its flag is set, like a model that
	// finishes loading in the background
	struct LateDetector {
		ready: Arc<AtomicBool>,
	}

	impl Detector for LateDetector {
		fn detect(&mut self, _: &Frame) -> Detections {
			Detections::new()
		}

		fn is_operational(&self) -> bool {
			self.ready.load(Ordering::SeqCst)
		}
	}

	#[test]
	fn warns_once_then_recovers() {
		let ready = Arc::new(AtomicBool::new(false));
		let (lsx, _lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(LateDetector{ready: ready.clone()}),
			PixelLayout::Nv21, lsx, rsx);
		assert!(d.warned, "warning logged on creation");
		assert!(!d.operational);

		for _ in 0..3 {
			d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame");
			assert!(d.warned);
			assert!(!d.operational);
		}

		ready.store(true, Ordering::SeqCst);
		d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame");
		assert!(d.operational, "recovery noticed on the next frame");

		// A later outage doesn't warn a second time
		ready.store(false, Ordering::SeqCst);
		d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame");
		assert!(!d.operational);
		assert!(d.warned);
	}

	#[test]
	fn operational_detector_never_warns() {
		let (lsx, _lrx) = mailbox();
		let (rsx, _rrx) = mailbox();
		let mut d = FrameDispatcher::new(Box::new(ScriptedDetector::new(vec![])),
			PixelLayout::Nv21, lsx, rsx);
		d.on_frame(&planar(2, 2, 0), 2, 2).expect("frame");
		assert!(d.operational);
		assert!(!d.warned);
	}
}

