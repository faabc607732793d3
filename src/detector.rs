use std::cmp::Ordering;
use std::path::Path;

use rustface::ImageData;

use crate::face::*;
use crate::frame::Frame;
use crate::{info, error, tags};

// rustface refuses anything smaller
const RUSTFACE_MIN_FACE: u32 = 20;
// Frames between attempts to load a missing model
const RELOAD_INTERVAL: u32 = 30;
const MIN_TRACK_IOU: f32 = 0.3;

// Where eyes and nose sit inside a frontal face box
// when the engine only reports the box itself.
const CANONICAL_LANDMARKS: [(Landmark, f32, f32); 3] = [
	(Landmark::LeftEye, 0.30, 0.40),
	(Landmark::RightEye, 0.70, 0.40),
	(Landmark::NoseBase, 0.50, 0.62),
];

pub trait Detector: Send {
	fn detect(&mut self, frame: &Frame) -> Detections;

	// False while the detection engine can't run yet. The
	// detector is expected to become operational on its own.
	fn is_operational(&self) -> bool;
}

// TrackIdAssigner keeps face ids stable across frames by
// matching each new box against the boxes seen recently.
pub struct TrackIdAssigner {
	// (id, last box, frames since last seen)
	recent: Vec<(TrackId, BoundingBox, u32)>,
	next_id: TrackId,
	max_age: u32,
}

impl TrackIdAssigner {
	pub fn new(max_age: u32) -> Self {
		Self{
			recent: vec![],
			next_id: 0,
			max_age: max_age,
		}
	}

	pub fn assign(&mut self, boxes: &[BoundingBox]) -> Vec<TrackId> {
		// Greedy best-first matching on IoU
		let mut pairs = vec![];
		for (r, (_, prev, _)) in self.recent.iter().enumerate() {
			for (c, cur) in boxes.iter().enumerate() {
				let iou = prev.intersection_over_union(cur);
				if iou >= MIN_TRACK_IOU {
					pairs.push((iou, r, c));
				}
			}
		}
		pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

		let mut ids: Vec<Option<TrackId>> = vec![None; boxes.len()];
		let mut used = vec![false; self.recent.len()];
		for (_, r, c) in pairs {
			if used[r] || ids[c].is_some() {
				continue;
			}
			used[r] = true;
			ids[c] = Some(self.recent[r].0);
		}

		let mut recent = Vec::with_capacity(self.recent.len() + boxes.len());
		let mut assigned = Vec::with_capacity(boxes.len());
		for (c, id) in ids.into_iter().enumerate() {
			let id = match id {
				Some(id) => id,
				None => {
					let id = self.next_id;
					self.next_id = self.next_id.wrapping_add(1);
					id
				},
			};
			recent.push((id, boxes[c], 0));
			assigned.push(id);
		}

		// Unmatched faces are remembered for a few frames so
		// a brief miss doesn't hand out a new id.
		for (r, entry) in self.recent.iter().enumerate() {
			if !used[r] && entry.2 < self.max_age {
				recent.push((entry.0, entry.1, entry.2 + 1));
			}
		}
		self.recent = recent;

		assigned
	}
}

pub fn canonical_face(bounding_box: BoundingBox) -> Face {
	let landmarks = CANONICAL_LANDMARKS.iter()
		.map(|&(landmark, x, y)| LandmarkPoint{
			landmark: landmark,
			position: bounding_box.point_at(Point::new(x, y)),
		})
		.collect();

	Face{
		bounding_box: bounding_box,
		landmarks: landmarks,
		left_eye_open_probability: None,
		right_eye_open_probability: None,
	}
}

// RustfaceDetector runs the SeetaFace cascade over the
// luma plane. The model is loaded lazily so a missing
// file degrades to "no detections" until it shows up.
pub struct RustfaceDetector {
	model_path: String,
	min_face_size: f32,
	engine: Option<Box<dyn rustface::Detector>>,
	frames_until_reload: u32,
	assigner: TrackIdAssigner,
}

// rustface's Detector trait object carries no Send bound.
// The engine is owned by this detector alone, is never
// shared or aliased, and the detector moves to the
// detection thread as one unit and is only used there.
unsafe impl Send for RustfaceDetector{}

impl RustfaceDetector {
	pub fn new(model_path: &str, min_face_size: f32, max_gap_frames: u32) -> Self {
		let mut d = Self{
			model_path: model_path.to_string(),
			min_face_size: min_face_size,
			engine: None,
			frames_until_reload: 0,
			assigner: TrackIdAssigner::new(max_gap_frames),
		};
		d.try_load();
		d
	}

	fn try_load(&mut self) {
		self.frames_until_reload = RELOAD_INTERVAL;
		if !Path::new(&self.model_path).exists() {
			return;
		}

		match rustface::create_detector(&self.model_path) {
			Ok(mut engine) => {
				engine.set_score_thresh(2.0);
				engine.set_pyramid_scale_factor(0.8);
				engine.set_slide_window_step(4, 4);
				info!("face model loaded", tags![
					("model_path", &self.model_path)
				]);
				self.engine = Some(engine);
			},
			Err(e) => {
				error!("couldn't load face model", tags![
					("model_path", &self.model_path),
					("error", &e.to_string())
				]);
			},
		}
	}
}

impl Detector for RustfaceDetector {
	fn detect(&mut self, frame: &Frame) -> Detections {
		if self.engine.is_none() {
			self.frames_until_reload = self.frames_until_reload.saturating_sub(1);
			if self.frames_until_reload == 0 {
				self.try_load();
			}
		}

		let engine = match self.engine.as_mut() {
			Some(engine) => engine,
			None => return Detections::new(),
		};

		let min_face = (self.min_face_size * frame.width as f32) as u32;
		engine.set_min_face_size(min_face.max(RUSTFACE_MIN_FACE));

		let mut image = ImageData::new(&frame.luma, frame.width, frame.height);
		let boxes: Vec<BoundingBox> = engine.detect(&mut image)
			.iter()
			.map(|info| {
				let b = info.bbox();
				BoundingBox::new(b.x() as f32, b.y() as f32,
					b.width() as f32, b.height() as f32)
			})
			.collect();

		let ids = self.assigner.assign(&boxes);
		ids.into_iter()
			.zip(boxes.into_iter())
			.map(|(id, b)| (id, canonical_face(b)))
			.collect()
	}

	fn is_operational(&self) -> bool {
		self.engine.is_some()
	}
}
