use std::sync::Arc;

use crate::exchange::msgs::Seeds;
use crate::face::*;
use crate::overlay::RenderTarget;

pub mod registry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
	New,
	Tracking,
	Missing,
	Done,
}

#[derive(Clone, Copy, Debug)]
pub enum TrackEvent<'a> {
	Detected(&'a Face),
	// Not seen this frame, may come back
	Missing,
	// Gone for good
	Done,
}

// FaceTracker follows one face id from its first detection
// until the detector gives up on it.
//
//   New -> Tracking <-> Missing
//              \          /
//               -> Done <-
//
// Landmark positions are cached as proportions of the face
// box so a landmark the detector drops in a later frame can
// be placed inside the new box.
pub struct FaceTracker {
	id: TrackId,
	state: TrackState,
	proportions: [Option<Point>; Landmark::COUNT],
	previous_left_open: bool,
	previous_right_open: bool,
	left_eye: Option<Point>,
	right_eye: Option<Point>,
	inter_eye_distance: f32,
	eye_closed_threshold: f32,
	render: Arc<dyn RenderTarget>,
}

impl FaceTracker {
	pub fn new(id: TrackId,
		       render: Arc<dyn RenderTarget>,
		       eye_closed_threshold: f32) -> Self {
		// Registered hidden until the first update
		render.hide(id);

		Self{
			id: id,
			state: TrackState::New,
			proportions: [None; Landmark::COUNT],
			previous_left_open: true,
			previous_right_open: true,
			left_eye: None,
			right_eye: None,
			inter_eye_distance: 0.0,
			eye_closed_threshold: eye_closed_threshold,
			render: render,
		}
	}

	#[cfg(test)]
	pub fn state(&self) -> TrackState {
		self.state
	}

	#[cfg(test)]
	pub fn proportion(&self, landmark: Landmark) -> Option<Point> {
		self.proportions[landmark.index()]
	}

	#[cfg(test)]
	pub fn eyes_open(&self) -> (bool, bool) {
		(self.previous_left_open, self.previous_right_open)
	}

	// Eye positions and distance as of the last detection.
	// They stay frozen while the face is missing.
	pub fn seeds(&self) -> Seeds {
		Seeds{
			left: self.left_eye,
			right: self.right_eye,
			inter_eye_distance: self.inter_eye_distance,
		}
	}

	pub fn update(&mut self, event: TrackEvent) -> TrackState {
		if self.state == TrackState::Done {
			return self.state;
		}

		self.state = match event {
			TrackEvent::Detected(face) => {
				self.on_detected(face);
				self.render.show(self.id);
				TrackState::Tracking
			},
			TrackEvent::Missing => {
				self.render.hide(self.id);
				TrackState::Missing
			},
			TrackEvent::Done => {
				self.render.remove(self.id);
				self.proportions = [None; Landmark::COUNT];
				self.left_eye = None;
				self.right_eye = None;
				TrackState::Done
			},
		};
		self.render.request_redraw();
		self.state
	}

	fn on_detected(&mut self, face: &Face) {
		let b = face.bounding_box;
		for l in face.landmarks.iter() {
			if let Some(p) = b.proportion_of(l.position) {
				self.proportions[l.landmark.index()] = Some(p);
			}
		}

		self.left_eye = self.landmark_position(face, Landmark::LeftEye);
		self.right_eye = self.landmark_position(face, Landmark::RightEye);

		if let (Some(l), Some(r)) = (self.left_eye, self.right_eye) {
			self.inter_eye_distance = l.distance(&r);
		}

		self.previous_left_open = self.is_open(face.left_eye_open_probability,
			self.previous_left_open);
		self.previous_right_open = self.is_open(face.right_eye_open_probability,
			self.previous_right_open);

		self.render.set_eye_state(self.id,
			self.left_eye, self.previous_left_open,
			self.right_eye, self.previous_right_open);
	}

	// Detected position if present, else rebuilt from the
	// cached proportion, else unknown.
	fn landmark_position(&self, face: &Face, landmark: Landmark) -> Option<Point> {
		face.landmark(landmark).or_else(|| {
			self.proportions[landmark.index()]
				.map(|p| face.bounding_box.point_at(p))
		})
	}

	// A fresh threshold every frame, no smoothing. Without a
	// probability the last answer stands.
	fn is_open(&self, probability: Option<f32>, previous: bool) -> bool {
		match probability {
			Some(p) => p > self.eye_closed_threshold,
			None => previous,
		}
	}
}
