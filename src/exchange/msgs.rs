use crate::face::{Eye, Point};
use crate::frame::Frame;

// Seeds are the best known eye locations, handed to the
// pupil workers as search starting points.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct Seeds {
	pub left: Option<Point>,
	pub right: Option<Point>,
	pub inter_eye_distance: f32,
}

impl Seeds {
	pub fn for_eye(&self, eye: Eye) -> Option<Point> {
		match eye {
			Eye::Left => self.left,
			Eye::Right => self.right,
		}
	}
}

// PupilJob is everything a worker reads for one
// iteration. It is moved into the worker's mailbox so
// the dispatcher keeps nothing the worker can see.
#[derive(Clone, Debug, PartialEq)]
pub struct PupilJob {
	pub frame: Frame,
	pub seed: Option<Point>,
	pub inter_eye_distance: f32,
}
