use std::collections::BTreeMap;

use serde::Serialize;

// Track ids are handed out by the detector and stay
// stable while the same face remains in view.
pub type TrackId = u32;

pub type Detections = BTreeMap<TrackId, Face>;

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
	pub x: f32,
	pub y: f32,
}

impl Point {
	pub fn new(x: f32, y: f32) -> Self {
		Self{x: x, y: y}
	}

	pub fn distance(&self, other: &Point) -> f32 {
		((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
	}
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl BoundingBox {
	pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
		Self{x: x, y: y, width: width, height: height}
	}

	pub fn area(&self) -> f32 {
		self.width * self.height
	}

	pub fn intersection_over_union(&self, other: &BoundingBox) -> f32 {
		let left = self.x.max(other.x);
		let top = self.y.max(other.y);
		let right = (self.x + self.width).min(other.x + other.width);
		let bottom = (self.y + self.height).min(other.y + other.height);

		if right <= left || bottom <= top {
			return 0.0;
		}

		let inter = (right - left) * (bottom - top);
		let union = self.area() + other.area() - inter;
		if union <= 0.0 {
			0.0
		} else {
			inter / union
		}
	}

	// (point - origin) / size per axis. None for a
	// degenerate box.
	pub fn proportion_of(&self, p: Point) -> Option<Point> {
		if self.width <= 0.0 || self.height <= 0.0 {
			return None;
		}
		Some(Point::new((p.x - self.x) / self.width,
			(p.y - self.y) / self.height))
	}

	// origin + proportion * size per axis
	pub fn point_at(&self, proportion: Point) -> Point {
		Point::new(self.x + proportion.x * self.width,
			self.y + proportion.y * self.height)
	}
}

// The closed set of facial landmarks a detector may
// report. The discriminant doubles as an array index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
	BottomMouth = 0,
	LeftCheek,
	LeftEarTip,
	LeftEar,
	LeftEye,
	LeftMouth,
	NoseBase,
	RightCheek,
	RightEarTip,
	RightEar,
	RightEye,
	RightMouth,
}

impl Landmark {
	pub const COUNT: usize = 12;

	pub fn index(self) -> usize {
		self as usize
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkPoint {
	pub landmark: Landmark,
	pub position: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Face {
	pub bounding_box: BoundingBox,
	pub landmarks: Vec<LandmarkPoint>,
	// None when the detector did not classify the eye
	pub left_eye_open_probability: Option<f32>,
	pub right_eye_open_probability: Option<f32>,
}

impl Face {
	pub fn landmark(&self, landmark: Landmark) -> Option<Point> {
		self.landmarks.iter()
			.find(|l| l.landmark == landmark)
			.map(|l| l.position)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Eye {
	Left,
	Right,
}

impl Eye {
	pub fn as_str(&self) -> &'static str {
		match self {
			Eye::Left => "left",
			Eye::Right => "right",
		}
	}
}
