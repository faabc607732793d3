// Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

use crate::detector::Detector;
use crate::errors::*;
use crate::face::*;
use crate::frame::Frame;
use crate::overlay::RenderTarget;
use crate::pupil::locator::PupilLocator;
use crate::webcam::{FrameSource, RawFrame};

#[derive(Clone, Debug, PartialEq)]
pub struct LocateCall {
	pub seed: Point,
	pub sequence_hint: usize,
	pub width: u32,
	pub height: u32,
	pub inter_eye_distance: f32,
}

// Replays scripted results in order, then keeps
// returning the last one.
pub struct RecordingLocator {
	results: Vec<(f32, f32)>,
	calls: Mutex<Vec<LocateCall>>,
	delay: Duration,
}

impl RecordingLocator {
	pub fn returning(results: Vec<(f32, f32)>) -> Self {
		Self{
			results: results,
			calls: Mutex::new(vec![]),
			delay: Duration::from_millis(0),
		}
	}

	// Each call takes at least delay, like a real locator
	pub fn slow(results: Vec<(f32, f32)>, delay: Duration) -> Self {
		let mut l = Self::returning(results);
		l.delay = delay;
		l
	}

	pub fn calls(&self) -> Vec<LocateCall> {
		self.calls.lock().expect("calls lock").clone()
	}
}

impl PupilLocator for RecordingLocator {
	fn locate(&self,
		      luma: &[u8],
		      seed_x: f32,
		      seed_y: f32,
		      height: u32,
		      width: u32,
		      inter_eye_distance: f32) -> (f32, f32) {
		sleep(self.delay);
		let mut calls = self.calls.lock().expect("calls lock");
		let n = calls.len();
		calls.push(LocateCall{
			seed: Point::new(seed_x, seed_y),
			sequence_hint: luma.first().cloned().unwrap_or(0) as usize,
			width: width,
			height: height,
			inter_eye_distance: inter_eye_distance,
		});
		match self.results.get(n) {
			Some(r) => *r,
			None => self.results.last().cloned().unwrap_or((0.0, 0.0)),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
	EyeState(TrackId, Option<Point>, bool, Option<Point>, bool),
	Pupil(Eye, Option<Point>),
	Redraw,
	Show(TrackId),
	Hide(TrackId),
	Remove(TrackId),
}

pub struct RecordingRender {
	events: Mutex<Vec<RenderEvent>>,
}

impl RecordingRender {
	pub fn new() -> Self {
		Self{events: Mutex::new(vec![])}
	}

	fn push(&self, e: RenderEvent) {
		self.events.lock().expect("events lock").push(e);
	}

	pub fn events(&self) -> Vec<RenderEvent> {
		self.events.lock().expect("events lock").clone()
	}

	pub fn pupil_count(&self) -> usize {
		self.events().iter()
			.filter(|e| match e {
				RenderEvent::Pupil(_, _) => true,
				_ => false,
			})
			.count()
	}

	pub fn pupils(&self, eye: Eye) -> Vec<Option<Point>> {
		self.events().into_iter()
			.filter_map(|event| match event {
				RenderEvent::Pupil(e, p) if e == eye => Some(p),
				_ => None,
			})
			.collect()
	}

	pub fn redraws(&self) -> usize {
		self.events().iter()
			.filter(|e| **e == RenderEvent::Redraw)
			.count()
	}
}

impl RenderTarget for RecordingRender {
	fn set_eye_state(&self,
		             face: TrackId,
		             left: Option<Point>,
		             left_open: bool,
		             right: Option<Point>,
		             right_open: bool) {
		self.push(RenderEvent::EyeState(face, left, left_open, right, right_open));
	}

	fn set_pupil(&self, eye: Eye, position: Option<Point>) {
		self.push(RenderEvent::Pupil(eye, position));
	}

	fn request_redraw(&self) {
		self.push(RenderEvent::Redraw);
	}

	fn show(&self, face: TrackId) {
		self.push(RenderEvent::Show(face));
	}

	fn hide(&self, face: TrackId) {
		self.push(RenderEvent::Hide(face));
	}

	fn remove(&self, face: TrackId) {
		self.push(RenderEvent::Remove(face));
	}
}

// Hands out one scripted detection map per frame, then
// empty maps.
pub struct ScriptedDetector {
	script: VecDeque<Detections>,
	operational: bool,
}

impl ScriptedDetector {
	pub fn new(script: Vec<Detections>) -> Self {
		Self{
			script: script.into_iter().collect(),
			operational: true,
		}
	}

	pub fn not_operational() -> Self {
		let mut d = Self::new(vec![]);
		d.operational = false;
		d
	}
}

impl Detector for ScriptedDetector {
	fn detect(&mut self, _: &Frame) -> Detections {
		self.script.pop_front().unwrap_or_default()
	}

	fn is_operational(&self) -> bool {
		self.operational
	}
}

// Produces frames filled with a constant value, sized
// for packed YUYV so planar layouts fit too
pub struct ConstantSource {
	pub width: u32,
	pub height: u32,
	pub value: u8,
}

impl FrameSource for ConstantSource {
	fn capture(&mut self) -> Result<RawFrame> {
		sleep(Duration::from_millis(2));
		let len = (self.width * self.height * 2) as usize;
		Ok(RawFrame{
			data: vec![self.value; len],
			width: self.width,
			height: self.height,
		})
	}
}

pub fn face_at(bounding_box: BoundingBox, landmarks: &[(Landmark, f32, f32)]) -> Face {
	Face{
		bounding_box: bounding_box,
		landmarks: landmarks.iter()
			.map(|&(landmark, x, y)| LandmarkPoint{
				landmark: landmark,
				position: Point::new(x, y),
			})
			.collect(),
		left_eye_open_probability: Some(0.9),
		right_eye_open_probability: Some(0.9),
	}
}
