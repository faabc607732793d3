use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::face::{Eye, Point, TrackId};

// RenderTarget is what the trackers and pupil workers draw
// into. Every call is fire-and-forget, implementations
// must not block for long since both the detection loop
// and the workers call in.
pub trait RenderTarget: Send + Sync {
	fn set_eye_state(&self,
		             face: TrackId,
		             left: Option<Point>,
		             left_open: bool,
		             right: Option<Point>,
		             right_open: bool);
	fn set_pupil(&self, eye: Eye, position: Option<Point>);
	fn request_redraw(&self);
	fn show(&self, face: TrackId);
	fn hide(&self, face: TrackId);
	fn remove(&self, face: TrackId);
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceGraphic {
	pub visible: bool,
	pub left: Option<Point>,
	pub left_open: bool,
	pub right: Option<Point>,
	pub right_open: bool,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
	pub faces: BTreeMap<TrackId, FaceGraphic>,
	pub left_pupil: Option<Point>,
	pub right_pupil: Option<Point>,
	pub redraws: u64,
}

#[derive(Default)]
struct Overlay {
	faces: BTreeMap<TrackId, FaceGraphic>,
	left_pupil: Option<Point>,
	right_pupil: Option<Point>,
}

// EyeRenderState keeps the latest eye state per face and
// the latest pupil per eye. A renderer polls take_redraw
// and draws from a snapshot.
#[derive(Default)]
pub struct EyeRenderState {
	overlay: Mutex<Overlay>,
	redraw_pending: AtomicBool,
	redraws: AtomicU64,
}

impl EyeRenderState {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, Overlay> {
		self.overlay.lock().unwrap_or_else(|e| e.into_inner())
	}

	// True once per batch of redraw requests
	pub fn take_redraw(&self) -> bool {
		self.redraw_pending.swap(false, Ordering::SeqCst)
	}

	pub fn snapshot(&self) -> OverlaySnapshot {
		let overlay = self.lock();
		let drawn = overlay.any_visible();
		OverlaySnapshot{
			faces: overlay.faces.clone(),
			left_pupil: visible_pupil(overlay.left_pupil, drawn),
			right_pupil: visible_pupil(overlay.right_pupil, drawn),
			redraws: self.redraws.load(Ordering::SeqCst),
		}
	}
}

impl Overlay {
	fn any_visible(&self) -> bool {
		self.faces.values().any(|g| g.visible)
	}
}

// Pupils are drawn inside a visible face only. A zero x
// marks a pupil that drifted too far to trust.
fn visible_pupil(p: Option<Point>, drawn: bool) -> Option<Point> {
	p.filter(|p| drawn && p.x != 0.0)
}

impl RenderTarget for EyeRenderState {
	fn set_eye_state(&self,
		             face: TrackId,
		             left: Option<Point>,
		             left_open: bool,
		             right: Option<Point>,
		             right_open: bool) {
		let mut overlay = self.lock();
		let graphic = overlay.faces.entry(face).or_insert_with(FaceGraphic::default);
		graphic.left = left;
		graphic.left_open = left_open;
		graphic.right = right;
		graphic.right_open = right_open;
	}

	fn set_pupil(&self, eye: Eye, position: Option<Point>) {
		let mut overlay = self.lock();
		// A worker can finish a job after its face was removed,
		// with no face left there is nothing to draw into.
		if overlay.faces.is_empty() {
			return;
		}
		match eye {
			Eye::Left => overlay.left_pupil = position,
			Eye::Right => overlay.right_pupil = position,
		}
	}

	fn request_redraw(&self) {
		self.redraws.fetch_add(1, Ordering::SeqCst);
		self.redraw_pending.store(true, Ordering::SeqCst);
	}

	fn show(&self, face: TrackId) {
		self.lock().faces.entry(face).or_insert_with(FaceGraphic::default).visible = true;
	}

	fn hide(&self, face: TrackId) {
		self.lock().faces.entry(face).or_insert_with(FaceGraphic::default).visible = false;
	}

	fn remove(&self, face: TrackId) {
		let mut overlay = self.lock();
		overlay.faces.remove(&face);
		// Pupils belong to the face being drawn
		if overlay.faces.is_empty() {
			overlay.left_pupil = None;
			overlay.right_pupil = None;
		}
	}
}
