use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::exchange::msgs::Seeds;
use crate::face::*;
use crate::overlay::RenderTarget;
use crate::{info, tags};

use super::{FaceTracker, TrackEvent, TrackState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorMode {
	// One tracker locked onto the largest face, the rest
	// are ignored until it is gone. Used front facing.
	LargestFace,
	// One tracker per face id. Used rear facing.
	MultiFace,
}

struct Entry {
	tracker: FaceTracker,
	// Consecutive frames without a detection
	missed: u32,
}

// FaceRegistry turns per-frame detections into tracker
// events and picks the face whose eyes seed the pupil
// workers.
pub struct FaceRegistry {
	mode: ProcessorMode,
	max_gap_frames: u32,
	eye_closed_threshold: f32,
	render: Arc<dyn RenderTarget>,
	entries: BTreeMap<TrackId, Entry>,
	seeds: Seeds,
}

fn larger(a: &(TrackId, &Face), b: &(TrackId, &Face)) -> Ordering {
	// Bigger box first, lower id breaks ties
	b.1.bounding_box.area()
		.partial_cmp(&a.1.bounding_box.area())
		.unwrap_or(Ordering::Equal)
		.then(a.0.cmp(&b.0))
}

impl FaceRegistry {
	pub fn new(mode: ProcessorMode,
		       max_gap_frames: u32,
		       eye_closed_threshold: f32,
		       render: Arc<dyn RenderTarget>) -> Self {
		Self{
			mode: mode,
			max_gap_frames: max_gap_frames,
			eye_closed_threshold: eye_closed_threshold,
			render: render,
			entries: BTreeMap::new(),
			seeds: Seeds::default(),
		}
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[cfg(test)]
	pub fn state(&self, id: TrackId) -> Option<TrackState> {
		self.entries.get(&id).map(|e| e.tracker.state())
	}

	#[cfg(test)]
	pub fn seeds(&self) -> Seeds {
		self.seeds
	}

	fn selected<'a>(&self, detections: &'a Detections) -> Vec<(TrackId, &'a Face)> {
		let mut faces: Vec<(TrackId, &Face)> = detections.iter()
			.map(|(id, face)| (*id, face))
			.collect();

		match self.mode {
			ProcessorMode::MultiFace => faces,
			ProcessorMode::LargestFace => {
				// Stay on the focused face while it exists
				if let Some(focus) = self.entries.keys().next() {
					faces.retain(|(id, _)| id == focus);
					return faces;
				}
				faces.sort_by(larger);
				faces.truncate(1);
				faces
			},
		}
	}

	pub fn process(&mut self, detections: &Detections) -> Seeds {
		let mut seen = self.selected(detections);

		for &(id, face) in seen.iter() {
			let render = self.render.clone();
			let threshold = self.eye_closed_threshold;
			let entry = self.entries.entry(id).or_insert_with(|| {
				info!("new face", tags![
					("track_id", &id.to_string())
				]);
				Entry{
					tracker: FaceTracker::new(id, render, threshold),
					missed: 0,
				}
			});
			entry.missed = 0;
			entry.tracker.update(TrackEvent::Detected(face));
		}

		let mut done = vec![];
		for (id, entry) in self.entries.iter_mut() {
			if seen.iter().any(|(s, _)| s == id) {
				continue;
			}
			entry.missed += 1;
			if entry.missed > self.max_gap_frames {
				entry.tracker.update(TrackEvent::Done);
				done.push(*id);
			} else {
				entry.tracker.update(TrackEvent::Missing);
			}
		}
		for id in done {
			info!("face done", tags![
				("track_id", &id.to_string())
			]);
			self.entries.remove(&id);
		}

		// Seeds follow the largest face seen this frame. With
		// nothing seen they stay where they were, with nobody
		// left to track they are cleared.
		seen.sort_by(larger);
		if let Some((id, _)) = seen.first() {
			if let Some(entry) = self.entries.get(id) {
				self.seeds = entry.tracker.seeds();
			}
		} else if self.entries.is_empty() {
			self.seeds = Seeds::default();
		}

		self.seeds
	}

	// Ends every track, used when a generation is torn down
	pub fn clear(&mut self) {
		for (_, entry) in self.entries.iter_mut() {
			entry.tracker.update(TrackEvent::Done);
		}
		self.entries.clear();
		self.seeds = Seeds::default();
	}
}
