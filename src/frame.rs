use serde::{Serialize, Deserialize};

use crate::errors::*;

// How the camera lays out a raw YUV buffer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum PixelLayout {
	// Packed 4:2:2, Y0 U Y1 V
	#[serde(rename = "YUYV")]
	Yuyv,
	// Planar 4:2:0, a full Y plane followed by chroma
	#[serde(rename = "NV12")]
	Nv12,
	#[serde(rename = "NV21")]
	Nv21,
}

impl PixelLayout {
	pub fn fourcc(&self) -> &'static [u8] {
		match self {
			PixelLayout::Yuyv => b"YUYV",
			PixelLayout::Nv12 => b"NV12",
			PixelLayout::Nv21 => b"NV21",
		}
	}
}

// Frame is an owned luma snapshot. Each pupil worker
// gets its own so the next capture can never tear a
// buffer a worker is still reading.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	pub luma: Vec<u8>,
	pub width: u32,
	pub height: u32,
	pub sequence: u64,
}

impl Frame {
	pub fn from_raw(raw: &[u8],
		            width: u32,
		            height: u32,
		            layout: PixelLayout,
		            sequence: u64) -> Result<Self> {
		Ok(Self{
			luma: extract_luma(raw, width, height, layout)?,
			width: width,
			height: height,
			sequence: sequence,
		})
	}
}

// Only the Y plane is needed downstream, chroma is
// dropped without conversion.
pub fn extract_luma(raw: &[u8],
	                width: u32,
	                height: u32,
	                layout: PixelLayout) -> Result<Vec<u8>> {
	let num_pixels = (width as usize) * (height as usize);
	if num_pixels == 0 {
		return Err(Error::new(ErrorType::InvalidFrame));
	}

	match layout {
		PixelLayout::Yuyv => {
			if raw.len() < num_pixels * 2 {
				return Err(Error::new(ErrorType::InvalidFrame));
			}
			Ok(raw.iter()
				.step_by(2)
				.take(num_pixels)
				.cloned()
				.collect())
		},
		PixelLayout::Nv12 | PixelLayout::Nv21 => {
			if raw.len() < num_pixels {
				return Err(Error::new(ErrorType::InvalidFrame));
			}
			Ok(raw[..num_pixels].to_vec())
		},
	}
}
