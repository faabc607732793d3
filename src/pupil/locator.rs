// Pupil localisation over a luma frame.
//
// The worker loop only depends on the PupilLocator trait;
// GradientLocator is the stock implementation. It votes for
// the eye centre using image gradients inside an eye-sized
// box around the seed (the "means of gradients" approach).

// Returned when no pupil could be found
pub const NO_PUPIL: (f32, f32) = (0.0, 0.0);

// Eye box as a fraction of the inter-eye distance
const EYE_ROI_WIDTH: f32 = 0.40;
const EYE_ROI_HEIGHT: f32 = 0.30;
// Voting runs on a box scaled down to this width
const FAST_WIDTH: usize = 30;
const DARKNESS_WEIGHT_SCALE: f32 = 100.0;
const MIN_ROI_SIDE: i64 = 4;

pub trait PupilLocator: Send + Sync {
	// Must not panic. Failure is reported as NO_PUPIL.
	fn locate(&self,
		      luma: &[u8],
		      seed_x: f32,
		      seed_y: f32,
		      height: u32,
		      width: u32,
		      inter_eye_distance: f32) -> (f32, f32);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeRoi {
	pub x: i64,
	pub y: i64,
	pub width: i64,
	pub height: i64,
}

impl EyeRoi {
	// The seed sits 3/5 of the way down the box, eyes
	// are usually found just above the landmark.
	pub fn around(seed_x: f32, seed_y: f32, inter_eye_distance: f32) -> Self {
		let width = (EYE_ROI_WIDTH * inter_eye_distance) as i64;
		let height = (EYE_ROI_HEIGHT * inter_eye_distance) as i64;
		Self{
			// Huge seeds saturate rather than overflow
			x: (seed_x as i64).saturating_sub(width / 2),
			y: (seed_y as i64).saturating_sub(height.saturating_mul(3) / 5),
			width: width,
			height: height,
		}
	}

	pub fn fits(&self, frame_width: u32, frame_height: u32) -> bool {
		let right = self.x.checked_add(self.width);
		let bottom = self.y.checked_add(self.height);
		self.x >= 0 && self.y >= 0
			&& self.width >= MIN_ROI_SIDE && self.height >= MIN_ROI_SIDE
			&& right.map_or(false, |r| r <= frame_width as i64)
			&& bottom.map_or(false, |b| b <= frame_height as i64)
	}
}

#[derive(Default)]
pub struct GradientLocator{}

impl GradientLocator {
	pub fn new() -> Self {
		Self{}
	}
}

impl PupilLocator for GradientLocator {
	fn locate(&self,
		      luma: &[u8],
		      seed_x: f32,
		      seed_y: f32,
		      height: u32,
		      width: u32,
		      inter_eye_distance: f32) -> (f32, f32) {
		if !inter_eye_distance.is_finite() || !seed_x.is_finite() || !seed_y.is_finite() {
			return NO_PUPIL;
		}
		if luma.len() < (width as usize) * (height as usize) {
			return NO_PUPIL;
		}
		// The seed must be inside the frame
		if seed_x < 0.0 || seed_y < 0.0
			|| seed_x >= width as f32 || seed_y >= height as f32 {
			return NO_PUPIL;
		}

		let roi = EyeRoi::around(seed_x, seed_y, inter_eye_distance);
		if !roi.fits(width, height) {
			return NO_PUPIL;
		}

		let mut eye = crop(luma, width as usize, &roi);
		equalize(&mut eye);

		let (cx, cy) = match find_eye_centre(&eye, roi.width as usize, roi.height as usize) {
			Some(c) => c,
			None => return NO_PUPIL,
		};

		// A centre on the box border means voting failed
		let (cx, cy) = (cx as i64, cy as i64);
		if cx <= 1 || cy <= 1 || cx >= roi.width - 1 || cy >= roi.height - 1 {
			return NO_PUPIL;
		}

		((cx + roi.x) as f32, (cy + roi.y) as f32)
	}
}

fn crop(luma: &[u8], stride: usize, roi: &EyeRoi) -> Vec<u8> {
	let mut out = Vec::with_capacity((roi.width * roi.height) as usize);
	for y in roi.y..roi.y + roi.height {
		let start = y as usize * stride + roi.x as usize;
		out.extend_from_slice(&luma[start..start + roi.width as usize]);
	}
	out
}

// Histogram equalisation in place
fn equalize(pixels: &mut [u8]) {
	let mut hist = [0usize; 256];
	for &p in pixels.iter() {
		hist[p as usize] += 1;
	}

	let mut cdf = [0usize; 256];
	let mut total = 0;
	for (i, count) in hist.iter().enumerate() {
		total += count;
		cdf[i] = total;
	}

	let cdf_min = cdf.iter().cloned().find(|&c| c > 0).unwrap_or(0);
	let range = total - cdf_min;
	if range == 0 {
		return;
	}

	for p in pixels.iter_mut() {
		let scaled = (cdf[*p as usize] - cdf_min) * 255 / range;
		*p = scaled as u8;
	}
}

fn downscale(pixels: &[u8], width: usize, height: usize) -> (Vec<f32>, usize, usize, f32) {
	let scale = if width > FAST_WIDTH {
		FAST_WIDTH as f32 / width as f32
	} else {
		1.0
	};
	let w = ((width as f32 * scale).round() as usize).max(1);
	let h = ((height as f32 * scale).round() as usize).max(1);

	let mut out = Vec::with_capacity(w * h);
	for y in 0..h {
		let sy = ((y as f32 / scale) as usize).min(height - 1);
		for x in 0..w {
			let sx = ((x as f32 / scale) as usize).min(width - 1);
			out.push(pixels[sy * width + sx] as f32);
		}
	}
	(out, w, h, scale)
}

fn blur(pixels: &[f32], w: usize, h: usize) -> Vec<f32> {
	let mut out = vec![0.0; w * h];
	for y in 0..h {
		for x in 0..w {
			let mut sum = 0.0;
			let mut n = 0.0;
			for yy in y.saturating_sub(1)..(y + 2).min(h) {
				for xx in x.saturating_sub(1)..(x + 2).min(w) {
					sum += pixels[yy * w + xx];
					n += 1.0;
				}
			}
			out[y * w + x] = sum / n;
		}
	}
	out
}

// Returns the centre in full-size box coordinates, or
// None when the box holds no usable gradients.
fn find_eye_centre(eye: &[u8], width: usize, height: usize) -> Option<(f32, f32)> {
	let (small, w, h, scale) = downscale(eye, width, height);
	if w < 3 || h < 3 {
		return None;
	}
	let small = blur(&small, w, h);

	// Sobel gradients, borders left at zero
	let mut gx = vec![0.0f32; w * h];
	let mut gy = vec![0.0f32; w * h];
	let at = |x: usize, y: usize| small[y * w + x];
	for y in 1..h - 1 {
		for x in 1..w - 1 {
			gx[y * w + x] = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
				- (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
			gy[y * w + x] = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
				- (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
		}
	}

	let mags: Vec<f32> = gx.iter().zip(gy.iter())
		.map(|(x, y)| (x * x + y * y).sqrt())
		.collect();
	let n = mags.len() as f32;
	let mean = mags.iter().sum::<f32>() / n;
	let var = mags.iter().map(|m| (m - mean).powi(2)).sum::<f32>() / n;
	let threshold = mean + var.sqrt() / 2.0;

	// Keep strong, unit length gradients
	let mut gradients = vec![];
	for i in 0..w * h {
		if mags[i] > 0.0 && mags[i] >= threshold {
			gradients.push(((i % w) as f32, (i / w) as f32, gx[i] / mags[i], gy[i] / mags[i]));
		}
	}
	if gradients.is_empty() {
		return None;
	}

	let mut best = (0usize, 0usize);
	let mut best_score = 0.0f32;
	for cy in 0..h {
		for cx in 0..w {
			let weight = (255.0 - small[cy * w + cx]) / DARKNESS_WEIGHT_SCALE;
			let mut score = 0.0;
			for &(x, y, ux, uy) in gradients.iter() {
				let dx = x - cx as f32;
				let dy = y - cy as f32;
				let len = (dx * dx + dy * dy).sqrt();
				if len == 0.0 {
					continue;
				}
				let dot = (dx * ux + dy * uy) / len;
				if dot > 0.0 {
					score += dot;
				}
			}
			score *= weight;
			if score > best_score {
				best_score = score;
				best = (cx, cy);
			}
		}
	}

	Some((best.0 as f32 / scale, best.1 as f32 / scale))
}
