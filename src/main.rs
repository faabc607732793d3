use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use libc;

mod errors;
use errors::*;
mod googly;
use googly::Googly;
mod face;
mod frame;
mod exchange;
mod pupil;
mod tracker;
mod detector;
mod webcam;
mod overlay;
use overlay::EyeRenderState;
mod lifecycle;
use lifecycle::{App, DeviceBackend};

mod ltsv;

#[cfg(test)]
mod testing;

static FLIP_REQUESTED: AtomicBool = AtomicBool::new(false);
static PAUSE_TOGGLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigusr1(_: libc::c_int) {
	FLIP_REQUESTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigusr2(_: libc::c_int) {
	PAUSE_TOGGLED.store(true, Ordering::SeqCst);
}

fn install_signals() -> Result<()> {
	let handlers = [
		(libc::SIGUSR1, on_sigusr1 as extern "C" fn(libc::c_int)),
		(libc::SIGUSR2, on_sigusr2 as extern "C" fn(libc::c_int)),
	];
	for &(signal, handler) in handlers.iter() {
		let previous = unsafe {
			libc::signal(signal, handler as libc::sighandler_t)
		};
		if previous == libc::SIG_ERR {
			return Err(std::io::Error::last_os_error().into());
		}
	}
	Ok(())
}

// Config comes from the first argument, then
// GOOGLY_CONFIG, then the defaults.
fn load_config() -> Result<Googly> {
	let path = env::args().nth(1).or_else(|| env::var("GOOGLY_CONFIG").ok());
	match path {
		Some(path) => {
			info!("loading config", tags![
				("path", &path)
			]);
			Googly::from_file(&path)
		},
		None => Googly::new(),
	}
}

fn run() -> Result<()> {
	info!("googly started");
	let g = Arc::new(load_config()?);

	// Ctrl-C handler, also covers SIGTERM
	let running = Arc::new(AtomicBool::new(true));
	let r = running.clone();

	ctrlc::set_handler(move || {
		info!("received ctrlc - closing");
		r.store(false, Ordering::SeqCst);
	})?;
	install_signals()?;

	let render = Arc::new(EyeRenderState::new());
	let mut app = App::new(g.clone(), Box::new(DeviceBackend{}), render.clone());
	app.start()?;

	let mut paused = false;
	while running.load(Ordering::SeqCst) {
		if FLIP_REQUESTED.swap(false, Ordering::SeqCst) {
			if paused {
				warn!("ignoring flip while paused");
			} else if let Err(e) = app.flip() {
				error!("couldn't flip camera", tags![
					("error", &e.to_string())
				]);
			}
		}

		if PAUSE_TOGGLED.swap(false, Ordering::SeqCst) {
			if paused {
				match app.resume() {
					Ok(()) => paused = false,
					Err(e) => error!("couldn't resume", tags![
						("error", &e.to_string())
					]),
				}
			} else {
				app.pause();
				paused = true;
			}
		}

		if render.take_redraw() {
			let snapshot = serde_json::to_string(&render.snapshot())?;
			info!("redraw", tags![
				("overlay", &snapshot)
			]);
		}

		thread::sleep(g.config.redraw_interval());
	}

	app.destroy();
	Ok(())
}

fn main() {
	if let Err(e) = run() {
		error!("something went wrong", tags![
			("error", &e.to_string())
		]);
	}
}
