use std::fmt;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ErrorType{
	InvalidFrame,
	InvalidConfig,
	CameraUnavailable,
	WorkerSpawn,
}

pub struct Error{
	pub error_type: ErrorType,
}

impl Error {
	pub fn new(error_type: ErrorType) -> Box<Self> {
		Box::new(Self{
			error_type: error_type,
		})
	}

	fn format(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		use ErrorType::*;
		write!(f, "{}", match self.error_type {
			InvalidFrame => "invalid_frame",
			InvalidConfig => "invalid_config",
			CameraUnavailable => "camera_unavailable",
			WorkerSpawn => "worker_spawn",
		})
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.format(f)
	}
}

impl fmt::Debug for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.format(f)
	}
}

impl std::error::Error for Error{}

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
