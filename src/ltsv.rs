// Key value logging macros

use std::thread;

pub type Tags<'a> = Vec<(&'static str, &'a str)>;

// The tags macro is essentially the same as vec![]
// Where the elements are of type (&'static str, &str)

#[macro_export]
macro_rules! tags {
	($($x:expr),*) => {
		vec![
			$($x),*
		]
	};
}

#[macro_export]
macro_rules! info {
	($msg:expr) => {{
		$crate::ltsv::log("info", $msg, $crate::ltsv::Tags::new());
	}};
	($msg:expr, $kvs:expr) => {{
		$crate::ltsv::log("info", $msg, $kvs);
	}};
}

#[macro_export]
macro_rules! warn {
	($msg:expr) => {{
		$crate::ltsv::log("warn", $msg, $crate::ltsv::Tags::new());
	}};
	($msg:expr, $kvs:expr) => {{
		$crate::ltsv::log("warn", $msg, $kvs);
	}};
}

#[macro_export]
macro_rules! error {
	($msg:expr) => {{
		$crate::ltsv::log("error", $msg, $crate::ltsv::Tags::new());
	}};
	($msg:expr, $kvs:expr) => {{
		$crate::ltsv::log("error", $msg, $kvs);
	}};
}

fn ltsv_escape(buf: &mut String, s: &str) {
	for c in s.chars() {
		match c {
			'\\' | '=' => {
				buf.push('\\');
				buf.push(c);
			},
			'\n' => buf.push_str("\\n"),
			'\t' => buf.push_str("\\t"),
			_ => buf.push(c),
		}
	}
}

fn ltsv_encode(buf: &mut String, key: &str, value: &str) {
	if !buf.is_empty() {
		buf.push('\t');
	}
	ltsv_escape(buf, key);
	buf.push('=');
	ltsv_escape(buf, value);
}

pub fn format_line(thread_name: &str,
	               level: &str,
	               msg: &str,
	               tags: &[(&str, &str)]) -> String {
	let mut log_line = String::with_capacity(256);

	// thread, level and msg always come first
	ltsv_encode(&mut log_line, "thread", thread_name);
	ltsv_encode(&mut log_line, "level", level);
	ltsv_encode(&mut log_line, "msg", msg);

	for (key, value) in tags.iter() {
		ltsv_encode(&mut log_line, key, value);
	}
	log_line
}

pub fn log(level: &'static str,
	       msg: &str,
	       tags: Tags) {
	let current = thread::current();
	let name = current.name().unwrap_or("unnamed");
	let log_line = format_line(name, level, msg, &tags);

	// Warnings and errors go to stderr so the overlay
	// snapshots on stdout stay machine readable.
	if level == "info" {
		println!("{}", log_line);
	} else {
		eprintln!("{}", log_line);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn line_starts_with_thread_level_msg() {
		let line = format_line("pupil_left", "info", "worker started",
			&[("eye", "left")]);
		assert_eq!(line,
			"thread=pupil_left\tlevel=info\tmsg=worker started\teye=left");
	}

	#[test]
	fn separators_are_escaped() {
		let line = format_line("t", "warn", "a=b\tc\nd\\", &[]);
		assert_eq!(line, "thread=t\tlevel=warn\tmsg=a\\=b\\tc\\nd\\\\");
	}

	#[test]
	fn tags_macro_builds_pairs() {
		let id = 7.to_string();
		let tags: Tags = tags![("track_id", &id), ("state", "new")];
		assert_eq!(tags, vec![("track_id", "7"), ("state", "new")]);
	}
}
