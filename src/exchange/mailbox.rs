// mailbox is a single slot, latest-wins channel.
// send never blocks and overwrites anything still
// pending, so a slow receiver only ever sees the most
// recent value. There is one Sender and one Receiver.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct Slot<T> {
	pending: Mutex<Option<T>>,
	ready: Condvar,
	dropped_sender: AtomicBool,
	dropped_receiver: AtomicBool,
}

impl<T> Slot<T> {
	fn lock(&self) -> MutexGuard<'_, Option<T>> {
		// A panicking holder can't leave the Option in a
		// torn state so poisoning is ignored.
		self.pending.lock().unwrap_or_else(|e| e.into_inner())
	}
}

pub struct Sender<T> {
	slot: Arc<Slot<T>>,
}

pub struct Receiver<T> {
	slot: Arc<Slot<T>>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Delivery {
	// The slot was empty
	Fresh,
	// An unconsumed value was overwritten
	Replaced,
	// The receiver is gone, the value was dropped
	Disconnected,
}

#[derive(PartialEq, Debug)]
pub enum Recv<T> {
	Ready(T),
	Empty,
	Closed,
}

pub fn mailbox<T>() -> (Sender<T>, Receiver<T>) {
	let slot = Arc::new(Slot{
		pending: Mutex::new(None),
		ready: Condvar::new(),
		dropped_sender: AtomicBool::new(false),
		dropped_receiver: AtomicBool::new(false),
	});

	(Sender{slot: slot.clone()}, Receiver{slot: slot})
}

impl<T> Sender<T> {
	pub fn send(&self, value: T) -> Delivery {
		if self.slot.dropped_receiver.load(Ordering::SeqCst) {
			return Delivery::Disconnected;
		}

		let previous = {
			let mut pending = self.slot.lock();
			pending.replace(value)
		};
		self.slot.ready.notify_one();

		match previous {
			Some(_) => Delivery::Replaced,
			None => Delivery::Fresh,
		}
	}
}

impl<T> Drop for Sender<T> {
	fn drop(&mut self) {
		self.slot.dropped_sender.store(true, Ordering::SeqCst);
		// Hold the lock so a receiver between its check
		// and its wait can't miss the wakeup.
		let _pending = self.slot.lock();
		self.slot.ready.notify_all();
	}
}

impl<T> Receiver<T> {
	#[cfg(test)]
	pub fn try_recv(&self) -> Recv<T> {
		let mut pending = self.slot.lock();
		match pending.take() {
			Some(v) => Recv::Ready(v),
			None if self.slot.dropped_sender.load(Ordering::SeqCst) => Recv::Closed,
			None => Recv::Empty,
		}
	}

	// Take the pending value, waiting at most timeout
	// for one to arrive.
	pub fn recv_timeout(&self, timeout: Duration) -> Recv<T> {
		let mut pending = self.slot.lock();
		if let Some(v) = pending.take() {
			return Recv::Ready(v);
		}
		if self.slot.dropped_sender.load(Ordering::SeqCst) {
			return Recv::Closed;
		}

		let (mut pending, _) = self.slot.ready
			.wait_timeout(pending, timeout)
			.unwrap_or_else(|e| e.into_inner());

		match pending.take() {
			Some(v) => Recv::Ready(v),
			None if self.slot.dropped_sender.load(Ordering::SeqCst) => Recv::Closed,
			None => Recv::Empty,
		}
	}
}

impl<T> Drop for Receiver<T> {
	fn drop(&mut self) {
		self.slot.dropped_receiver.store(true, Ordering::SeqCst);
		// Free whatever was left behind
		self.slot.lock().take();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;
	use std::time::Instant;

	#[test]
	fn second_send_replaces_the_first() {
		let (sx, rx) = mailbox();
		assert_eq!(sx.send(1), Delivery::Fresh);
		assert_eq!(sx.send(2), Delivery::Replaced);
		assert_eq!(rx.try_recv(), Recv::Ready(2));
		assert_eq!(rx.try_recv(), Recv::Empty);
	}

	#[test]
	fn recv_timeout_is_bounded() {
		let (_sx, rx) = mailbox::<u8>();
		let start = Instant::now();
		assert_eq!(rx.recv_timeout(Duration::from_millis(20)), Recv::Empty);
		assert!(start.elapsed() >= Duration::from_millis(15));
	}

	#[test]
	fn recv_timeout_wakes_on_send() {
		let (sx, rx) = mailbox();
		let handle = thread::spawn(move || {
			rx.recv_timeout(Duration::from_secs(5))
		});
		thread::sleep(Duration::from_millis(20));
		sx.send("frame");
		let got = handle.join().expect("receiver thread");
		assert_eq!(got, Recv::Ready("frame"));
	}

	#[test]
	fn dropping_either_side_disconnects() {
		let (sx, rx) = mailbox::<u8>();
		drop(sx);
		assert_eq!(rx.recv_timeout(Duration::from_millis(1)), Recv::Closed);

		let (sx, rx) = mailbox::<u8>();
		drop(rx);
		assert_eq!(sx.send(3), Delivery::Disconnected);
	}

	#[test]
	fn pending_value_survives_sender_drop() {
		let (sx, rx) = mailbox();
		sx.send(5);
		drop(sx);
		assert_eq!(rx.try_recv(), Recv::Ready(5));
		assert_eq!(rx.try_recv(), Recv::Closed);
	}
}
