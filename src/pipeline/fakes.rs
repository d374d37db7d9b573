//! Scripted audio backend and UDP helpers shared by the pipeline tests.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::audio::{
    AudioBackend, AudioBlock, AudioSource, CaptureError, StreamSpec, CANCEL_POLL,
};

/// Backend whose sources produce constant-valued blocks at device pace.
pub(crate) struct FakeBackend {
    level: f32,
    silent: bool,
    fail_open: bool,
    fail_after: Option<usize>,
    opened: AtomicUsize,
    closed_flags: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeBackend {
    pub(crate) fn constant(level: f32) -> Self {
        Self {
            level,
            silent: false,
            fail_open: false,
            fail_after: None,
            opened: AtomicUsize::new(0),
            closed_flags: Mutex::new(Vec::new()),
        }
    }

    /// Every `open` fails as if no loopback device matched.
    pub(crate) fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::constant(0.0)
        }
    }

    /// Sources never deliver a sample, like a loopback with nothing playing.
    pub(crate) fn silent() -> Self {
        Self {
            silent: true,
            ..Self::constant(0.0)
        }
    }

    /// Sources deliver `blocks` blocks, then report a closed stream.
    pub(crate) fn failing_after(mut self, blocks: usize) -> Self {
        self.fail_after = Some(blocks);
        self
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// `true` when every source handed out so far has been closed.
    pub(crate) fn all_closed(&self) -> bool {
        self.closed_flags
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }
}

impl AudioBackend for FakeBackend {
    fn open(
        &self,
        spec: &StreamSpec,
        cancel: Arc<AtomicBool>,
    ) -> Result<Box<dyn AudioSource>, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::NoLoopbackMatch("Speakers".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let closed = Arc::new(AtomicBool::new(false));
        self.closed_flags.lock().unwrap().push(Arc::clone(&closed));

        Ok(Box::new(FakeSource {
            spec: *spec,
            level: self.level,
            silent: self.silent,
            remaining: self.fail_after,
            closed,
            cancel,
        }))
    }
}

struct FakeSource {
    spec: StreamSpec,
    level: f32,
    silent: bool,
    remaining: Option<usize>,
    closed: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl AudioSource for FakeSource {
    fn read_block(&mut self) -> Result<Option<AudioBlock>, CaptureError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CaptureError::StreamClosed);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::StreamClosed);
            }
            *remaining -= 1;
        }

        if self.silent {
            while !self.cancel.load(Ordering::SeqCst) {
                thread::sleep(CANCEL_POLL);
            }
            return Ok(None);
        }

        thread::sleep(self.spec.block_duration());
        Ok(Some(AudioBlock {
            samples: vec![self.level; self.spec.samples_per_block()],
            sample_rate: self.spec.sample_rate,
            channels: self.spec.channels,
        }))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A receiver on 127.0.0.1 standing in for the LED controller.
pub(crate) fn udp_listener() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

/// Drain every datagram that arrives before the read timeout.
pub(crate) fn recv_all(socket: &UdpSocket) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut buf = [0u8; 64];
    while let Ok((n, _)) = socket.recv_from(&mut buf) {
        frames.push(buf[..n].to_vec());
    }
    frames
}
