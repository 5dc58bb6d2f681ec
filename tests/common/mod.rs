#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Default)]
struct Outbound {
    bytes: Vec<u8>,
    // how far the simulated dongle has read
    cursor: usize,
}

#[derive(Default)]
struct LinkState {
    rx: Mutex<VecDeque<u8>>,
    rx_available: Condvar,
    tx: Mutex<Outbound>,
    tx_available: Condvar,
    eof: AtomicBool,
    fail_writes: AtomicBool,
}

/// The dongle end of a simulated serial link.
#[derive(Clone)]
pub struct SimDongle {
    link: Arc<LinkState>,
}

/// Host-side read half, handed to `Dongle::attach`.
pub struct HostInput {
    link: Arc<LinkState>,
    pub timeout: Duration,
}

/// Host-side write half, handed to `Dongle::attach`.
pub struct HostOutput {
    link: Arc<LinkState>,
}

impl SimDongle {
    pub fn new() -> (SimDongle, HostInput, HostOutput) {
        let link = Arc::new(LinkState::default());
        let input = HostInput {
            link: Arc::clone(&link),
            timeout: Duration::from_millis(20),
        };
        let output = HostOutput {
            link: Arc::clone(&link),
        };
        (SimDongle { link }, input, output)
    }

    /// Send a line to the host, terminator included.
    pub fn send_line(&self, line: &str) {
        self.send_raw(format!("{}\n", line).as_bytes());
    }

    pub fn send_raw(&self, bytes: &[u8]) {
        self.link.rx.lock().unwrap().extend(bytes);
        self.link.rx_available.notify_all();
    }

    /// Everything the host has written so far.
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.link.tx.lock().unwrap().bytes).into_owned()
    }

    /// Non-empty lines the host has written so far.
    pub fn written_lines(&self) -> Vec<String> {
        self.written()
            .split('\n')
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Next non-empty command line from the host, waiting up to `timeout`.
    pub fn next_command(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut tx = self.link.tx.lock().unwrap();
        loop {
            while let Some(len) = tx.bytes[tx.cursor..].iter().position(|&b| b == b'\n') {
                let start = tx.cursor;
                tx.cursor += len + 1;
                if len > 0 {
                    return Some(String::from_utf8_lossy(&tx.bytes[start..start + len]).into_owned());
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tx = self
                .link
                .tx_available
                .wait_timeout(tx, deadline - now)
                .expect("Mutex lock failed")
                .0;
        }
    }

    /// True if the host has written a complete command that was not read yet.
    pub fn has_pending_command(&self) -> bool {
        let tx = self.link.tx.lock().unwrap();
        tx.bytes[tx.cursor..]
            .split(|&b| b == b'\n')
            .rev()
            .skip(1)
            .any(|line| !line.is_empty())
    }

    /// Close the link from the dongle side; host reads return EOF once drained.
    pub fn hang_up(&self) {
        self.link.eof.store(true, SeqCst);
        self.link.rx_available.notify_all();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.link.fail_writes.store(fail, SeqCst);
    }
}

impl std::io::Read for HostInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            panic!("Testsuite called read with zero length buffer.")
        }
        let rx = self.link.rx.lock().expect("Read mutex is poisoned");
        let mut rx = self
            .link
            .rx_available
            .wait_timeout_while(rx, self.timeout, |rx| {
                rx.is_empty() && !self.link.eof.load(SeqCst)
            })
            .expect("Mutex lock failed")
            .0;

        if rx.is_empty() {
            return if self.link.eof.load(SeqCst) {
                Ok(0)
            } else {
                Err(Error::new(ErrorKind::TimedOut, "IO read timeout"))
            };
        }
        let len = buf.len().min(rx.len());
        for (dst, src) in buf.iter_mut().zip(rx.drain(..len)) {
            *dst = src;
        }
        Ok(len)
    }
}

impl std::io::Write for HostOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.link.fail_writes.load(SeqCst) {
            return Err(Error::new(ErrorKind::BrokenPipe, "IO write error"));
        }
        self.link.tx.lock().unwrap().bytes.extend_from_slice(buf);
        self.link.tx_available.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
