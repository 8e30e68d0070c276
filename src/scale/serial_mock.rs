//! Mock serial transport for testing
//!
//! This module provides a scripted in-memory transport that can be used to test
//! the scale session and polling loop without requiring actual hardware.

use crate::constants::CAS_ACK;
use crate::scale::frame::{pack_frame, ScaleFrame};
use crate::scale::serial::{ScaleTransport, SerialConfig};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    open: bool,
    open_count: u32,
    close_count: u32,
    /// Number of upcoming `open` calls that fail
    open_failures: u32,
    last_config: Option<SerialConfig>,
    tx_buffer: Vec<u8>,
    rx_buffer: VecDeque<u8>,
    /// Error returned once the given number of further reads have succeeded
    read_error: Option<(u32, io::Error)>,
    next_write_error: Option<io::Error>,
    next_close_error: Option<io::Error>,
}

/// Mock transport that simulates a scale on the other end of the line.
///
/// Clones share state, so a test can keep one handle while the session owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.state.lock().unwrap().rx_buffer.extend(data);
    }

    /// Queue the ACK a scale sends in reply to ENQ
    pub fn queue_ack(&self) {
        self.queue_rx_data(&[CAS_ACK]);
    }

    /// Queue a full successful exchange: ACK followed by the packed frame
    pub fn queue_reading(&self, frame: &ScaleFrame) {
        self.queue_ack();
        // weights outside the 6-digit field cannot be sent by a real scale either
        if let Ok(bytes) = pack_frame(frame) {
            self.queue_rx_data(&bytes);
        }
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.state.lock().unwrap().tx_buffer.clone()
    }

    /// Number of bytes still waiting to be read
    pub fn pending_rx(&self) -> usize {
        self.state.lock().unwrap().rx_buffer.len()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.tx_buffer.clear();
        state.rx_buffer.clear();
    }

    /// Make the next `n` calls to `open` fail
    pub fn fail_next_opens(&self, n: u32) {
        self.state.lock().unwrap().open_failures = n;
    }

    /// Set an error to be returned on the next read
    pub fn set_next_read_error(&self, error: io::Error) {
        self.set_read_error_after(0, error);
    }

    /// Let `reads` more reads succeed, then fail the one after with `error`
    pub fn set_read_error_after(&self, reads: u32, error: io::Error) {
        self.state.lock().unwrap().read_error = Some((reads, error));
    }

    /// Set an error to be returned on the next write
    pub fn set_next_write_error(&self, error: io::Error) {
        self.state.lock().unwrap().next_write_error = Some(error);
    }

    /// Set an error to be returned on the next close
    pub fn set_next_close_error(&self, error: io::Error) {
        self.state.lock().unwrap().next_close_error = Some(error);
    }

    /// Simulate the device disappearing without the port being closed
    pub fn unplug(&self) {
        self.state.lock().unwrap().open = false;
    }

    pub fn open_count(&self) -> u32 {
        self.state.lock().unwrap().open_count
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().unwrap().close_count
    }

    /// Configuration passed to the most recent successful `open`
    pub fn last_config(&self) -> Option<SerialConfig> {
        self.state.lock().unwrap().last_config.clone()
    }
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "mock port is not open")
}

#[async_trait::async_trait]
impl ScaleTransport for MockTransport {
    async fn open(&mut self, config: &SerialConfig) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.open {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "mock port is already open",
            ));
        }
        if state.open_failures > 0 {
            state.open_failures -= 1;
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not open port {}", config.port),
            ));
        }
        state.open = true;
        state.open_count += 1;
        state.last_config = Some(config.clone());
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.next_close_error.take() {
            return Err(error);
        }
        state.open = false;
        state.close_count += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(not_open());
        }
        if let Some(error) = state.next_write_error.take() {
            return Err(error);
        }
        state.tx_buffer.extend_from_slice(data);
        Ok(())
    }

    async fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(not_open());
        }
        match state.read_error.take() {
            Some((0, error)) => return Err(error),
            Some((reads, error)) => state.read_error = Some((reads - 1, error)),
            None => {}
        }
        let available = state.rx_buffer.len().min(n);
        Ok(state.rx_buffer.drain(..available).collect())
    }
}
