// Shared mock serial channel for sender tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Timelike};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use mcu_timesync::channel::{ChannelOpener, SerialChannel};
use mcu_timesync::config::{Config, SerialConfig};
use mcu_timesync::error::SyncError;

#[derive(Debug, Default)]
pub struct MockState {
    /// Bytes waiting to be read, one chunk per read.
    pub input: VecDeque<Vec<u8>>,
    /// Moved into `input` once a write lands.
    pub replies: Vec<Vec<u8>>,
    pub writes: Vec<(Instant, Vec<u8>)>,
    pub discards: u32,
    /// Writes never complete.
    pub stall_writes: bool,
    /// Returned by the first read that finds `input` empty.
    pub read_error: Option<io::ErrorKind>,
}

#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    pub state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&self, bytes: &[u8]) {
        self.state.lock().unwrap().input.push_back(bytes.to_vec());
    }

    pub fn reply_with(&self, bytes: &[u8]) {
        self.state.lock().unwrap().replies.push(bytes.to_vec());
    }

    pub fn writes(&self) -> Vec<(Instant, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn discards(&self) -> u32 {
        self.state.lock().unwrap().discards
    }
}

#[async_trait]
impl SerialChannel for MockChannel {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let ready = {
            let mut state = self.state.lock().unwrap();
            if let Some(mut chunk) = state.input.pop_front() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    state.input.push_front(chunk.split_off(n));
                }
                Some(Ok(n))
            } else {
                state.read_error.take().map(|kind| Err(io::Error::from(kind)))
            }
        };
        match ready {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let stalled = self.state.lock().unwrap().stall_writes;
        if stalled {
            return std::future::pending().await;
        }
        let mut state = self.state.lock().unwrap();
        state.writes.push((Instant::now(), buf.to_vec()));
        let replies: Vec<Vec<u8>> = state.replies.drain(..).collect();
        state.input.extend(replies);
        Ok(())
    }

    fn discard_input(&self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.input.clear();
        state.discards += 1;
        Ok(())
    }
}

/// Hands out a shared `MockChannel`, or fails with `fail`.
#[derive(Debug, Clone, Default)]
pub struct MockOpener {
    pub channel: MockChannel,
    pub fail: Option<io::ErrorKind>,
}

impl MockOpener {
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            channel: MockChannel::new(),
            fail: Some(kind),
        }
    }
}

#[async_trait]
impl ChannelOpener for MockOpener {
    type Channel = MockChannel;

    async fn open(&self, config: &SerialConfig) -> Result<MockChannel, SyncError> {
        match self.fail {
            Some(kind) => Err(SyncError::unavailable(&config.device, &io::Error::from(kind))),
            None => Ok(self.channel.clone()),
        }
    }

    fn available_ports(&self) -> Vec<String> {
        vec!["/dev/ttyMOCK0".to_string()]
    }
}

/// Local time at `sec.micros` past an arbitrary minute.
pub fn clock_at(sec: u32, micros: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 9, 10, 15, sec)
        .unwrap()
        .with_nanosecond(micros * 1000)
        .unwrap()
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.serial.device = "/dev/ttyMOCK0".to_string();
    config
}
