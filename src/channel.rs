//! Serial channel abstraction and the serial2-tokio backed implementation.
use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::io;

use crate::config::SerialConfig;
use crate::error::SyncError;

/// Byte-oriented duplex connection to the microcontroller.
#[async_trait]
pub trait SerialChannel: Send + Sync {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
    async fn write_all(&self, buf: &[u8]) -> io::Result<()>;
    /// Drop whatever is sitting in the OS input buffer.
    fn discard_input(&self) -> io::Result<()>;
}

/// Opens channels from configuration.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    type Channel: SerialChannel;

    async fn open(&self, config: &SerialConfig) -> Result<Self::Channel, SyncError>;
    fn available_ports(&self) -> Vec<String>;
}

/// A real serial port.
pub struct Serial2Channel {
    port: SerialPort,
}

#[async_trait]
impl SerialChannel for Serial2Channel {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf).await
    }

    async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf).await
    }

    fn discard_input(&self) -> io::Result<()> {
        self.port.discard_input_buffer()
    }
}

/// Opens serial ports through serial2-tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial2Opener;

#[async_trait]
impl ChannelOpener for Serial2Opener {
    type Channel = Serial2Channel;

    async fn open(&self, config: &SerialConfig) -> Result<Serial2Channel, SyncError> {
        let port = SerialPort::open(&config.device, config.baud)
            .map_err(|e| SyncError::unavailable(&config.device, &e))?;
        tracing::debug!("Opened {} @ {} baud", config.device, config.baud);
        Ok(Serial2Channel { port })
    }

    fn available_ports(&self) -> Vec<String> {
        match SerialPort::available_ports() {
            Ok(paths) => paths.iter().map(|p| p.display().to_string()).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate serial ports: {}", e);
                vec![]
            }
        }
    }
}
