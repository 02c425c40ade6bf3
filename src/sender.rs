//! # Time-Sync Sender
//!
//! Drives one serial channel through `Closed → Open → Settled → Sent →
//! Receiving`. Each transition happens at most once, so a sender writes
//! exactly one `T<seconds>` command in its lifetime. Failures while opening
//! or sending park the sender in `Failed`.
//!
//! The receive loop runs until the shutdown receiver fires (or its sender is
//! dropped) or a read fails with something other than a timeout.
use std::io::{self, Write};

use tokio::sync::broadcast;
use tokio::time::{Instant, timeout};

use crate::channel::{ChannelOpener, SerialChannel};
use crate::clock::{WallClock, compensated_second};
use crate::command::TimeCommand;
use crate::config::{Config, EchoFormat};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Closed,
    Open,
    Settled,
    Sent,
    Receiving,
    Failed,
}

/// Counters collected by the receive loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub reads: u64,
    pub empty_reads: u64,
    pub bytes_received: u64,
}

pub struct TimeSyncSender<C, K> {
    config: Config,
    clock: K,
    channel: Option<C>,
    state: SenderState,
    opened_at: Option<Instant>,
    sent: Option<TimeCommand>,
}

impl<C: SerialChannel, K: WallClock> TimeSyncSender<C, K> {
    pub fn new(config: Config, clock: K) -> Self {
        Self {
            config,
            clock,
            channel: None,
            state: SenderState::Closed,
            opened_at: None,
            sent: None,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    /// When the channel finished opening.
    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// The command written to the channel, once sent.
    pub fn sent_command(&self) -> Option<TimeCommand> {
        self.sent
    }

    fn expect_state(&self, expected: SenderState) -> Result<(), SyncError> {
        if self.state != expected {
            return Err(SyncError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn channel(&self) -> Result<&C, SyncError> {
        self.channel.as_ref().ok_or(SyncError::InvalidState {
            expected: SenderState::Open,
            actual: self.state,
        })
    }

    pub async fn open<O>(&mut self, opener: &O) -> Result<(), SyncError>
    where
        O: ChannelOpener<Channel = C>,
    {
        self.expect_state(SenderState::Closed)?;
        match opener.open(&self.config.serial).await {
            Ok(channel) => {
                self.channel = Some(channel);
                self.opened_at = Some(Instant::now());
                self.state = SenderState::Open;
                tracing::info!(
                    "Opened {} @ {} baud",
                    self.config.serial.device,
                    self.config.serial.baud
                );
                Ok(())
            }
            Err(e) => {
                self.state = SenderState::Failed;
                Err(e)
            }
        }
    }

    /// Wait out the board's reset chatter, then throw it away.
    pub async fn settle(&mut self) -> Result<(), SyncError> {
        self.expect_state(SenderState::Open)?;
        let settle = self.config.sync.settle();
        tracing::debug!("Waiting {:?} for the device to settle", settle);
        tokio::time::sleep(settle).await;
        self.channel()?.discard_input()?;
        tracing::debug!("Discarded buffered boot output");
        self.state = SenderState::Settled;
        Ok(())
    }

    /// Read the clock, compensate, and write the command.
    pub async fn send_time(&mut self) -> Result<TimeCommand, SyncError> {
        self.expect_state(SenderState::Settled)?;
        let offset = self.config.sync.compensation_secs;
        let command = TimeCommand::new(compensated_second(&self.clock.now(), offset));
        tracing::info!("Delay compensation of {}s added", offset);
        tracing::info!("Sending {}", command);

        let write_timeout = self.config.serial.write_timeout();
        let bytes = command.to_bytes();
        let result = timeout(write_timeout, self.channel()?.write_all(&bytes)).await;
        match result {
            Ok(Ok(())) => {
                self.sent = Some(command);
                self.state = SenderState::Sent;
                Ok(command)
            }
            Ok(Err(e)) => {
                tracing::error!("Serial write error: {}", e);
                self.state = SenderState::Failed;
                Err(SyncError::Io(e))
            }
            Err(_) => {
                tracing::error!("Serial write timeout");
                self.state = SenderState::Failed;
                Err(SyncError::WriteTimeout(write_timeout))
            }
        }
    }

    /// Forward everything the device sends to `out` until shutdown.
    pub async fn receive<W: Write>(
        &mut self,
        out: &mut W,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<ReceiveSummary, SyncError> {
        self.expect_state(SenderState::Sent)?;
        self.state = SenderState::Receiving;

        let format = self.config.output.format;
        let read_timeout = self.config.serial.read_timeout();
        let mut buf = vec![0u8; self.config.serial.buffer_size];
        let mut summary = ReceiveSummary::default();
        let channel = self.channel()?;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Receive loop shutting down");
                    break;
                }
                result = timeout(read_timeout, channel.read(&mut buf)) => {
                    let n = match result {
                        Ok(Ok(n)) => n,
                        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => 0,
                        Ok(Err(e)) => {
                            tracing::error!("Serial read error: {}", e);
                            return Err(SyncError::Io(e));
                        }
                        // Timed out with nothing to read
                        Err(_) => 0,
                    };
                    summary.reads += 1;
                    if n == 0 {
                        summary.empty_reads += 1;
                    }
                    summary.bytes_received += n as u64;
                    tracing::trace!("Read {} bytes from serial", n);
                    echo(out, format, &buf[..n])?;
                }
            }
        }

        tracing::debug!("Receive summary: {:?}", summary);
        Ok(summary)
    }

    /// Open, settle, send, then receive until shutdown.
    pub async fn run<O, W>(
        &mut self,
        opener: &O,
        out: &mut W,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<ReceiveSummary, SyncError>
    where
        O: ChannelOpener<Channel = C>,
        W: Write,
    {
        self.open(opener).await?;
        self.settle().await?;
        self.send_time().await?;
        self.receive(out, shutdown).await
    }
}

/// Spawn a task that fires `shutdown` once `signal` resolves, e.g.
/// `tokio::signal::ctrl_c()`. If `signal` fails the task parks while still
/// holding the sender, so the receive loop keeps running.
pub fn forward_shutdown<F>(signal: F, shutdown: broadcast::Sender<()>) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("Interrupt received");
                let _ = shutdown.send(());
            }
            Err(e) => {
                tracing::warn!("Failed to install Ctrl-C handler: {}", e);
                let _keep = shutdown;
                std::future::pending::<()>().await;
            }
        }
    })
}

/// Map the outcome of [`TimeSyncSender::run`] to the process result.
///
/// An unopenable port is reported and treated as a clean exit; every other
/// error is returned to the caller.
pub fn exit_policy<O: ChannelOpener>(
    result: Result<ReceiveSummary, SyncError>,
    opener: &O,
) -> Result<(), SyncError> {
    match result {
        Ok(summary) => {
            tracing::info!(
                "Received {} bytes over {} reads",
                summary.bytes_received,
                summary.reads
            );
            Ok(())
        }
        Err(e) if e.is_channel_unavailable() => {
            tracing::error!("{}", e);
            let ports = opener.available_ports();
            if !ports.is_empty() {
                tracing::info!("Available serial ports: {}", ports.join(", "));
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Python-style bytes literal, e.g. `b'ok\r\n'`.
pub fn bytes_literal(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') { b'"' } else { b'\'' };
    let mut s = String::with_capacity(bytes.len() + 3);
    s.push('b');
    s.push(quote as char);
    for &b in bytes {
        match b {
            b'\'' | b'"' if b != quote => s.push(b as char),
            _ => s.extend(b.escape_ascii().map(char::from)),
        }
    }
    s.push(quote as char);
    s
}

/// Render one read to the output sink.
pub fn echo<W: Write>(out: &mut W, format: EchoFormat, bytes: &[u8]) -> io::Result<()> {
    match format {
        EchoFormat::Escaped => writeln!(out, "{}", bytes_literal(bytes))?,
        EchoFormat::Raw => out.write_all(bytes)?,
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_escaped() {
        let mut out = Vec::new();
        echo(&mut out, EchoFormat::Escaped, b"ok\r\n").unwrap();
        echo(&mut out, EchoFormat::Escaped, b"").unwrap();
        echo(&mut out, EchoFormat::Escaped, &[0x00, b'"']).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b'ok\\r\\n'\nb''\nb'\\x00\"'\n");
    }

    #[test]
    fn test_bytes_literal_quoting() {
        assert_eq!(bytes_literal(b"it's"), "b\"it's\"");
        assert_eq!(bytes_literal(b"'\""), "b'\\'\"'");
        assert_eq!(bytes_literal(b"\\\t\xff"), "b'\\\\\\t\\xff'");
    }

    #[test]
    fn test_echo_raw() {
        let mut out = Vec::new();
        echo(&mut out, EchoFormat::Raw, b"12:00:13\n").unwrap();
        echo(&mut out, EchoFormat::Raw, b"").unwrap();
        assert_eq!(out, b"12:00:13\n");
    }
}
