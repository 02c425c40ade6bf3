// src/lib.rs - Serial time-sync sender for microcontroller clocks
pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod sender;

pub use channel::{ChannelOpener, Serial2Channel, Serial2Opener, SerialChannel};
pub use clock::{FixedClock, SystemClock, WallClock};
pub use command::TimeCommand;
pub use config::{Config, ConfigError};
pub use error::{SyncError, UnavailableReason};
pub use sender::{ReceiveSummary, SenderState, TimeSyncSender};
