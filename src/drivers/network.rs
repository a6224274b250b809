//! Remote telemetry client interface

use thiserror::Error;
use ufmt::derive::uDebug;

use super::sensor::MeasureData;

/// Radio link state as reported by the Wi-Fi module
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, uDebug)]
pub enum LinkState {
    Idle = 0,
    NoNetwork = 1,
    Connected = 3,
    ConnectFailed = 4,
    ConnectionLost = 5,
    #[default]
    Disconnected = 6,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub address: [u8; 4],
    pub state: LinkState,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("radio is not connected")]
    NotConnected,
    #[error("telemetry service rejected the upload: {0}")]
    Rejected(u16),
}

/// Narrow interface to the radio and the telemetry endpoint
pub trait NetworkClient: Send {
    fn link_status(&mut self) -> LinkStatus;

    fn upload(&mut self, data: &MeasureData) -> Result<(), NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_link_reads_as_disconnected() {
        let status = LinkStatus::default();
        assert_eq!(status.state, LinkState::Disconnected);
        assert!(!status.is_connected());
    }
}
