//! Request/response messages between the display task and the gateway task
//!
//! Every request produces exactly one response carrying the same kind.

use ufmt::derive::uDebug;

use crate::drivers::network::{LinkState, LinkStatus};
use crate::drivers::sensor::MeasureData;
use crate::os::Tick;

#[derive(Copy, Clone, Debug, PartialEq, Eq, uDebug)]
pub enum RequestKind {
    Nop = 0,
    GetStatus = 1,
    SendData = 2,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GatewayRequest {
    Nop,
    GetStatus,
    /// Upload one reading to the telemetry service
    SendData(MeasureData),
}

impl GatewayRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            GatewayRequest::Nop => RequestKind::Nop,
            GatewayRequest::GetStatus => RequestKind::GetStatus,
            GatewayRequest::SendData(_) => RequestKind::SendData,
        }
    }
}

/// Link snapshot returned for `GetStatus`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusData {
    pub address: [u8; 4],
    pub state: LinkState,
    pub timestamp: Tick,
}

impl StatusData {
    pub fn new(link: LinkStatus, timestamp: Tick) -> Self {
        Self {
            address: link.address,
            state: link.state,
            timestamp,
        }
    }

    pub fn link(&self) -> LinkStatus {
        LinkStatus {
            address: self.address,
            state: self.state,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GatewayResponse {
    pub kind: RequestKind,
    /// Set only for `GetStatus`
    pub status: Option<StatusData>,
    pub success: bool,
}

impl GatewayResponse {
    pub fn nop() -> Self {
        Self {
            kind: RequestKind::Nop,
            status: None,
            success: true,
        }
    }

    pub fn status(status: StatusData) -> Self {
        Self {
            kind: RequestKind::GetStatus,
            status: Some(status),
            success: true,
        }
    }

    pub fn sent(success: bool) -> Self {
        Self {
            kind: RequestKind::SendData,
            status: None,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_echo_request_kind() {
        let reading = MeasureData::default();
        let pairs = [
            (GatewayRequest::Nop, GatewayResponse::nop()),
            (
                GatewayRequest::GetStatus,
                GatewayResponse::status(StatusData::default()),
            ),
            (GatewayRequest::SendData(reading), GatewayResponse::sent(false)),
        ];
        for (request, response) in pairs {
            assert_eq!(request.kind(), response.kind);
        }
    }

    #[test]
    fn status_round_trips_link() {
        let link = LinkStatus {
            address: [10, 0, 0, 2],
            state: LinkState::Connected,
        };
        assert_eq!(StatusData::new(link, 42).link(), link);
    }
}
