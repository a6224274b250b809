use std::sync::Arc;

use log::{error, warn};

use crate::config::{ConfigReader, ConfigSnapshot};
use crate::drivers::network::{NetworkClient, NetworkError};
use crate::drivers::sensor::MeasureData;
use crate::os::{self, Tick};
use crate::protocol::{GatewayRequest, GatewayResponse, StatusData};
use crate::rtos::{Consumer, Producer, Runnable, Step, TaskContext};

/// Serves gateway requests one at a time
pub struct GatewayTask<N> {
    network: N,
    requests: Consumer<GatewayRequest>,
    responses: Producer<GatewayResponse>,
    config: Arc<dyn ConfigReader>,
}

impl<N: NetworkClient> GatewayTask<N> {
    pub fn new(
        network: N,
        requests: Consumer<GatewayRequest>,
        responses: Producer<GatewayResponse>,
        config: Arc<dyn ConfigReader>,
    ) -> Self {
        Self {
            network,
            requests,
            responses,
            config,
        }
    }

    /// Run one request against the network. Never fails; problems end up in
    /// the response's success flag.
    pub fn dispatch(&mut self, request: &GatewayRequest, now: Tick) -> GatewayResponse {
        match request {
            GatewayRequest::Nop => GatewayResponse::nop(),
            GatewayRequest::GetStatus => {
                GatewayResponse::status(StatusData::new(self.network.link_status(), now))
            }
            GatewayRequest::SendData(data) => match self.upload(data) {
                Ok(()) => GatewayResponse::sent(true),
                Err(err) => {
                    warn!("upload failed: {}", err);
                    GatewayResponse::sent(false)
                }
            },
        }
    }

    fn upload(&mut self, data: &MeasureData) -> Result<(), NetworkError> {
        if !self.network.link_status().is_connected() {
            return Err(NetworkError::NotConnected);
        }
        self.network.upload(data)
    }
}

impl<N: NetworkClient + 'static> Runnable for GatewayTask<N> {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn setup(&mut self, ctx: &mut TaskContext) {
        let config = ConfigSnapshot::load(self.config.as_ref());
        ctx.set_fps(config.wifi_task_fps);
    }

    fn step(&mut self, _ctx: &mut TaskContext) -> Step {
        // a response could not be delivered, so don't take new work
        if self.responses.free() == 0 {
            os::delay(1);
            return Step::Continue;
        }

        let request = match self.requests.receive() {
            Ok(request) => request,
            Err(err) => {
                error!("request queue gone: {}", err);
                return Step::Stop;
            }
        };
        let response = self.dispatch(&request, os::tick_count());
        if self.responses.send(response).is_err() {
            error!("{:?} response lost", response.kind);
        }
        Step::Continue
    }
}
