//! Process-backed service factory

use std::sync::Arc;

use rscc_core::config::RsccConfig;
use rscc_core::traits::{
    HandshakeService, RelayService, RemoteDesktopServer, RemoteDesktopViewer, ServiceFactory,
};
use rscc_core::{RelayInitiator, RelayMode, Role};

use crate::handshake::HelperHandshake;
use crate::relay::HelperRelay;
use crate::vnc::{VncServerHandler, VncServerSettings, VncViewerHandler, VncViewerSettings};

/// Creates services that run the configured external programs
#[derive(Debug, Clone)]
pub struct ProcessServiceFactory {
    config: RsccConfig,
}

impl ProcessServiceFactory {
    pub fn from_config(config: &RsccConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ServiceFactory for ProcessServiceFactory {
    fn handshake(&self, role: Role) -> Arc<dyn HandshakeService> {
        Arc::new(HelperHandshake::from_config(&self.config, role))
    }

    fn relay(&self, mode: RelayMode, initiator: RelayInitiator) -> Arc<dyn RelayService> {
        Arc::new(HelperRelay::from_config(&self.config, mode, initiator))
    }

    fn server(&self) -> Arc<dyn RemoteDesktopServer> {
        Arc::new(VncServerHandler::new(VncServerSettings::from_config(
            &self.config,
        )))
    }

    fn viewer(&self) -> Arc<dyn RemoteDesktopViewer> {
        Arc::new(VncViewerHandler::new(VncViewerSettings::from_config(
            &self.config,
        )))
    }
}
