/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Acceptor server with a custom application.
//!
//! Listens on port 9880 (override with `FIX_PORT`) for a `CLIENT` session
//! and accepts only NewOrderSingle (35=D) application messages.

use async_trait::async_trait;
use fixboot::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

const SETTINGS: &str = "\
[DEFAULT]
ConnectionType=acceptor
SocketAcceptAddress=127.0.0.1
SocketAcceptPort=${FIX_PORT}
HeartBtInt=30

[SESSION]
BeginString=FIX.4.4
SenderCompID=SERVER
TargetCompID=CLIENT
";

#[derive(Debug, Default)]
struct OrderDesk;

#[async_trait]
impl Application for OrderDesk {
    async fn on_create(&self, session_id: &SessionId) {
        info!(%session_id, "session created");
    }

    async fn on_logon(&self, session_id: &SessionId) {
        info!(%session_id, "logon");
    }

    async fn on_logout(&self, session_id: &SessionId) {
        info!(%session_id, "logout");
    }

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(&self, _message: &Message, _session_id: &SessionId) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(&self, message: &Message, session_id: &SessionId) -> Result<(), RejectReason> {
        if message.msg_type().as_str() != "D" {
            return Err(RejectReason::new(11, "Invalid MsgType").with_ref_tag(tags::MSG_TYPE));
        }
        info!(%session_id, order = %message, "order received");
        Ok(())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let port = std::env::var("FIX_PORT").unwrap_or_else(|_| "9880".to_string());
    let variables: HashMap<String, String> = [("FIX_PORT".to_string(), port)].into_iter().collect();
    let settings = SessionSettings::parse_with_variables(SETTINGS, &variables)?;

    let properties = ServerProperties::default().with_concurrent(true);
    let server = assemble(
        &properties,
        ServerOverrides::new()
            .with_session_settings(settings)
            .with_application(Arc::new(OrderDesk)),
    )?;
    server.start()?;
    info!(endpoints = ?server.acceptor().endpoints(), "order desk running");

    tokio::signal::ctrl_c().await?;
    server.stop();
    Ok(())
}
