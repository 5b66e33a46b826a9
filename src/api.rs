//! `Linkbird` API Functions
//!
//! This module provides the public API functions for interacting with the processor
//! tasks. These functions use static channels to communicate with the tasks started by
//! [`processor::run`](crate::processor::run); each call sends one request and waits for
//! its answer.
//!
//! Connection progress is reported asynchronously: an accepted `open_connection` only
//! means LE Create Connection was issued. Wait for `DmEvent::ConnOpened` or
//! `DmEvent::ConnClosed` with [`next_event`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use linkbird::api::{close_connection, next_event, open_connection};
//! use linkbird::{DeviceAddress, DmEvent};
//!
//! let peer = DeviceAddress::try_from("66:55:44:33:22:11")?;
//! let id = open_connection(peer).await?;
//!
//! match next_event().await {
//!     DmEvent::ConnOpened { conn_id, .. } if conn_id == id => {
//!         close_connection(id).await?;
//!     }
//!     _ => {}
//! }
//! ```

use crate::constants::HCI_ERR_REMOTE_TERMINATED;
use crate::{
    ConnError, ConnId, ConnSpec, ConnState, DeviceAddress, DmEvent, EVENT_CHANNEL,
    REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response,
};

async fn request(request: Request) -> Response {
    REQUEST_CHANNEL.sender().send(request).await;
    RESPONSE_CHANNEL.receiver().receive().await
}

/// Open a connection to a peer device.
///
/// # Errors
///
/// Returns an error if another open is pending, no control block is free, the configured
/// connection parameters are invalid, or the manager is not initialized.
pub async fn open_connection(peer: DeviceAddress) -> Result<ConnId, ConnError> {
    match request(Request::Open(peer)).await {
        Response::Connection(id) => Ok(id),
        Response::Error(e) => Err(e),
        _ => Err(ConnError::InvalidState),
    }
}

/// Accept a connection from any central, or only from `peer`.
///
/// # Errors
///
/// Returns an error if the device is already accepting, no control block is free, or
/// the manager is not initialized.
pub async fn accept_connection(peer: Option<DeviceAddress>) -> Result<ConnId, ConnError> {
    match request(Request::Accept(peer)).await {
        Response::Connection(id) => Ok(id),
        Response::Error(e) => Err(e),
        _ => Err(ConnError::InvalidState),
    }
}

/// Close a connection, or cancel a pending open or accept.
///
/// The peer is told the remote user terminated the connection.
///
/// # Errors
///
/// Returns an error if the connection is unknown or the manager is not initialized.
pub async fn close_connection(id: ConnId) -> Result<(), ConnError> {
    close_connection_with_reason(id, HCI_ERR_REMOTE_TERMINATED).await
}

/// Close a connection with an explicit HCI reason.
///
/// # Errors
///
/// Returns an error if the connection is unknown or the manager is not initialized.
pub async fn close_connection_with_reason(id: ConnId, reason: u8) -> Result<(), ConnError> {
    match request(Request::Close(id, reason)).await {
        Response::Done => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(ConnError::InvalidState),
    }
}

/// Request new parameters for an established connection.
///
/// # Errors
///
/// Returns an error if the connection is unknown or not connected, the parameters are
/// invalid, or the manager is not initialized.
pub async fn update_connection(id: ConnId, spec: ConnSpec) -> Result<(), ConnError> {
    match request(Request::Update(id, spec)).await {
        Response::Done => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(ConnError::InvalidState),
    }
}

/// Get the state of a connection; released connections report `Idle`.
///
/// # Errors
///
/// Returns an error if the manager is not initialized.
pub async fn connection_state(id: ConnId) -> Result<ConnState, ConnError> {
    match request(Request::GetState(id)).await {
        Response::State(state) => Ok(state),
        Response::Error(e) => Err(e),
        _ => Err(ConnError::InvalidState),
    }
}

/// Wait for the next connection notification.
pub async fn next_event() -> DmEvent {
    EVENT_CHANNEL.receiver().receive().await
}

/// Get the next connection notification, if one is queued.
#[must_use]
pub fn try_next_event() -> Option<DmEvent> {
    EVENT_CHANNEL.try_receive().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ActionOutput;
    use crate::processor::process_api_request;
    use crate::{ConnRole, DeviceManager, DmConnOptions};
    use embassy_futures::{block_on, join::join};

    /// Stand-in for the API request processor, answering `count` requests
    async fn serve(count: usize) {
        let mut dm: DeviceManager<'static, 2> =
            DeviceManager::with_default_roles(DmConnOptions::default());
        for _ in 0..count {
            let request = REQUEST_CHANNEL.receive().await;
            let mut out = ActionOutput::new();
            let response = process_api_request(&mut dm, request, &mut out);
            RESPONSE_CHANNEL.send(response).await;
        }
    }

    #[test]
    fn test_api_round_trips() {
        let peer = DeviceAddress::public([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let client = async {
            let id = open_connection(peer).await.unwrap();
            assert_eq!(connection_state(id).await, Ok(ConnState::Connecting));
            assert_eq!(
                open_connection(peer).await,
                Err(ConnError::AlreadyInProgress)
            );
            assert_eq!(
                update_connection(id, ConnSpec::default()).await,
                Err(ConnError::InvalidState)
            );
            close_connection(id).await.unwrap();
            assert_eq!(connection_state(id).await, Ok(ConnState::Disconnecting));

            let acceptor = accept_connection(None).await.unwrap();
            assert_ne!(acceptor, id);
            close_connection_with_reason(acceptor, 0x15).await.unwrap();
            assert_eq!(connection_state(acceptor).await, Ok(ConnState::Idle));
        };

        block_on(join(serve(9), client));
    }

    #[test]
    fn test_try_next_event() {
        let event = DmEvent::ConnOpened {
            conn_id: ConnId::new(1),
            handle: 0x0040,
            role: ConnRole::Central,
            peer: DeviceAddress::public([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]),
            params: crate::ConnParams::default(),
        };

        assert!(EVENT_CHANNEL.try_send(event).is_ok());
        assert_eq!(try_next_event(), Some(event));
        assert_eq!(try_next_event(), None);
    }
}
