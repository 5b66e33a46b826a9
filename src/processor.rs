//! Processor Tasks - HCI Event, API Request, and HCI Command processing
//!
//! This module contains the processing loops that drive the connection state machine
//! from a real controller. All loops share the global `DeviceManager` via a mutex; the
//! lock is held for exactly one message, so every message runs to completion before
//! the next one is looked at.
//!
//! # Architecture
//!
//! * **HCI Event Processor**: reads controller packets, translates connection events and
//!   routes them through the `DeviceManager`
//! * **API Request Processor**: handles application requests from the `api` module and
//!   answers each one
//! * **HCI Command Processor**: executes the HCI commands produced by the actions. A
//!   rejected command is fed back as the failed completion it will never get, and a
//!   create connection cancel as its own completion
//!
//! Notifications produced by the actions are published on
//! [`EVENT_CHANNEL`](crate::EVENT_CHANNEL).
//!
//! # Generic Parameters
//!
//! * `T: Transport` - The HCI transport layer (UART, USB, etc.)
//! * `SLOTS` - Maximum number of controller command slots (typically 4-8)
//! * `BUFFER_SIZE` - Size of HCI read buffer in bytes (257 or more, the largest HCI event)
//!
//! # Example
//!
//! ```rust,ignore
//! use linkbird::{api, processor, DeviceAddress, DmConnOptions, DmEvent};
//!
//! async fn central(controller: &'static ExternalController<YourTransport, 4>) {
//!     let run = processor::run::<YourTransport, 4, 512>(
//!         DmConnOptions::default(),
//!         controller,
//!     );
//!     let app = async {
//!         let peer = DeviceAddress::public([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
//!         let id = api::open_connection(peer).await?;
//!         if let DmEvent::ConnOpened { handle, .. } = api::next_event().await {
//!             // Link is up
//!         }
//!         api::close_connection(id).await
//!     };
//!     embassy_futures::join::join(run, app).await;
//! }
//! ```

use crate::constants::MAX_ACTION_OUTPUT;
use crate::hci;
use crate::output::{ActionOutput, DmEvent, HciCommand};
use crate::state::ConnState;
use crate::{
    COMMAND_CHANNEL, ConnError, ConnId, DeviceManager, DmConnOptions, EVENT_CHANNEL, REQUEST_CHANNEL,
    RESPONSE_CHANNEL, Request, Response, device_manager,
};
use bt_hci::{
    ControllerToHostPacket,
    controller::{Controller, ExternalController},
    transport::Transport,
};
use heapless::Vec;

async fn hci_event_processor<
    T: Transport + 'static,
    const SLOTS: usize,
    const BUFFER_SIZE: usize,
>(
    controller: &'static ExternalController<T, SLOTS>,
) -> ! {
    let mut read_buffer = [0u8; BUFFER_SIZE];

    loop {
        trace!("[PROCESSOR] Waiting for HCI event...");
        let mut out = ActionOutput::new();
        match controller.read(&mut read_buffer).await {
            Ok(ControllerToHostPacket::Event(event)) => {
                let Some(event) = hci::translate(&event) else {
                    trace!("[PROCESSOR] Ignoring HCI event");
                    continue;
                };
                debug!("[PROCESSOR] HCI event: {:?}", event);
                match device_manager().await {
                    Ok(mut dm) => {
                        dm.handle_hci(event, &mut out);
                    }
                    Err(e) => error!("[PROCESSOR] DeviceManager not initialized: {:?}", e),
                }
            }
            Ok(_) => trace!("[PROCESSOR] Ignoring non-event packet"),
            Err(_) => error!("[PROCESSOR] HCI read error"),
        }
        flush(out).await;
    }
}

/// Handle an API request and build its response
pub(crate) fn process_api_request<const N: usize>(
    dm: &mut DeviceManager<'_, N>,
    request: Request,
    out: &mut ActionOutput,
) -> Response {
    let result = match request {
        Request::Open(peer) => dm.open(peer, out).map(Response::Connection),
        Request::Accept(peer) => dm.accept(peer, out).map(Response::Connection),
        Request::Close(id, reason) => dm.close(id, reason, out).map(|()| Response::Done),
        Request::Update(id, spec) => dm.update(id, spec, out).map(|()| Response::Done),
        Request::GetState(id) => Ok(Response::State(dm.state(id).unwrap_or(ConnState::Idle))),
    };
    result.unwrap_or_else(Response::Error)
}

async fn api_request_processor() -> ! {
    let api_receiver = REQUEST_CHANNEL.receiver();
    let api_sender = RESPONSE_CHANNEL.sender();

    loop {
        let api_request = api_receiver.receive().await;
        debug!("[PROCESSOR] API request: {:?}", api_request);
        let mut out = ActionOutput::new();
        let response = match device_manager().await {
            Ok(mut dm) => process_api_request(&mut dm, api_request, &mut out),
            Err(e) => {
                error!("[PROCESSOR] DeviceManager not initialized: {:?}", e);
                Response::Error(e)
            }
        };
        flush(out).await;
        debug!("[PROCESSOR] API response: {:?}", response);
        api_sender.send(response).await;
    }
}

async fn command_processor<T: Transport + 'static, const SLOTS: usize>(
    controller: &'static ExternalController<T, SLOTS>,
) -> ! {
    let command_receiver = COMMAND_CHANNEL.receiver();

    loop {
        let command = command_receiver.receive().await;
        let executed = hci::execute_command(controller, command).await.is_ok();

        let mut out = ActionOutput::new();
        match device_manager().await {
            Ok(mut dm) => {
                process_command_result(&mut dm, &command, executed, &mut out);
            }
            Err(e) => error!("[PROCESSOR] DeviceManager not initialized: {:?}", e),
        }
        requeue(out);
    }
}

/// Drive the event a finished command stands for, if any
///
/// LE Create Connection Cancel completes with its own return, every command the
/// controller rejected completes with a synthesized failure.
pub(crate) fn process_command_result<const N: usize>(
    dm: &mut DeviceManager<'_, N>,
    command: &HciCommand,
    executed: bool,
    out: &mut ActionOutput,
) -> Option<ConnId> {
    let event = if executed {
        hci::completion_event(command)
    } else {
        hci::failure_event(command)
    }?;
    debug!("[PROCESSOR] Command result: {:?}", event);
    dm.handle_hci(event, out)
}

/// Forward the work of one message: commands to the command processor, notifications
/// to the application
async fn flush(out: ActionOutput) {
    for command in out.commands {
        COMMAND_CHANNEL.sender().send(command).await;
    }
    publish(out.events);
}

/// Like `flush`, for the command processor itself, which must not wait on its own queue
fn requeue(out: ActionOutput) {
    for command in out.commands {
        if COMMAND_CHANNEL.try_send(command).is_err() {
            warn!("[PROCESSOR] Command queue full, dropping {:?}", command);
        }
    }
    publish(out.events);
}

fn publish(events: Vec<DmEvent, MAX_ACTION_OUTPUT>) {
    for event in events {
        if EVENT_CHANNEL.try_send(event).is_err() {
            warn!("[PROCESSOR] Event queue full, dropping {:?}", event);
        }
    }
}

/// Run the connection manager processor tasks
///
/// Initializes the global `DeviceManager` with `options`, then runs the HCI event, API
/// request and HCI command loops until one of them ends, which never happens in
/// practice.
///
/// # Errors
///
/// Returns `ConnError::AlreadyInitialized` if the `DeviceManager` was initialized before.
pub async fn run<T: Transport + 'static, const SLOTS: usize, const BUFFER_SIZE: usize>(
    options: DmConnOptions,
    controller: &'static ExternalController<T, SLOTS>,
) -> Result<(), ConnError> {
    crate::init_device_manager(options).await?;
    info!("[PROCESSOR] DeviceManager initialized");

    embassy_futures::select::select3(
        hci_event_processor::<T, SLOTS, BUFFER_SIZE>(controller),
        api_request_processor(),
        command_processor::<T, SLOTS>(controller),
    )
    .await;
    Ok(())
}
