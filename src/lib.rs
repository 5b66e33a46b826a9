#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod action;
pub mod actions;
mod address;
pub mod api;
pub mod ccb;
pub mod constants;
pub mod event;
pub mod hci;
pub mod manager;
pub mod output;
pub mod params;
pub mod processor;
pub mod sm;
pub mod state;

use crate::constants::{MAX_CHANNELS, MAX_EVENTS};
use embassy_sync::channel::Channel;
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    mutex::{MappedMutexGuard, Mutex, MutexGuard},
};

pub use address::{AddressKind, DeviceAddress};
pub use ccb::{ConnCcb, ConnId, ConnRole};
pub use event::{ConnEvent, ConnMsg};
pub use manager::DeviceManager;
pub use output::{ActionOutput, DmEvent, HciCommand};
pub use params::{ConnParams, ConnSpec, ScanParams};
pub use state::ConnState;

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, MAX_CHANNELS> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, MAX_CHANNELS> =
    Channel::new();

pub(crate) static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, HciCommand, MAX_CHANNELS> =
    Channel::new();

/// Connection notifications for the application, filled by the processor tasks
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, DmEvent, MAX_EVENTS> = Channel::new();

/// Global `DeviceManager`, initialized by client at runtime
pub(crate) static DEVICE_MANAGER: Mutex<CriticalSectionRawMutex, Option<DeviceManager<'static>>> =
    Mutex::new(None);

/// Initialize the global `DeviceManager` with the given options.
///
/// This function must be called before using any API functions or spawning the processor
/// tasks. The manager is created with the main, initiator and acceptor action sets.
///
/// # Errors
///
/// Returns `ConnError::AlreadyInitialized` if the `DeviceManager` has already been initialized.
///
/// # Example
///
/// ```rust,no_run
/// use linkbird::{init_device_manager, ConnError, DmConnOptions};
///
/// # async fn example() -> Result<(), ConnError> {
/// init_device_manager(DmConnOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn init_device_manager(options: DmConnOptions) -> Result<(), ConnError> {
    let mut guard = DEVICE_MANAGER.lock().await;
    if guard.is_some() {
        return Err(ConnError::AlreadyInitialized);
    }
    *guard = Some(DeviceManager::with_default_roles(options));
    Ok(())
}

/// Get a locked reference to the global `DeviceManager`.
///
/// The lock is held for as long as the guard lives; processor tasks keep it for the
/// duration of one message. API users should use the functions in the `api` module
/// instead.
///
/// # Errors
///
/// Returns `ConnError::NotInitialized` if `init_device_manager` has not been called.
pub async fn device_manager<'a>()
-> Result<MappedMutexGuard<'a, CriticalSectionRawMutex, DeviceManager<'static>>, ConnError> {
    let guard = DEVICE_MANAGER.lock().await;
    if guard.is_none() {
        return Err(ConnError::NotInitialized);
    }
    Ok(MutexGuard::map(guard, |slot| match slot {
        Some(dm) => dm,
        None => unreachable!(),
    }))
}

/// Connection management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnError {
    /// No free connection control block
    NoResources,
    /// Connection id does not name an allocated control block
    UnknownConnection,
    /// Connection is not in a state that allows the operation
    InvalidState,
    /// Another request of the same kind is still pending
    AlreadyInProgress,
    /// The global `DeviceManager` has not been initialized
    NotInitialized,
    /// The global `DeviceManager` has already been initialized
    AlreadyInitialized,
    /// Invalid parameter provided (e.g., malformed address)
    InvalidParameter,
    /// The controller rejected an HCI command
    HciCommandFailed,
}

/// Options for configuring a `DeviceManager` instance
///
/// # Examples
///
/// ```rust
/// use linkbird::{AddressKind, ConnSpec, DmConnOptions};
///
/// // Faster links from a random static address
/// let options = DmConnOptions {
///     own_addr_kind: AddressKind::Random,
///     conn_spec: ConnSpec {
///         interval_min: 0x0006,
///         interval_max: 0x0010,
///         ..ConnSpec::default()
///     },
///     ..DmConnOptions::default()
/// };
/// assert!(options.conn_spec.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmConnOptions {
    /// Local address type used when initiating
    pub own_addr_kind: AddressKind,
    /// Scan parameters used while initiating
    pub scan: ScanParams,
    /// Connection parameters requested when initiating
    pub conn_spec: ConnSpec,
}

/// API requests sent to the processing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Request {
    /// Open a connection to a peer
    Open(DeviceAddress),
    /// Accept a connection, optionally from one peer only
    Accept(Option<DeviceAddress>),
    /// Close a connection with a reason
    Close(ConnId, u8),
    /// Update connection parameters
    Update(ConnId, ConnSpec),
    /// Get the state of a connection
    GetState(ConnId),
}

/// API responses sent back from the processing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Response {
    /// Request accepted for the given connection
    Connection(ConnId),
    /// Request accepted
    Done,
    /// Connection state, `Idle` once the control block is released
    State(ConnState),
    /// Error occurred
    Error(ConnError),
}
