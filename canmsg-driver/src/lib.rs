//! canmsg driver interface
//!
//! The crate provides an interface between a CAN controller driver and the canmsg message
//! objects. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. canmsg users should depend on the `canmsg`
//! crate instead.
//!
//! A [`Controller`](controller::Controller) exposes the handful of synchronous operations a
//! message object needs:
//! * transmit mailbox allocation, staging and transmission request
//! * polling for a remote transmission request addressed to a given identifier
//! * polling for a received data frame with a given identifier and length
//!
//! Unlike a general CAN stack, the interface does not cover bit timing, filter tables,
//! arbitration loss or bus-off recovery. Those remain the driver's responsibility.
//!
//! The controller is shared by every message bound to the same bus. All methods take `&self`,
//! so a driver must synchronize its own bus state, e.g. with a blocking mutex.
//!
//! The [`loopback`] module provides an in-memory controller for host-side testing.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod controller;
pub mod frame;
pub mod loopback;

pub use canmsg_core as core;
