//! # canmsg
//!
//! This library provides fixed-layout CAN message objects for no_std environments. A message
//! object is configured once with an identifier, a data length (0 to 8 bytes), a frame kind and
//! a direction. After that it either collects payload bytes for transmission or hands out the
//! bytes of the most recently received frame.
//!
//! All state lives inside the message object. No dynamic memory allocation is required.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────┐
//!                    │ Descriptor │
//!                    └─────┬──────┘
//!                 bind     │
//!          ┌───────────────┴───────────────┐
//!          ▼                               ▼
//!   ┌─────────────┐                 ┌─────────────┐
//!   │  TxMessage  │                 │  RxMessage  │
//!   └──────┬──────┘                 └──────┬──────┘
//!          │        ┌────────────┐         │
//!          └───────►│ Controller │◄────────┘
//!                   └────────────┘
//! ```
//! Components:
//! * _Descriptor_ validates the message configuration as a unit.
//! * _TxMessage_ fills slots byte by byte with write-once semantics and sends the frame once
//!   every slot is filled. It can also send remote transmission requests and poll for remote
//!   requests addressed to its identifier.
//! * _RxMessage_ fetches one frame at a time and drains it byte by byte. A new frame is only
//!   accepted once the previous one is fully drained.
//! * _Controller_ is the CAN peripheral driver. The [`driver`] crate defines the interface.
//! * _Message_ wraps both directions behind one type, with the direction chosen at run time.
//!
//! ## Concurrency model
//!
//! Every message keeps its state in a blocking mutex and each operation runs as a single
//! critical section, including the exchange with the controller. There are two useful mutex
//! options:
//! * _CriticalSectionRawMutex_ allows a message to be shared between an interrupt handler and
//!   the main loop. A receive message polled from the receive interrupt never exposes a
//!   partially written frame to the draining code.
//! * _NoopRawMutex_ and _ThreadModeRawMutex_ have no system-wide effects but require all
//!   accesses to come from the same execution context.
//!
//! Critical sections are bounded: no operation loops on the controller or waits for the bus.
//!
//! ```rust,ignore
//! static CAN: StaticCell<Can> = StaticCell::new();
//! static RX: StaticCell<RxMessage<'static, CriticalSectionRawMutex, Can>> = StaticCell::new();
//!
//! #[interrupt]
//! fn CAN_RX0() {
//!     let _ = rx().check_for_new_frame();
//! }
//!
//! loop {
//!     while rx().has_data() {
//!         process(rx().next_byte());
//!     }
//! }
//! ```
//!
//! ## Example
//!
//! ```
//! use canmsg::core::{DataLength, FrameKind, Id};
//! use canmsg::driver::loopback::Loopback;
//! use canmsg::{RxMessage, TxMessage};
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//!
//! let bus = Loopback::<NoopRawMutex, 4>::new();
//! let id = Id::new(0x123, FrameKind::Standard).unwrap();
//! let length = DataLength::new(2).unwrap();
//!
//! let tx = TxMessage::<NoopRawMutex, _>::new(id, length, &bus);
//! let rx = RxMessage::<NoopRawMutex, _>::new(id, length, &bus);
//!
//! tx.set_byte(0xAB, 0).unwrap();
//! tx.set_byte(0xCD, 1).unwrap();
//! tx.send().unwrap();
//!
//! rx.check_for_new_frame().unwrap();
//! assert_eq!(rx.next_byte(), 0xAB);
//! assert_eq!(rx.next_byte(), 0xCD);
//! assert!(!rx.has_data());
//! ```
//!
//! ## Limitations
//!
//! * A receive message holds a single frame. Frames arriving while it is not drained stay in
//!   the controller and may be lost there.
//! * CAN FD, bit timing and acceptance filter configuration are out of scope.
#![no_std]

pub use canmsg_core as core;
pub use canmsg_driver as driver;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod descriptor;
pub mod error;
pub mod message;
pub mod rx;
pub mod tx;

pub use descriptor::Descriptor;
pub use error::{Error, InitError};
pub use message::Message;
pub use rx::RxMessage;
pub use tx::TxMessage;
