//! Bluetooth audio backend.
//!
//! A phone or other AVRCP target shows up on the system bus as a BlueZ
//! `MediaPlayer1` object next to its `Device1` and `MediaTransport1`. The
//! `bus` thread owns the connection; `state` turns the managed object tree
//! into a snapshot; `source` exposes it through the [`crate::source::Source`]
//! contract.

mod bus;
mod source;
mod state;

pub use source::WirelessSource;
