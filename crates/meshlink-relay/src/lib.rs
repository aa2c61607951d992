// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bus-to-renderer relay.
//!
//! Messages arrive on `<namespace>.>`; the [`router::Router`] turns each one
//! into an encoded renderer command or a mission. Commands fan out through
//! the [`hub::Hub`] to every WebSocket session; missions run on the pool and
//! publish their poses back onto the bus, where they re-enter as ordinary
//! transformation messages.

pub mod config;
pub mod hub;
pub mod router;
pub mod service;
pub mod session;
pub mod sink;
