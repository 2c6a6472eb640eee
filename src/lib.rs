//! Prompt Wars - arena fighting simulation and LAN relay
//!
//! The `game` module is the simulation core: players, weapons, combat
//! resolution, the match controller and the round clock. The remaining
//! modules make up the relay server that lets up to four clients share
//! a room and exchange state.

pub mod app;
pub mod config;
pub mod forge;
pub mod game;
pub mod http;
pub mod lobby;
pub mod util;
pub mod ws;
