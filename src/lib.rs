//! Plotter client: record line drawings, fit them onto paper, and submit them
//! to a remote single-worker pen plotter.
//!
//! The geometry and stats layers are plain synchronous code. The only
//! asynchronous part is the WebSocket session, which runs as one tokio task
//! behind a [`connection::SessionHandle`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Points, segments, viewboxes and the fit/round/merge transforms |
//! | [`clip`] | Cohen–Sutherland segment clipping |
//! | [`stats`] | Incremental line statistics with rebuild-on-frame-change |
//! | [`svg`] | Print-ready SVG serialization with content digest |
//! | [`session`] | Connection lifecycle state machine (no I/O) |
//! | [`connection`] | Tokio/WebSocket driver for [`session`] |
//! | [`job`] | Job submission, cancel and the local job shadow |
//! | [`recorder`] | Facade the drawing routine feeds segments into |
//! | [`config`] | Paper presets, client identity, environment loader |
//! | [`consts`] | Shared numeric constants |

pub mod clip;
pub mod config;
pub mod connection;
pub mod consts;
pub mod geometry;
pub mod job;
pub mod recorder;
pub mod session;
pub mod stats;
pub mod svg;
