//! VNC server and viewer processes

mod server;
mod viewer;

pub use server::{VncServerHandler, VncServerSettings};
pub use viewer::{VncViewerHandler, VncViewerSettings};
