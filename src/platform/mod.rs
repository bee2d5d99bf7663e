//! OS collaborators: resource metrics, process table, display capture.
//!
//! Everything here is blocking. Actions call into it from
//! `tokio::task::spawn_blocking`.

pub mod capture;
pub mod probe;

pub use capture::{default_grabber, encode_png, RawFrame, ScreenGrabber, UnsupportedGrabber};
#[cfg(feature = "screen-capture")]
pub use capture::XcapGrabber;
pub use probe::{ProcessEntry, ResourceUsage, SysinfoProbe, SystemProbe};
