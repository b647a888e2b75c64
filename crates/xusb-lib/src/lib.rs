//! xusb — user-mode client for the XUSB virtual controller bus driver.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod status;
pub mod transport;
pub mod wait;
pub mod wire;

pub use client::{ClientOptions, PlatformXusb, WaitCanceller, Xusb};
pub use error::{Result, XusbError};
pub use registry::{Bus, Device, Registry, RegistryOptions};
pub use status::Status;
