//! Wayback Machine client for citekeeper.
//!
//! Three collaborators of the citation workflow live here, all talking HTTP
//! through a single [`Transport`](transport::Transport) seam:
//!
//! - [`WaybackClient`]: the availability lookup ("find snapshot") and the
//!   save-page-now API ("create snapshot") with every retry and back-off
//!   rule the service needs. Capturing is delegated to a
//!   [`CaptureStrategy`](capture::CaptureStrategy) chosen by [`CaptureApi`].
//! - [`Reachability`]: a single, never retried GET against a cited URL.
//! - [`HostDenylist`]: hosts the service refused to capture for the rest of
//!   the run.

pub mod capture;
mod client;
mod denylist;
pub mod error;
mod lookup;
mod reachability;
mod retry;
mod settings;
mod snapshot;
pub mod transport;

pub use crate::client::{WaybackClient, host_of};
pub use crate::denylist::HostDenylist;
pub use crate::reachability::{LinkCheck, Reachability};
pub use crate::settings::{CaptureApi, Credentials, Settings};
pub use crate::snapshot::Snapshot;
