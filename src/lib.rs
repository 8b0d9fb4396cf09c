//! Predictable facade over a remote filesystem client.
//!
//! [`Facade`] wraps any [`RemoteFs`] port and turns its faults into defined
//! outcomes, scales byte counts, transfers directory trees and sniffs the
//! first line of remote files. [`SftpFs`](remote::SftpFs) is the bundled
//! port over an SFTP session.

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

/// Connection and facade settings
pub mod config;
mod error;
/// Fault containment, transfers and header sniffing
pub mod facade;
/// Remote filesystem port
pub mod remote;
pub mod size;
mod utils;

pub use config::{FacadeConfig, RemoteConfig};
pub use error::{Error, FsResult};
pub use facade::{Facade, Outcome};
pub use remote::{FileInfo, FileKind, OpenMode, RemoteFs};
pub use size::{SizeValue, Unit};
