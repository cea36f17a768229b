//! elevate-agent: chat exchange runtime
//!
//! This crate drives one request/response exchange at a time: it opens the
//! transport, folds decoded events into the growing reply, and emits
//! render-ready snapshots until exactly one terminal event, with support for
//! aborting mid-stream.

pub mod controller;
pub mod error;
pub mod events;
pub mod handle;
pub mod title;
pub mod transport;

pub use controller::{ChatController, ChatObserver, SendRequest};
pub use error::{Error, Result};
pub use events::{ChatEvent, ChatEventStream};
pub use handle::ChatHandle;
pub use title::{DEFAULT_TITLE, HttpTitleGenerator, TitleGenerator, clean_title, title_or_default};
pub use transport::{HttpTransport, Transport};
