//! oapp-services: peer authorization, origin checks, and the OApp itself.
//!
//! The endpoint is an external collaborator reached through
//! [`endpoint::Endpoint`]; [`endpoint::LoopbackEndpoint`] stands in for it
//! in tests and dry runs.

pub mod endpoint;
pub mod error;
pub mod messenger;
pub mod oapp;
pub mod origin;
pub mod peer;

pub use endpoint::{Endpoint, LoopbackEndpoint, MessagingFee, MessagingParams, MessagingReceipt};
pub use error::OAppError;
pub use messenger::{Inbox, Messenger, ReadQuery, ReceivedMessage};
pub use oapp::{MessageHandler, OApp, SendContext};
pub use origin::Origin;
pub use peer::{PeerAddress, PeerTable, PeerTransition, PeerTxn};
