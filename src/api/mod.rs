//! REST adapters for the managed backend
//!
//! Firestore holds the direct chat feeds and the user directory; Firebase
//! Storage holds attachments. Both authenticate with the Firebase id token.

pub mod client;
pub mod firestore;
pub mod storage;
mod value;
