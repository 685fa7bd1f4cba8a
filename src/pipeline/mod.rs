//! Result-decoding stages.
//!
//! Each submodule handles one step between the service reply and what the
//! user sees or saves.
//!
//! ## Data Flow
//!
//! ```text
//! reply body ──▶ decode ──┬──▶ preview   (markup → display)
//!  (JSON)       (validate, └──▶ download  (bytes → file)
//!                base64)
//! ```
//!
//! 1. [`decode`]: validate the JSON shape and decode the base64 artifact
//! 2. [`preview`]: optional sanitising and plain-text rendering of the markup
//! 3. [`download`]: derive the versioned file name and save the bytes

pub mod decode;
pub mod download;
pub mod preview;
