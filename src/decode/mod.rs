//! Payload decoding.
//!
//! # Data Flow
//! ```text
//! request body
//!     → body.rs (size-limited read: streaming or buffered)
//!     → multipart.rs / form.rs (form fields)
//!     → reply.rs (bound arguments, or the action a plain form names)
//! ```

pub mod body;
pub mod form;
pub mod multipart;
pub mod reply;

use std::sync::Arc;

use bytesize::ByteSize;

pub use body::{BodyDecoder, BufferedDecoder, StreamingDecoder};
pub use form::{FormData, FormFile, FormValue};
pub use reply::{decode_action, decode_reply_form, decode_reply_text, ModuleMap};

use crate::config::Runtime;

/// Body decoder for the configured runtime. Chosen once at start-up.
pub fn decoder_for(runtime: Runtime, limit: ByteSize) -> Arc<dyn BodyDecoder> {
    match runtime {
        Runtime::Node => Arc::new(StreamingDecoder::new(limit)),
        Runtime::Edge => Arc::new(BufferedDecoder::new(limit)),
    }
}
