//! Transcript persistence
//!
//! Every persistence call writes a new pair of files for a session: a plain
//! text log and a JSON record. Transcripts are write-only; nothing in parley
//! reads them back.

pub mod record;
pub mod writer;

pub use record::{render_text, TranscriptRecord};
pub use writer::{TranscriptPaths, TranscriptWriter};
