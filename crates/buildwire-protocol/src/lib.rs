//! Wire types shared by the buildwire client and server.
//!
//! A session is a strict alternation of records on one TCP stream:
//!
//! 1. the server writes a handshake [`Response`] as soon as it accepts;
//! 2. the client writes a [`Command`], followed by exactly
//!    [`Command::content_length`] raw bytes when the command carries a
//!    payload;
//! 3. the server writes one [`Response`], followed by exactly
//!    [`Response::content_length`] raw bytes when it streams data back;
//! 4. steps 2 and 3 repeat until a terminating command or a socket failure.
//!
//! Records are framed by [`write_frame`] and [`read_frame`]; raw payloads are
//! moved with [`copy_exact`].

mod command;
mod report;
mod response;
mod transfer;
mod wire;

pub use command::{Command, RunBuild, SendFile, ValidationError};
pub use report::{BuildEvent, BuildReport, Priority};
pub use response::Response;
pub use transfer::{CHUNK_SIZE, copy_exact, copy_exact_and_close, discard_exact};
pub use wire::{MAX_FRAME_BYTES, ProtocolError, read_frame, write_frame};
