//! Length-prefixed JSON framing.
//!
//! A frame is a 4-byte big-endian length followed by that many bytes of JSON.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Largest frame body accepted in either direction.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

const HEADER_BYTES: usize = 4;

/// Errors raised while framing records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream failed or ended inside a frame.
    #[error("stream error: {0}")]
    Io(#[from] io::Error),
    /// A frame announced a body larger than [`MAX_FRAME_BYTES`].
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced or encoded body size.
        size: u64,
        /// Configured limit.
        max: u32,
    },
    /// A record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    /// A frame body was not a valid record.
    #[error("failed to decode record: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes `record` as one frame and flushes the writer.
///
/// # Errors
///
/// Returns an error if encoding fails, the body is too large, or the write
/// fails.
pub fn write_frame<W, T>(writer: &mut W, record: &T) -> Result<(), ProtocolError>
where
    W: Write + ?Sized,
    T: Serialize,
{
    let body = serde_json::to_vec(record).map_err(ProtocolError::Encode)?;
    let length = u32::try_from(body.len())
        .ok()
        .filter(|length| *length <= MAX_FRAME_BYTES)
        .ok_or(ProtocolError::FrameTooLarge {
            size: body.len() as u64,
            max: MAX_FRAME_BYTES,
        })?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame and decodes it.
///
/// Returns `Ok(None)` when the stream ends cleanly before the first header
/// byte, which is how a peer closes the session.
///
/// # Errors
///
/// Returns an error if the stream ends inside a frame, the announced size is
/// too large, or the body does not decode as `T`.
pub fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: Read + ?Sized,
    T: DeserializeOwned,
{
    let Some(length) = read_header(reader)? else {
        return Ok(None);
    };
    if length > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge {
            size: u64::from(length),
            max: MAX_FRAME_BYTES,
        });
    }
    let mut body = Vec::new();
    Read::take(&mut *reader, u64::from(length)).read_to_end(&mut body)?;
    if body.len() as u64 != u64::from(length) {
        return Err(ProtocolError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("frame ended after {} of {length} bytes", body.len()),
        )));
    }
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(ProtocolError::Decode)
}

fn read_header<R>(reader: &mut R) -> Result<Option<u32>, ProtocolError>
where
    R: Read + ?Sized,
{
    let mut header = [0_u8; HEADER_BYTES];
    let mut filled = 0;
    while filled < HEADER_BYTES {
        let Some(remaining) = header.get_mut(filled..) else {
            break;
        };
        match reader.read(remaining) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ProtocolError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame header",
                )));
            }
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(ProtocolError::Io(error)),
        }
    }
    Ok(Some(u32::from_be_bytes(header)))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{Command, Response};

    #[test]
    fn frames_carry_a_big_endian_length_prefix() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Command::Disconnect).expect("write frame");
        let body = br#"{"kind":"disconnect"}"#;
        assert_eq!(buffer.get(..4), Some(&(body.len() as u32).to_be_bytes()[..]));
        assert_eq!(buffer.get(4..), Some(&body[..]));
    }

    #[test]
    fn consecutive_frames_decode_in_order() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Command::run_target("a")).expect("write first");
        write_frame(&mut buffer, &Command::run_target("b")).expect("write second");

        let mut cursor = Cursor::new(buffer);
        let first: Option<Command> = read_frame(&mut cursor).expect("read first");
        let second: Option<Command> = read_frame(&mut cursor).expect("read second");
        let end: Option<Command> = read_frame(&mut cursor).expect("read end");
        assert_eq!(first, Some(Command::run_target("a")));
        assert_eq!(second, Some(Command::run_target("b")));
        assert_eq!(end, None);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut cursor = Cursor::new(vec![0_u8, 0]);
        let result: Result<Option<Response>, _> = read_frame(&mut cursor);
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut bytes = 10_u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let result: Result<Option<Response>, _> = read_frame(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }

    #[test]
    fn oversized_announcement_is_rejected_before_reading() {
        let bytes = (MAX_FRAME_BYTES + 1).to_be_bytes().to_vec();
        let result: Result<Option<Response>, _> = read_frame(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let mut bytes = 3_u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"xyz");
        let result: Result<Option<Command>, _> = read_frame(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
