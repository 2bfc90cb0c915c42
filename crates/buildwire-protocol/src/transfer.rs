//! Chunked transfer of exact byte counts between streams.

use std::io::{self, Read, Write};

/// Size of the internal copy buffer.
pub const CHUNK_SIZE: usize = 10 * 1024;

/// Copies exactly `length` bytes from `input` to `output`.
///
/// Never reads past `length`, so the bytes that follow on a shared stream stay
/// untouched. Returns the number of bytes copied, which always equals
/// `length` on success.
///
/// # Errors
///
/// Returns [`io::ErrorKind::UnexpectedEof`] if `input` ends early, or any
/// read or write error.
pub fn copy_exact<R, W>(input: &mut R, output: &mut W, length: u64) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0_u8; CHUNK_SIZE];
    let mut copied = 0_u64;
    while copied < length {
        let wanted = usize::try_from(length - copied).map_or(CHUNK_SIZE, |left| left.min(CHUNK_SIZE));
        let Some(chunk) = buffer.get_mut(..wanted) else {
            break;
        };
        let read = match input.read(chunk) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended after {copied} of {length} bytes"),
                ));
            }
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        if let Some(filled) = chunk.get(..read) {
            output.write_all(filled)?;
        }
        copied += read as u64;
    }
    output.flush()?;
    Ok(copied)
}

/// Copies exactly `length` bytes and then closes `input` by dropping it.
///
/// The input is released whatever the outcome of the copy.
///
/// # Errors
///
/// Same as [`copy_exact`].
pub fn copy_exact_and_close<R, W>(mut input: R, output: &mut W, length: u64) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let result = copy_exact(&mut input, output, length);
    drop(input);
    result
}

/// Reads and discards exactly `length` bytes.
///
/// # Errors
///
/// Same as [`copy_exact`].
pub fn discard_exact<R>(input: &mut R, length: u64) -> io::Result<u64>
where
    R: Read + ?Sized,
{
    copy_exact(input, &mut io::sink(), length)
}
