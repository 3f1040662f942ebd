//! Length framing: every message is a u16 big-endian length followed by
//! that many body bytes, `<name>[' '<body>]`.

use std::io::Read;

use ew_core::error::ProtocolError;

/// Reads one frame. `Ok(None)` is a clean stream end on a frame boundary;
/// running dry mid-frame is a `ShortRead`.
pub fn read_frame(stream: &mut impl Read) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut len_bytes = [0u8; 2];
    match read_fully(stream, &mut len_bytes)? {
        0 => return Ok(None),
        2 => {}
        got => return Err(ProtocolError::ShortRead { needed: 2, got }),
    }

    let len = u16::from_be_bytes(len_bytes) as usize;
    let mut body = vec![0u8; len];
    let got = read_fully(stream, &mut body)?;
    if got < len {
        return Err(ProtocolError::ShortRead { needed: len, got });
    }
    Ok(Some(body))
}

/// Fills `buf` as far as the stream allows, returning the byte count read.
fn read_fully(stream: &mut impl Read, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(filled)
}

/// Splits a frame into command name and body. The name runs up to the first
/// 0x20; without one the whole frame is the name and the body is empty.
pub fn split_frame(frame: &[u8]) -> (&[u8], &[u8]) {
    match frame.iter().position(|&b| b == b' ') {
        Some(i) => (&frame[..i], &frame[i + 1..]),
        None => (frame, &[]),
    }
}

/// Prepends the length prefix to a body.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + body.len());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}
