//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - CREATE_BOOK: author + title + isbn13 (each a string)
//! - GET_BOOK:    criterion tag (1) + id (8) | criterion tag (1) + isbn
//! - DELETE_BOOK: id (8)
//! - PING:        empty
//!
//! A string is `len (4) + UTF-8 bytes`. All integers are big-endian.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! - OK:    count (4) + count × [id (8) + author + title + isbn13]
//! - ERROR: UTF-8 message

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::catalog::{Book, Criterion};
use crate::error::{Result, ShelfError};
use super::{Command, CriterionTag, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();

    match command {
        Command::CreateBook { book } => {
            put_str(&mut payload, &book.author);
            put_str(&mut payload, &book.title);
            put_str(&mut payload, &book.isbn13);
        }
        Command::GetBook { criterion } => {
            payload.put_u8(criterion.tag() as u8);
            match criterion {
                Criterion::Id(id) => payload.put_u64(*id),
                Criterion::Isbn(isbn) => put_str(&mut payload, isbn),
            }
        }
        Command::DeleteBook { id } => payload.put_u64(*id),
        Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "")?;

    let (name, command) = match cmd_type {
        0x01 => ("CREATE_BOOK", decode_create_book(&mut payload)?),
        0x02 => ("GET_BOOK", decode_get_book(&mut payload)?),
        0x03 => {
            need(&payload, 8, "DELETE_BOOK command: missing id")?;
            ("DELETE_BOOK", Command::DeleteBook { id: payload.get_u64() })
        }
        0x04 => ("PING", Command::Ping),
        _ => {
            return Err(ShelfError::Protocol(format!(
                "Unknown command type: 0x{:02x}",
                cmd_type
            )))
        }
    };

    if payload.has_remaining() {
        return Err(ShelfError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.remaining()
        )));
    }

    Ok(command)
}

/// Decode CREATE_BOOK command payload
fn decode_create_book(payload: &mut &[u8]) -> Result<Command> {
    let author = get_str(payload, "CREATE_BOOK command: author")?;
    let title = get_str(payload, "CREATE_BOOK command: title")?;
    let isbn13 = get_str(payload, "CREATE_BOOK command: isbn13")?;

    Ok(Command::CreateBook {
        book: Book::draft(author, title, isbn13),
    })
}

/// Decode GET_BOOK command payload
///
/// An unknown criterion tag is reported as `UnsupportedCriterion`, not as a
/// framing error: the request was well-formed, the lookup kind is not.
fn decode_get_book(payload: &mut &[u8]) -> Result<Command> {
    need(payload, 1, "GET_BOOK command: missing criterion")?;
    let tag = payload.get_u8();

    let criterion = if tag == CriterionTag::Id as u8 {
        need(payload, 8, "GET_BOOK command: missing id")?;
        Criterion::Id(payload.get_u64())
    } else if tag == CriterionTag::Isbn as u8 {
        Criterion::Isbn(get_str(payload, "GET_BOOK command: isbn")?)
    } else {
        return Err(ShelfError::UnsupportedCriterion(format!(
            "criterion tag 0x{:02x}",
            tag
        )));
    };

    Ok(Command::GetBook { criterion })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut payload = BytesMut::new();

    match response.status {
        Status::Ok => {
            payload.put_u32(response.books.len() as u32);
            for book in &response.books {
                payload.put_u64(book.id);
                put_str(&mut payload, &book.author);
                put_str(&mut payload, &book.title);
                put_str(&mut payload, &book.isbn13);
            }
        }
        Status::Error => {
            if let Some(message) = &response.message {
                payload.put_slice(message.as_bytes());
            }
        }
    }

    frame(response.status as u8, &payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, mut payload) = split_frame(bytes, "response ")?;

    match status_byte {
        0x00 => {
            need(&payload, 4, "OK response: missing book count")?;
            let count = payload.get_u32() as usize;

            // Each book needs at least 20 bytes; cap the allocation accordingly.
            let mut books = Vec::with_capacity(count.min(payload.remaining() / 20));
            for _ in 0..count {
                need(&payload, 8, "OK response: missing book id")?;
                let id = payload.get_u64();
                let author = get_str(&mut payload, "OK response: author")?;
                let title = get_str(&mut payload, "OK response: title")?;
                let isbn13 = get_str(&mut payload, "OK response: isbn13")?;
                books.push(Book {
                    id,
                    author,
                    title,
                    isbn13,
                });
            }

            if payload.has_remaining() {
                return Err(ShelfError::Protocol(format!(
                    "OK response: unexpected payload of {} bytes",
                    payload.remaining()
                )));
            }

            Ok(Response::ok(books))
        }
        0x01 => Ok(Response::error(&String::from_utf8_lossy(payload))),
        _ => Err(ShelfError::Protocol(format!(
            "Unknown response status: 0x{:02x}",
            status_byte
        ))),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader, "")?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader, "Response ")?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Prefix `payload` with a header
fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Validate the header and return (tag, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(ShelfError::Protocol(format!(
            "Incomplete {}header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    check_payload_len(payload_len, what)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(ShelfError::Protocol(format!(
            "Incomplete {}payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

/// Read one header plus payload from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    check_payload_len(payload_len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

fn check_payload_len(payload_len: u32, what: &str) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ShelfError::Protocol(format!(
            "{}payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn get_str(buf: &mut &[u8], context: &str) -> Result<String> {
    need(buf, 4, &format!("{}: missing length", context))?;
    let len = buf.get_u32() as usize;
    need(buf, len, &format!("{}: incomplete string", context))?;

    let raw = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(raw)
        .map_err(|_| ShelfError::Protocol(format!("{}: invalid UTF-8", context)))
}

/// Fail unless `buf` holds at least `n` more bytes
fn need(buf: &&[u8], n: usize, context: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(ShelfError::Protocol(format!(
            "{} (expected {} bytes, got {})",
            context,
            n,
            buf.remaining()
        )));
    }
    Ok(())
}
