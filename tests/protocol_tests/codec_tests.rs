//! Tests for the wire protocol codec
//!
//! These tests verify:
//! - Encoding and decoding of every command
//! - Encoding and decoding of responses
//! - Error handling for unknown commands, unknown criteria and bad framing
//! - Stream-based read/write helpers

use std::io::Cursor;

use bookshelf::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Response, Status, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
use bookshelf::{Book, Criterion, ShelfError};

// =============================================================================
// Helper Functions
// =============================================================================

fn pillars() -> Book {
    Book::draft("Ken Follet", "The Pillars of the Earth", "978-2221110829")
}

fn raw_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![tag];
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn assert_protocol_error<T: std::fmt::Debug>(result: Result<T, ShelfError>, needle: &str) {
    match result {
        Err(ShelfError::Protocol(msg)) => {
            assert!(msg.contains(needle), "{:?} does not contain {:?}", msg, needle)
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_create_book_command() {
    let command = Command::CreateBook { book: pillars() };

    let bytes = encode_command(&command);
    assert_eq!(bytes[0], 0x01);
    assert_eq!(decode_command(&bytes).unwrap(), command);
}

#[test]
fn test_get_book_by_id_layout() {
    let command = Command::GetBook { criterion: Criterion::Id(42) };

    let bytes = encode_command(&command);

    let mut expected = vec![0x02, 0, 0, 0, 9, 0x01];
    expected.extend_from_slice(&42u64.to_be_bytes());
    assert_eq!(bytes, expected);
    assert_eq!(decode_command(&bytes).unwrap(), command);
}

#[test]
fn test_get_book_by_isbn() {
    let command = Command::GetBook {
        criterion: Criterion::Isbn("978-2221110829".to_string()),
    };

    let bytes = encode_command(&command);
    assert_eq!(bytes[HEADER_SIZE], 0x02);
    assert_eq!(decode_command(&bytes).unwrap(), command);
}

#[test]
fn test_delete_and_ping_commands() {
    let delete = Command::DeleteBook { id: 7 };
    assert_eq!(decode_command(&encode_command(&delete)).unwrap(), delete);

    let ping = encode_command(&Command::Ping);
    assert_eq!(ping, vec![0x04, 0, 0, 0, 0]);
    assert_eq!(decode_command(&ping).unwrap(), Command::Ping);
}

#[test]
fn test_create_book_drops_id() {
    let command = Command::CreateBook { book: pillars().with_id(5) };

    match decode_command(&encode_command(&command)).unwrap() {
        Command::CreateBook { book } => assert!(book.is_draft()),
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_unicode_strings() {
    let command = Command::CreateBook {
        book: Book::draft("Гоголь", "Мёртвые души ✓", ""),
    };

    assert_eq!(decode_command(&encode_command(&command)).unwrap(), command);
}

// =============================================================================
// Command Error Tests
// =============================================================================

#[test]
fn test_unknown_command_type() {
    assert_protocol_error(decode_command(&raw_frame(0x7F, &[])), "Unknown command type: 0x7f");
}

#[test]
fn test_unsupported_criterion() {
    let result = decode_command(&raw_frame(0x02, &[0x09, 1, 2, 3]));

    assert!(matches!(result, Err(ShelfError::UnsupportedCriterion(_))));
}

#[test]
fn test_incomplete_header() {
    assert_protocol_error(decode_command(&[0x01, 0x00]), "Incomplete header");
}

#[test]
fn test_incomplete_payload() {
    let mut bytes = encode_command(&Command::DeleteBook { id: 1 });
    bytes.truncate(bytes.len() - 2);

    assert_protocol_error(decode_command(&bytes), "Incomplete payload");
}

#[test]
fn test_trailing_payload_rejected() {
    assert_protocol_error(
        decode_command(&raw_frame(0x04, &[1, 2, 3])),
        "PING command: unexpected payload of 3 bytes",
    );

    let mut payload = 9u64.to_be_bytes().to_vec();
    payload.push(0);
    assert_protocol_error(
        decode_command(&raw_frame(0x03, &payload)),
        "DELETE_BOOK command: unexpected payload of 1 bytes",
    );
}

#[test]
fn test_missing_fields() {
    assert_protocol_error(decode_command(&raw_frame(0x03, &[0, 0])), "missing id");
    assert_protocol_error(decode_command(&raw_frame(0x02, &[])), "missing criterion");
    assert_protocol_error(
        decode_command(&raw_frame(0x01, &[0, 0, 0, 10, b'a'])),
        "incomplete string",
    );
}

#[test]
fn test_invalid_utf8_rejected() {
    let payload = [0x02, 0, 0, 0, 2, 0xC3, 0x28];

    assert_protocol_error(decode_command(&raw_frame(0x02, &payload)), "invalid UTF-8");
}

#[test]
fn test_oversized_payload_rejected() {
    let mut bytes = vec![0x04];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    assert_protocol_error(decode_command(&bytes), "payload too large");
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_ok_response_with_books() {
    let books = vec![
        pillars().with_id(1),
        Book::draft("Ursula K. Le Guin", "The Dispossessed", "978-0061054884").with_id(2),
    ];
    let response = Response::ok(books.clone());

    let bytes = encode_response(&response);
    assert_eq!(bytes[0], Status::Ok as u8);

    let decoded = decode_response(&bytes).unwrap();
    assert!(decoded.is_ok());
    assert_eq!(decoded.books, books);
}

#[test]
fn test_ok_response_empty() {
    let bytes = encode_response(&Response::ok(Vec::new()));

    assert_eq!(bytes, vec![0x00, 0, 0, 0, 4, 0, 0, 0, 0]);
    assert!(decode_response(&bytes).unwrap().books.is_empty());
}

#[test]
fn test_error_response() {
    let bytes = encode_response(&Response::error("Book not found"));

    let decoded = decode_response(&bytes).unwrap();
    assert_eq!(decoded.status, Status::Error);
    assert_eq!(decoded.message.as_deref(), Some("Book not found"));
    assert!(decoded.books.is_empty());
}

#[test]
fn test_unknown_response_status() {
    assert_protocol_error(decode_response(&raw_frame(0x05, &[])), "Unknown response status");
}

#[test]
fn test_ok_response_count_exceeds_payload() {
    let payload = 3u32.to_be_bytes();

    assert_protocol_error(decode_response(&raw_frame(0x00, &payload)), "missing book id");
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_command_stream_roundtrip() {
    let commands = vec![
        Command::CreateBook { book: pillars() },
        Command::GetBook { criterion: Criterion::Id(1) },
        Command::DeleteBook { id: 1 },
        Command::Ping,
    ];

    let mut buffer = Vec::new();
    for command in &commands {
        write_command(&mut buffer, command).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for command in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), command);
    }

    // End of stream surfaces as an IO error
    assert!(matches!(read_command(&mut cursor), Err(ShelfError::Io(_))));
}

#[test]
fn test_response_stream_roundtrip() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::ok(vec![pillars().with_id(3)])).unwrap();
    write_response(&mut buffer, &Response::error("nope")).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap().books[0].id, 3);
    assert_eq!(read_response(&mut cursor).unwrap().message.as_deref(), Some("nope"));
}

#[test]
fn test_stream_unsupported_criterion_consumes_frame() {
    let mut buffer = raw_frame(0x02, &[0x03, 0xAA]);
    write_command(&mut buffer, &Command::Ping).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(
        read_command(&mut cursor),
        Err(ShelfError::UnsupportedCriterion(_))
    ));
    assert_eq!(read_command(&mut cursor).unwrap(), Command::Ping);
}
