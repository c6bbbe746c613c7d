//! Container codec round-trip tests
//!
//! Exercises Write/Read through the public API: exact sizing, byte-identical
//! re-serialization of console-style buffers, and failure atomicity.

use xdbf_rs::{Container, ContainerConfig, Header, XdbfError};

const MAGIC: &[u8; 4] = b"XDBF";

/// Build a buffer the way the console lays one out: spare table slots, a
/// hole in the blob and the end-of-data marker
fn console_buffer() -> Vec<u8> {
    let mut bytes = Vec::new();
    let push = |bytes: &mut Vec<u8>, v: &[u8]| bytes.extend_from_slice(v);

    // Header: 4 entry slots (2 used), 4 free slots (2 used)
    for field in [0x5844_4246u32, 1, 4, 2, 4, 2] {
        push(&mut bytes, &field.to_be_bytes());
    }

    // Entries: (section, id, offset, length)
    for (section, id, offset, length) in [(1u16, 7u64, 0u32, 8u32), (3, 0x1004_0000, 12, 8)] {
        push(&mut bytes, &section.to_be_bytes());
        push(&mut bytes, &id.to_be_bytes());
        push(&mut bytes, &offset.to_be_bytes());
        push(&mut bytes, &length.to_be_bytes());
    }
    bytes.extend_from_slice(&[0u8; 2 * 18]);

    // Free ranges: hole at 8..12, then the end marker
    for (offset, length) in [(8u32, 4u32), (20, 0xFFFF_FFFF - 20)] {
        push(&mut bytes, &offset.to_be_bytes());
        push(&mut bytes, &length.to_be_bytes());
    }
    bytes.extend_from_slice(&[0u8; 2 * 8]);

    // Blob
    bytes.extend_from_slice(b"AAAAAAAA");
    bytes.extend_from_slice(&[0xEE; 4]);
    bytes.extend_from_slice(b"BBBBBBBB");
    bytes
}

#[test]
fn test_empty_container_scenario() {
    let container = Container::new();

    let required = container.required_size();
    let mut small = vec![0xAAu8; required - 1];
    match container.write_to(&mut small) {
        Err(XdbfError::InsufficientCapacity {
            required: r,
            available,
        }) => {
            assert_eq!(r, required);
            assert_eq!(available, required - 1);
        }
        other => panic!("expected InsufficientCapacity, got {:?}", other),
    }
    assert!(small.iter().all(|&b| b == 0xAA), "failed write touched the buffer");

    let mut buf = vec![0u8; required];
    assert_eq!(container.write_to(&mut buf).unwrap(), required);
    assert_eq!(&buf[..4], MAGIC);

    let reread = Container::from_bytes(&buf).unwrap();
    assert!(reread.is_empty());
    assert_eq!(reread.header().magic, Header::new().magic);
    assert_eq!(reread.header().version, Header::new().version);
}

#[test]
fn test_compact_empty_container_is_bare_header() {
    let container = Container::with_config(ContainerConfig::compact());
    assert_eq!(container.to_bytes().len(), 24);
}

#[test]
fn test_write_after_read_is_byte_identical() {
    let original = console_buffer();
    let container = Container::from_bytes(&original).unwrap();

    assert_eq!(container.len(), 2);
    assert!(container.has_end_marker());
    assert_eq!(container.data(1, 7), Some(&b"AAAAAAAA"[..]));
    assert_eq!(container.data(3, 0x1004_0000), Some(&b"BBBBBBBB"[..]));
    assert_eq!(container.directory().free_range_count(), 1);

    assert_eq!(container.required_size(), original.len());
    assert_eq!(container.to_bytes(), original);
}

#[test]
fn test_update_round_trip() {
    let mut container = Container::new();
    for id in 0..20u64 {
        let payload = vec![id as u8; (id as usize % 7) * 5 + 1];
        container.update_entry((id % 3) as u16 + 1, id, &payload).unwrap();
    }
    // Resize-heavy history
    for id in (0..20u64).step_by(2) {
        container.update_entry((id % 3) as u16 + 1, id, &vec![0xC0; 33]).unwrap();
    }
    container.remove_entry(2, 1).unwrap();

    let reread = Container::from_bytes(&container.to_bytes()).unwrap();
    assert_eq!(reread.len(), container.len());
    for entry in container.entries() {
        assert_eq!(
            reread.data(entry.section, entry.id),
            container.data(entry.section, entry.id),
            "payload of ({}, {}) changed",
            entry.section,
            entry.id
        );
    }
    assert!(reread.data(2, 1).is_none());
}

#[test]
fn test_resize_frees_old_span() {
    let mut container = Container::new();
    let first = container.update_entry(1, 1, &[1u8; 8]).unwrap();
    container.update_entry(1, 2, &[2u8; 8]).unwrap();

    let same = container.update_entry(1, 1, &[9u8; 8]).unwrap();
    assert_eq!(same.offset, first.offset);
    assert_eq!(container.directory().free_range_count(), 0);

    let moved = container.update_entry(1, 1, &[3u8; 16]).unwrap();
    assert_ne!(moved.offset, first.offset);
    let free: Vec<_> = container.directory().free_ranges().copied().collect();
    assert_eq!(free.len(), 1);
    assert_eq!((free[0].offset, free[0].length), (first.offset, first.length));
}

#[test]
fn test_failed_read_keeps_state() {
    let mut container = Container::new();
    container.update_entry(4, 0x4D53_07E6, b"title").unwrap();
    let before = container.to_bytes();

    let mut bad_magic = console_buffer();
    bad_magic[0] = b'Y';
    let err = container.read(&bad_magic).unwrap_err();
    assert!(err.is_malformed_header());

    let mut bad_version = console_buffer();
    bad_version[7] = 2;
    assert!(matches!(
        container.read(&bad_version),
        Err(XdbfError::UnsupportedVersion(2))
    ));

    let truncated = console_buffer();
    assert!(matches!(
        container.read(&truncated[..100]),
        Err(XdbfError::Truncated { .. })
    ));

    assert_eq!(container.to_bytes(), before);

    container.read(&console_buffer()).unwrap();
    assert_eq!(container.len(), 2);
}

#[test]
fn test_overlapping_tables_rejected() {
    let mut bytes = console_buffer();
    // Point the second entry into the first
    let second_offset = 24 + 18 + 10;
    bytes[second_offset..second_offset + 4].copy_from_slice(&4u32.to_be_bytes());
    assert!(matches!(
        Container::from_bytes(&bytes),
        Err(XdbfError::MalformedTable(_))
    ));
}

#[test]
fn test_entry_past_blob_rejected() {
    let mut bytes = console_buffer();
    let length_field = 24 + 18 + 14;
    bytes[length_field..length_field + 4].copy_from_slice(&64u32.to_be_bytes());
    assert!(matches!(
        Container::from_bytes(&bytes),
        Err(XdbfError::MalformedTable(_))
    ));
}

fn buffer_with_free_table(free: &[(u32, u32)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let free_count = free.len() as u32 + 1;
    for field in [0x5844_4246u32, 1, 1, 1, free_count, free_count] {
        bytes.extend_from_slice(&field.to_be_bytes());
    }
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&1u64.to_be_bytes());
    bytes.extend_from_slice(&4u32.to_be_bytes());
    bytes.extend_from_slice(&4u32.to_be_bytes());
    for &(offset, length) in free.iter().chain([(12, 0xFFFF_FFFF - 12)].iter()) {
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.extend_from_slice(&length.to_be_bytes());
    }
    bytes.extend_from_slice(&[0u8; 12]);
    bytes
}

#[test]
fn test_free_table_order_enforced_on_read() {
    let sorted = Container::from_bytes(&buffer_with_free_table(&[(0, 4), (8, 4)])).unwrap();
    assert_eq!(sorted.directory().free_bytes(), 8);
    let rewritten = sorted.to_bytes();
    assert_eq!(Container::from_bytes(&rewritten).unwrap().to_bytes(), rewritten);

    let unsorted = Container::from_bytes(&buffer_with_free_table(&[(8, 4), (0, 4)]));
    assert!(matches!(unsorted, Err(XdbfError::MalformedTable(_))));

    let empty_slot = Container::from_bytes(&buffer_with_free_table(&[(0, 4), (8, 0), (8, 4)]));
    assert!(matches!(empty_slot, Err(XdbfError::MalformedTable(_))));
}
