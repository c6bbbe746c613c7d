//! Property-based tests for allocator and codec correctness
//!
//! Uses proptest to verify directory invariants hold across many random
//! update/remove histories, and that setting values survive encoding.

use proptest::prelude::*;
use std::collections::HashMap;
use xdbf_rs::{Container, Directory, Setting, SettingId, SettingValue, UserDataType, XdbfError};

#[derive(Debug, Clone)]
enum Op {
    Update { key: u8, len: usize, byte: u8 },
    Remove { key: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..12, 0usize..96, any::<u8>()).prop_map(|(key, len, byte)| Op::Update { key, len, byte }),
        1 => (0u8..12).prop_map(|key| Op::Remove { key }),
    ]
}

fn key(k: u8) -> (u16, u64) {
    (u16::from(k % 3) + 1, u64::from(k))
}

/// Free ranges sorted, disjoint from each other and from every entry, and
/// together with the entries they cover the whole blob
fn check_invariants(directory: &Directory) -> Result<(), TestCaseError> {
    let free: Vec<_> = directory.free_ranges().copied().collect();
    for pair in free.windows(2) {
        prop_assert!(
            pair[0].end() < u64::from(pair[1].offset),
            "free ranges {:?} and {:?} overlap, touch or are unsorted",
            pair[0],
            pair[1]
        );
    }

    let mut spans: Vec<(u64, u64)> = free
        .iter()
        .map(|r| (u64::from(r.offset), r.end()))
        .chain(
            directory
                .entries()
                .iter()
                .filter(|e| e.length > 0)
                .map(|e| (u64::from(e.offset), e.extent().end())),
        )
        .collect();
    spans.sort();
    for pair in spans.windows(2) {
        prop_assert!(pair[0].1 <= pair[1].0, "spans {:?} overlap", pair);
    }

    let entry_bytes: u64 = directory.entries().iter().map(|e| u64::from(e.length)).sum();
    prop_assert_eq!(entry_bytes + directory.free_bytes(), directory.blob_len() as u64);
    Ok(())
}

proptest! {
    #[test]
    fn prop_directory_invariants(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut container = Container::new();
        let mut model: HashMap<u8, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                Op::Update { key: k, len, byte } => {
                    let (section, id) = key(k);
                    let payload = vec![byte; len];
                    container.update_entry(section, id, &payload).unwrap();
                    model.insert(k, payload);
                }
                Op::Remove { key: k } => {
                    let (section, id) = key(k);
                    let removed = container.remove_entry(section, id);
                    prop_assert_eq!(removed.is_ok(), model.remove(&k).is_some());
                }
            }
            check_invariants(container.directory())?;
        }

        for (k, payload) in &model {
            let (section, id) = key(*k);
            prop_assert_eq!(container.data(section, id), Some(payload.as_slice()));
        }
        prop_assert_eq!(container.len(), model.len());
    }

    #[test]
    fn prop_write_read_preserves_directory(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut container = Container::new();
        for op in ops {
            match op {
                Op::Update { key: k, len, byte } => {
                    let (section, id) = key(k);
                    container.update_entry(section, id, &vec![byte; len]).unwrap();
                }
                Op::Remove { key: k } => {
                    let (section, id) = key(k);
                    container.remove_entry(section, id).ok();
                }
            }
        }

        let bytes = container.to_bytes();
        prop_assert_eq!(bytes.len(), container.required_size());

        let reread = Container::from_bytes(&bytes).unwrap();
        check_invariants(reread.directory())?;
        prop_assert_eq!(reread.len(), container.len());
        for entry in container.entries() {
            prop_assert_eq!(reread.data(entry.section, entry.id), container.data(entry.section, entry.id));
        }
        prop_assert_eq!(reread.to_bytes(), bytes);
    }

    #[test]
    fn prop_read_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Container::from_bytes(&bytes);
        let _ = Container::from_bytes(&[b"XDBF\0\0\0\x01".as_slice(), bytes.as_slice()].concat());
    }

    #[test]
    fn prop_scalar_settings_round_trip(
        int32 in any::<i32>(),
        int64 in any::<i64>(),
        float_bits in any::<u32>(),
        double_bits in any::<u64>(),
    ) {
        let cases = [
            (UserDataType::Int32, SettingValue::Int32(int32)),
            (UserDataType::Int64, SettingValue::Int64(int64)),
            (UserDataType::Float, SettingValue::Float(f32::from_bits(float_bits))),
            (UserDataType::Double, SettingValue::Double(f64::from_bits(double_bits))),
        ];

        for (value_type, value) in cases {
            let id = SettingId::from_parts(value_type, 8, 0x100);
            let setting = Setting::new(id, value).unwrap();
            let decoded = Setting::from_bytes(&setting.to_bytes().unwrap()).unwrap();

            prop_assert_eq!(decoded.id(), id);
            match (setting.value(), decoded.value()) {
                (SettingValue::Float(a), SettingValue::Float(b)) => prop_assert_eq!(a.to_bits(), b.to_bits()),
                (SettingValue::Double(a), SettingValue::Double(b)) => prop_assert_eq!(a.to_bits(), b.to_bits()),
                (a, b) => prop_assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn prop_blob_settings_round_trip(
        text in "\\PC{0,40}",
        blob in prop::collection::vec(any::<u8>(), 0..200),
    ) {
        let unicode = Setting::new(
            SettingId::from_parts(UserDataType::Unicode, 0x80, 0x101),
            SettingValue::Unicode(text.clone()),
        ).unwrap();
        let decoded = Setting::from_bytes(&unicode.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded.as_str(), Some(text.as_str()));

        let binary = Setting::new(
            SettingId::from_parts(UserDataType::Binary, 0x3E8, 0x102),
            SettingValue::Binary(blob.clone()),
        ).unwrap();
        let decoded = Setting::from_bytes(&binary.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded.as_bytes(), Some(blob.as_slice()));
    }

    #[test]
    fn prop_unicode_settings_never_truncate(text in "[ab\\x00]{0,12}") {
        let id = SettingId::from_parts(UserDataType::Unicode, 0x80, 0x103);
        match Setting::new(id, SettingValue::Unicode(text.clone())) {
            Ok(setting) => {
                prop_assert!(!text.contains('\0'));
                let decoded = Setting::from_bytes(&setting.to_bytes().unwrap()).unwrap();
                prop_assert_eq!(decoded.as_str(), Some(text.as_str()));
            }
            Err(e) => {
                prop_assert!(text.contains('\0'));
                prop_assert!(matches!(e, XdbfError::InvalidString(_)));
            }
        }
    }
}
