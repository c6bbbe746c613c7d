#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use xdbf_rs::Container;

#[derive(Debug, Arbitrary)]
enum EntryOp {
    Update { section: u8, id: u8, data: Vec<u8> },
    Remove { section: u8, id: u8 },
}

// Random update/remove histories must keep the blob fully accounted for
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<EntryOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let mut container = Container::new();
    for op in ops.iter().take(64) {
        match op {
            EntryOp::Update { section, id, data } => {
                container
                    .update_entry(u16::from(*section % 6), u64::from(*id), data)
                    .expect("update within u32 range");
            }
            EntryOp::Remove { section, id } => {
                let _ = container.remove_entry(u16::from(*section % 6), u64::from(*id));
            }
        }

        let directory = container.directory();
        let used: u64 = directory.entries().iter().map(|e| u64::from(e.length)).sum();
        assert_eq!(used + directory.free_bytes(), directory.blob_len() as u64);
    }

    let reread = Container::from_bytes(&container.to_bytes()).expect("written container must parse");
    for entry in container.entries() {
        assert_eq!(reread.data(entry.section, entry.id), container.data(entry.section, entry.id));
    }
});
