#![no_main]
use libfuzzer_sys::fuzz_target;
use xdbf_rs::{Container, Profile, TitleMetadata};

// Arbitrary bytes must never panic the reader or the views, and anything
// that parses must re-serialize to a buffer that parses again
fuzz_target!(|data: &[u8]| {
    let mut container = match Container::from_bytes(data) {
        Ok(c) => c,
        Err(_) => return,
    };

    let bytes = container.to_bytes();
    assert_eq!(bytes.len(), container.required_size());
    let reread = Container::from_bytes(&bytes).expect("written container must parse");
    assert_eq!(reread.len(), container.len());

    {
        let spa = TitleMetadata::new(&container);
        let _ = spa.title_name();
        let _ = spa.title_data();
        let _ = spa.achievements(spa.default_language());
        let _ = spa.icon();
    }

    let profile = Profile::new(&mut container, 0);
    let _ = profile.achievements();
    let _ = profile.settings();
    let _ = profile.titles();
});
