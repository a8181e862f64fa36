//! Fuzz target for decoding index data and class file headers.
//!
//! Run with: cargo +nightly fuzz run index_read

#![no_main]

use jarindex::index::parse_class_header;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(index) = jarindex::read_index(data) {
        for class in index.classes() {
            let _ = class.package();
        }
    }
    let _ = parse_class_header(data);
});
