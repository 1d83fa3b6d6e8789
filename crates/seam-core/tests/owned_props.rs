use proptest::prelude::*;

use seam_core::ledger::thread_balance;
use seam_core::{OwnedBuffer, OwnedString, Slice};

proptest! {
    #[test]
    fn buffer_from_slice_release_is_neutral(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let before = thread_balance();
        let buffer = OwnedBuffer::from_slice(&bytes);
        prop_assert_eq!(buffer.as_slice(), bytes.as_slice());
        buffer.release();
        prop_assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn buffer_survives_transfer(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let raw = OwnedBuffer::from_slice(&bytes).into_raw();
        prop_assert_eq!(raw.len as usize, bytes.len());
        let back = unsafe { OwnedBuffer::from_raw(raw) };
        prop_assert_eq!(back.into_vec(), bytes);
    }

    #[test]
    fn string_keeps_text(text in "\\PC{0,64}") {
        let owned = OwnedString::new(&text);
        prop_assert_eq!(owned.as_str(), text.as_str());
        let from_bytes = OwnedString::from_utf8(text.as_bytes()).unwrap();
        prop_assert_eq!(from_bytes, owned);
    }

    #[test]
    fn view_index_is_bounds_checked(len in 0usize..64, index in 0u64..128) {
        let data: Vec<u32> = (0..len as u32).collect();
        let view = Slice::new(&data);
        match view.get(index) {
            Ok(value) => prop_assert_eq!(*value as u64, index),
            Err(_) => prop_assert!(index >= len as u64),
        }
    }
}
