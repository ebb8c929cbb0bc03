//! Anchor: the watermark moves only after the chunk loop finishes.

use crate::anchor_utils::{non_test_part, read_source};

#[test]
fn test_watermark_assignment_follows_chunk_loop() {
    let source = read_source("src/poller.rs");
    let body = non_test_part(&source);
    let loop_at = body
        .find("for (chunk_from, chunk_to) in chunk_ranges(")
        .expect("tick must walk chunk_ranges");
    let assign_at = body
        .find("self.watermark = head;")
        .expect("tick must advance the watermark to the observed head");
    assert!(
        assign_at > loop_at,
        "watermark must be assigned after the chunk walk, not inside or before it"
    );
    assert_eq!(
        body.matches("self.watermark =").count(),
        1,
        "the watermark has exactly one writer"
    );
    assert!(
        body.contains("Err(err) => return self.abort_tick(outcome, err)"),
        "chain-access failures must return before the watermark assignment"
    );
}

#[test]
fn test_chunk_size_is_capped_at_provider_limit() {
    assert!(read_source("src/utils/constants.rs").contains("MAX_LOG_CHUNK_SIZE: u64 = 100"));
    assert!(read_source("src/poller.rs").contains("chunk_ranges(from, head, MAX_LOG_CHUNK_SIZE)"));
}
