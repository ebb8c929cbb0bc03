//! Anchor: the response signature is a raw signature over keccak256 of the message.

use crate::anchor_utils::{non_test_part, read_source};

#[test]
fn test_response_is_signed_over_raw_hash() {
    let source = read_source("src/submitter.rs");
    let body = non_test_part(&source);
    assert!(
        body.contains("keccak256(response_message(task)"),
        "response message must be hashed with keccak256"
    );
    assert!(
        body.contains(".sign_hash(&hash)"),
        "signature must be taken over the hash itself"
    );
    assert!(
        !body.contains("sign_message"),
        "prefixed personal-message signing would change the recovered operator"
    );
    assert!(
        read_source("src/utils/constants.rs")
            .contains("RESPONSE_MESSAGE_PREFIX: &str = \"Respond domain task\""),
        "message prefix is part of the contract's verification"
    );
}
