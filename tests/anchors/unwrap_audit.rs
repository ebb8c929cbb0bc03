use crate::anchor_utils::{non_test_part, read_src_tree};

#[test]
fn test_runtime_paths_do_not_unwrap() {
    let mut violations = Vec::new();
    for (path, content) in read_src_tree() {
        for (idx, line) in non_test_part(&content).lines().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if line.contains(".unwrap()") || line.contains(".expect(") {
                violations.push(format!("{}:{}", path.display(), idx + 1));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "unwrap/expect outside tests:\n{}",
        violations.join("\n")
    );
}
