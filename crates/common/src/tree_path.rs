//! 物化路径工具
//!
//! 树节点保存祖先 ID 链：每个祖先 ID 后跟一个分隔符，不包含节点自身。
//! 根节点的路径为空串。子树通过前缀 `parent_path + id + "."` 定位。

/// 路径分隔符
pub const DELIMITER: char = '.';

/// 将祖先 ID 序列编码为路径
pub fn encode<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push_str(segment.as_ref());
        path.push(DELIMITER);
    }
    path
}

/// 将路径解码为祖先 ID 序列（根在前）
pub fn decode(path: &str) -> Vec<&str> {
    path.split(DELIMITER).filter(|s| !s.is_empty()).collect()
}

/// 子节点的路径，也是以该节点为根的子树前缀
pub fn child_prefix(parent_path: &str, parent_id: &str) -> String {
    let mut prefix = String::with_capacity(parent_path.len() + parent_id.len() + 1);
    prefix.push_str(parent_path);
    prefix.push_str(parent_id);
    prefix.push(DELIMITER);
    prefix
}

/// 判断 `path` 是否位于 `prefix` 指定的子树之内
pub fn in_subtree(path: &str, prefix: &str) -> bool {
    !prefix.is_empty() && path.starts_with(prefix)
}

/// 把路径中的旧前缀替换为新前缀；不在旧前缀下时返回 None
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    path.strip_prefix(old_prefix)
        .map(|rest| format!("{new_prefix}{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let path = encode(&["a", "b", "c"]);
        assert_eq!(path, "a.b.c.");
        assert_eq!(decode(&path), vec!["a", "b", "c"]);
        assert!(decode("").is_empty());
        assert_eq!(encode::<&str>(&[]), "");
    }

    #[test]
    fn test_child_prefix() {
        assert_eq!(child_prefix("", "a"), "a.");
        assert_eq!(child_prefix("a.", "b"), "a.b.");
    }

    #[test]
    fn test_in_subtree() {
        assert!(in_subtree("a.b.", "a."));
        assert!(in_subtree("a.", "a."));
        assert!(!in_subtree("ab.", "a."));
        assert!(!in_subtree("a.", ""));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("a.b.c.", "a.b.", "x."), Some("x.c.".to_string()));
        assert_eq!(rebase("a.b.", "a.b.", ""), Some(String::new()));
        assert_eq!(rebase("z.", "a.", "x."), None);
    }
}
