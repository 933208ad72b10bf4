//! 后端行的兼容反序列化辅助模块

use serde::{Deserialize, Deserializer};

/// 字符串数组列
///
/// 管理工具写入的旧数据把数组存成 JSON 编码的字符串（例如 `"[\"미래\"]"`），
/// 两种形式都还原成 `Vec<String>`。
pub mod string_list {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ListValue {
            List(Vec<String>),
            Encoded(String),
            Missing(()),
        }

        Ok(match ListValue::deserialize(deserializer)? {
            ListValue::List(items) => items,
            ListValue::Encoded(raw) => decode(&raw),
            ListValue::Missing(()) => Vec::new(),
        })
    }

    fn decode(raw: &str) -> Vec<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_else(|_| {
            trimmed
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

/// 计数列：NULL 视为 0
pub mod counter {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
    }
}
