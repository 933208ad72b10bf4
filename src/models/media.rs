use serde::{Deserialize, Serialize};

/// 封面上传结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedCover {
    pub url: String,
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
}
