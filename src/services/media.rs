use crate::{
    config::Config,
    error::{AppError, Result},
    models::{media::UploadedCover, session::SessionContext},
    services::Database,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// 封面图片上传
#[derive(Clone)]
pub struct MediaService {
    db: Arc<Database>,
    config: Config,
}

/// 文件名只保留字母数字和 `.-_`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn content_type_for(image_type: imagesize::ImageType) -> Option<&'static str> {
    match image_type {
        imagesize::ImageType::Png => Some("image/png"),
        imagesize::ImageType::Jpeg => Some("image/jpeg"),
        imagesize::ImageType::Gif => Some("image/gif"),
        imagesize::ImageType::Webp => Some("image/webp"),
        _ => None,
    }
}

impl MediaService {
    pub async fn new(db: Arc<Database>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.config.storage_bucket
    }

    /// 上传封面，返回公开地址
    pub async fn upload_cover(
        &self,
        session: &SessionContext,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedCover> {
        debug!("User {} uploading cover {} ({} bytes)", session.user_id, filename, bytes.len());

        if bytes.is_empty() {
            return Err(AppError::FileUpload("File is empty".to_string()));
        }
        let size = bytes.len() as u64;
        if size > self.config.max_upload_size {
            return Err(AppError::FileUpload(format!(
                "File exceeds maximum size of {} bytes",
                self.config.max_upload_size
            )));
        }

        let allowed = self.config.allowed_image_extensions();
        let sanitized = sanitize_filename(filename);
        let extension = extension_of(&sanitized)
            .ok_or_else(|| AppError::FileUpload("File must have an image extension".to_string()))?;
        if !allowed.contains(&extension) {
            return Err(AppError::FileUpload(format!("File type .{} is not allowed", extension)));
        }
        let declared = content_type.trim().to_lowercase();
        if !declared.is_empty() && declared != "application/octet-stream" && !declared.starts_with("image/") {
            return Err(AppError::FileUpload(format!("Content type {} is not an image", declared)));
        }

        let image_type = imagesize::image_type(&bytes)
            .map_err(|_| AppError::FileUpload("File is not a valid image".to_string()))?;
        let detected = content_type_for(image_type)
            .ok_or_else(|| AppError::FileUpload("Unsupported image format".to_string()))?;
        let dimensions = imagesize::blob_size(&bytes)
            .map_err(|_| AppError::FileUpload("File is not a valid image".to_string()))?;

        let key = format!("{}_{}", Utc::now().timestamp_millis(), sanitized);
        let bucket = self.bucket().to_string();
        self.db.backend().upload(&bucket, &key, bytes, detected).await?;

        info!("Cover uploaded to {}/{} by {}", bucket, key, session.user_id);
        Ok(UploadedCover {
            url: self.db.backend().public_url(&bucket, &key),
            bucket,
            key,
            size,
            width: dimensions.width as u32,
            height: dimensions.height as u32,
            content_type: detected.to_string(),
        })
    }

    /// 读取存储的对象
    pub async fn fetch_object(&self, bucket: &str, key: &str) -> Result<(Vec<u8>, String)> {
        if key.split('/').any(|segment| segment == "..") {
            return Err(AppError::bad_request("Invalid object key"));
        }
        Ok(self.db.backend().download(bucket, key).await?)
    }
}
