use crate::{
    error::Result,
    models::work::Work,
    services::{
        backend::{
            schema::{COMMENTS, INTERACTIONS, LIBRARY_FOLLOWERS, USER_LIBRARIES, WORKS},
            Query,
        },
        Database,
    },
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// 派生计数
///
/// 每次变更后按集合基数重新计算并写回，计数列始终等于对应边集合的大小。
#[derive(Clone)]
pub struct Counters {
    db: Arc<Database>,
}

impl Counters {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn refresh_work_likes(&self, work_id: &str) -> Result<i64> {
        let count = self
            .db
            .count(
                INTERACTIONS,
                &Query::new().eq("work_id", work_id).eq("interaction_type", "like"),
            )
            .await? as i64;
        self.db
            .update_where(WORKS, &Query::new().eq("id", work_id), json!({ "like_count": count }))
            .await?;
        debug!("Work {} like_count = {}", work_id, count);
        Ok(count)
    }

    pub async fn refresh_work_comments(&self, work_id: &str) -> Result<i64> {
        let count = self.db.count(COMMENTS, &Query::new().eq("work_id", work_id)).await? as i64;
        self.db
            .update_where(WORKS, &Query::new().eq("id", work_id), json!({ "comment_count": count }))
            .await?;
        debug!("Work {} comment_count = {}", work_id, count);
        Ok(count)
    }

    pub async fn refresh_library_followers(&self, library_id: &str) -> Result<i64> {
        let count = self
            .db
            .count(LIBRARY_FOLLOWERS, &Query::new().eq("library_id", library_id))
            .await? as i64;
        self.db
            .update_where(
                USER_LIBRARIES,
                &Query::new().eq("id", library_id),
                json!({ "followers_count": count }),
            )
            .await?;
        debug!("Library {} followers_count = {}", library_id, count);
        Ok(count)
    }

    /// 书房的作品数、浏览总数、点赞总数
    pub async fn refresh_library_totals(&self, library_id: &str) -> Result<()> {
        let works: Vec<Work> = self
            .db
            .select(WORKS, &Query::new().eq("library_id", library_id))
            .await?;

        let total_works = works.len() as i64;
        let total_views: i64 = works.iter().map(|w| w.view_count).sum();
        let total_likes: i64 = works.iter().map(|w| w.like_count).sum();

        self.db
            .update_where(
                USER_LIBRARIES,
                &Query::new().eq("id", library_id),
                json!({
                    "total_works": total_works,
                    "total_views": total_views,
                    "total_likes": total_likes,
                }),
            )
            .await?;
        debug!(
            "Library {} totals: works={} views={} likes={}",
            library_id, total_works, total_views, total_likes
        );
        Ok(())
    }
}
