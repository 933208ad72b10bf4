use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        library::Library,
        session::SessionContext,
        work::*,
    },
    services::{
        backend::{
            schema::{COMMENTS, INTERACTIONS, USER_LIBRARIES, WORKS},
            Query,
        },
        counters::Counters,
        database::PaginatedResult,
        Database, UserService,
    },
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 首页主题书架
pub const HOME_THEMES: [&str; 3] = ["미래", "인간성", "자연"];

const HOME_SECTION_SIZE: usize = 5;
const HOME_LIBRARY_COUNT: usize = 3;
const SHELF_SIZE: usize = 6;

/// 作品服务
#[derive(Clone)]
pub struct WorkService {
    db: Arc<Database>,
    counters: Counters,
    user_service: UserService,
    config: Config,
}

fn optional_text(value: &Option<String>) -> Value {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => json!(text),
        _ => Value::Null,
    }
}

fn clean_themes(themes: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for theme in themes.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !cleaned.iter().any(|c| c == theme) {
            cleaned.push(theme.to_string());
        }
    }
    cleaned
}

impl WorkService {
    pub async fn new(db: Arc<Database>, user_service: UserService, config: &Config) -> Result<Self> {
        Ok(Self {
            counters: Counters::new(db.clone()),
            db,
            user_service,
            config: config.clone(),
        })
    }

    /// 作品列表
    pub async fn list_works(&self, filter: &WorkListQuery, viewer: Option<&SessionContext>) -> Result<PaginatedResult<Work>> {
        debug!("Listing works with filter: {:?}", filter);

        let mut query = Query::new();
        if let Some(genre) = filter.genre.as_deref().filter(|g| !g.is_empty()) {
            query = query.eq("genre", genre);
        }
        if let Some(theme) = filter.theme.as_deref().filter(|t| !t.is_empty()) {
            query = query.contains("themes", theme);
        }
        if let Some(library_id) = filter.library_id.as_deref() {
            query = query.eq("library_id", library_id);
        }
        if let Some(user_id) = filter.user_id.as_deref() {
            query = query.eq("user_id", user_id);
        }

        // 只有本人查看自己的作品时包含私有作品
        let owner_view = match (viewer, filter.user_id.as_deref()) {
            (Some(v), Some(user_id)) => v.can_manage(Some(user_id)),
            _ => false,
        };
        if !owner_view {
            query = query.eq("is_public", true);
        }

        query = match filter.sort.unwrap_or_default() {
            WorkSort::Latest => query.order_desc("created_at"),
            WorkSort::Popular => query.order_desc("like_count").order_desc("created_at"),
        };

        let page = filter.page.unwrap_or(1);
        let limit = filter
            .limit
            .unwrap_or(self.config.default_works_per_page)
            .clamp(1, 100);
        self.db.paginate(WORKS, query, page, limit).await
    }

    pub async fn latest(&self, limit: usize) -> Result<Vec<Work>> {
        self.db
            .select(WORKS, &Query::new().eq("is_public", true).order_desc("created_at").limit(limit))
            .await
    }

    pub async fn popular(&self, limit: usize) -> Result<Vec<Work>> {
        self.db
            .select(
                WORKS,
                &Query::new()
                    .eq("is_public", true)
                    .order_desc("like_count")
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await
    }

    async fn find_work(&self, id: &str) -> Result<Work> {
        self.db
            .get_by_id(WORKS, id)
            .await?
            .ok_or_else(|| AppError::not_found("Work"))
    }

    /// 作品详情，同时原子增加浏览数
    pub async fn get_work(&self, id: &str, viewer: Option<&SessionContext>) -> Result<WorkDetail> {
        debug!("Getting work: {}", id);
        let mut work = self.find_work(id).await?;

        if !work.is_public && !viewer.map_or(false, |v| v.can_manage(work.user_id.as_deref())) {
            return Err(AppError::not_found("Work"));
        }

        work.view_count = self.db.increment(WORKS, id, "view_count", 1).await?;
        if let Some(library_id) = work.library_id.as_deref() {
            self.counters.refresh_library_totals(library_id).await?;
        }

        let author_name = match work.user_id.as_deref() {
            Some(user_id) => Some(self.user_service.display_name(user_id).await?),
            None => None,
        };
        let liked_by_viewer = match viewer {
            Some(session) => {
                self.db
                    .count(
                        INTERACTIONS,
                        &Query::new()
                            .eq("work_id", id)
                            .eq("user_id", session.user_id.as_str())
                            .eq("interaction_type", "like"),
                    )
                    .await?
                    > 0
            }
            None => false,
        };

        Ok(WorkDetail {
            has_variation: work.has_variation(),
            work,
            author_name,
            liked_by_viewer,
        })
    }

    async fn user_library(&self, user_id: &str) -> Result<Option<Library>> {
        self.db
            .find_one(USER_LIBRARIES, Query::new().eq("user_id", user_id))
            .await
    }

    pub async fn create_work(&self, session: &SessionContext, request: CreateWorkRequest) -> Result<Work> {
        debug!("Creating work for user: {}", session.user_id);
        request.validate()?;

        let title = request.title.trim();
        let genre = request.genre.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if genre.is_empty() {
            return Err(AppError::validation("Genre is required"));
        }

        let library_id = match request.library_id.as_deref().filter(|id| !id.is_empty()) {
            Some(library_id) => {
                let library: Library = self
                    .db
                    .get_by_id(USER_LIBRARIES, library_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Library"))?;
                if !session.can_manage(Some(&library.user_id)) {
                    return Err(AppError::forbidden("Cannot add works to another user's library"));
                }
                Some(library.id)
            }
            None => self.user_library(&session.user_id).await?.map(|l| l.id),
        };

        let work: Work = self
            .db
            .create(
                WORKS,
                &json!({
                    "title": title,
                    "genre": genre,
                    "themes": clean_themes(&request.themes),
                    "description": optional_text(&request.description),
                    "content": optional_text(&request.content),
                    "model_version": optional_text(&request.model_version),
                    "cover_url": optional_text(&request.cover_url),
                    "prompt": optional_text(&request.prompt),
                    "original_text": optional_text(&request.original_text),
                    "variation_prompt": optional_text(&request.variation_prompt),
                    "variation_text": optional_text(&request.variation_text),
                    "user_id": session.user_id,
                    "library_id": library_id,
                    "is_public": request.is_public.unwrap_or(true),
                }),
            )
            .await?;

        if let Some(library_id) = work.library_id.as_deref() {
            self.counters.refresh_library_totals(library_id).await?;
        }

        info!("Work {} created by {}", work.id, session.user_id);
        Ok(work)
    }

    /// 所有者或管理员可编辑
    pub async fn update_work(&self, session: &SessionContext, id: &str, request: UpdateWorkRequest) -> Result<Work> {
        request.validate()?;
        let work = self.find_work(id).await?;
        if !session.can_manage(work.user_id.as_deref()) {
            return Err(AppError::forbidden("Only the author can edit this work"));
        }

        let mut patch = Map::new();
        if let Some(title) = request.title.as_deref().map(str::trim) {
            if title.is_empty() {
                return Err(AppError::validation("Title is required"));
            }
            patch.insert("title".into(), json!(title));
        }
        if let Some(genre) = request.genre.as_deref().map(str::trim) {
            if genre.is_empty() {
                return Err(AppError::validation("Genre is required"));
            }
            patch.insert("genre".into(), json!(genre));
        }
        if let Some(themes) = &request.themes {
            patch.insert("themes".into(), json!(clean_themes(themes)));
        }
        let texts = [
            ("description", &request.description),
            ("content", &request.content),
            ("model_version", &request.model_version),
            ("cover_url", &request.cover_url),
            ("prompt", &request.prompt),
            ("original_text", &request.original_text),
            ("variation_prompt", &request.variation_prompt),
            ("variation_text", &request.variation_text),
        ];
        for (column, value) in texts {
            if value.is_some() {
                patch.insert(column.into(), optional_text(value));
            }
        }
        if let Some(is_public) = request.is_public {
            patch.insert("is_public".into(), json!(is_public));
        }
        patch.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

        let updated = self
            .db
            .update_by_id::<Work>(WORKS, id, Value::Object(patch))
            .await?
            .ok_or_else(|| AppError::not_found("Work"))?;

        info!("Work {} updated by {}", id, session.user_id);
        Ok(updated)
    }

    /// 删除作品，仅管理员
    pub async fn delete_work(&self, session: &SessionContext, id: &str) -> Result<()> {
        if !session.is_admin {
            return Err(AppError::forbidden("Only administrators can delete works"));
        }
        let work = self.find_work(id).await?;

        self.db.delete_where(INTERACTIONS, &Query::new().eq("work_id", id)).await?;
        self.db.delete_where(COMMENTS, &Query::new().eq("work_id", id)).await?;
        self.db.delete_where(WORKS, &Query::new().eq("id", id)).await?;

        if let Some(library_id) = work.library_id.as_deref() {
            self.counters.refresh_library_totals(library_id).await?;
        }

        info!("Work {} deleted by admin {}", id, session.user_id);
        Ok(())
    }

    /// 首页数据
    pub async fn home_feed(&self) -> Result<HomeFeed> {
        let latest = self.latest(HOME_SECTION_SIZE).await?;
        let popular = self.popular(HOME_SECTION_SIZE).await?;
        let libraries: Vec<Library> = self
            .db
            .select(
                USER_LIBRARIES,
                &Query::new()
                    .eq("is_public", true)
                    .order_desc("followers_count")
                    .order_desc("created_at")
                    .limit(HOME_LIBRARY_COUNT),
            )
            .await?;

        let mut shelves = Vec::with_capacity(HOME_THEMES.len());
        for theme in HOME_THEMES {
            let works = self
                .db
                .select(
                    WORKS,
                    &Query::new()
                        .eq("is_public", true)
                        .contains("themes", theme)
                        .order_desc("created_at")
                        .limit(SHELF_SIZE),
                )
                .await?;
            shelves.push(ThemeShelf { theme: theme.to_string(), works });
        }

        Ok(HomeFeed { latest, popular, libraries, shelves })
    }

    /// 空库时写入示例作品，返回写入数量
    pub async fn seed_sample_works(&self) -> Result<usize> {
        if self.db.count(WORKS, &Query::new()).await? > 0 {
            return Ok(0);
        }

        let samples = [
            json!({
                "title": "GPT-5의 서정시 모음",
                "genre": "시",
                "themes": ["인간성", "자연"],
                "description": "GPT-5가 생성한 다양한 서정시 모음집",
                "content": "푸른 들판 위로 흐르는 바람...",
                "model_version": "GPT-5.0",
            }),
            json!({
                "title": "미래 도시 단편 소설",
                "genre": "소설",
                "themes": ["미래", "테크놀로지"],
                "description": "인간과 AI가 공존하는 미래 도시를 그린 단편 모음",
                "content": "거대한 홀로그램 광고가 펼쳐진 거리...",
                "model_version": "GPT-5.1",
            }),
            json!({
                "title": "웃음의 미학",
                "genre": "에세이",
                "themes": ["유머", "인간성"],
                "description": "일상 속 작은 웃음에 대한 사색",
                "content": "아침 식탁 위의 빵 부스러기조차 웃음을 불러올 수 있다...",
                "model_version": "GPT-5.2",
            }),
        ];

        let total = samples.len();
        for sample in samples {
            let _: Work = self.db.create(WORKS, &sample).await?;
        }
        info!("Seeded {} sample works", total);
        Ok(total)
    }
}
