//! 文学馆后端的表结构定义。
//!
//! 内存后端用它来执行唯一约束和回答自省 RPC，`migrations/0001_init.sql`
//! 是同一份结构在托管数据库中的版本。

pub const PROFILES: &str = "profiles";
pub const WORKS: &str = "works";
pub const USER_LIBRARIES: &str = "user_libraries";
pub const INTERACTIONS: &str = "interactions";
pub const COMMENTS: &str = "comments";
pub const LIBRARY_FOLLOWERS: &str = "library_followers";
pub const NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub data_type: &'static str,
    pub nullable: bool,
    pub default: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// 每一项是一组联合唯一的列
    pub unique: &'static [&'static [&'static str]],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

const fn col(name: &'static str, data_type: &'static str, nullable: bool, default: Option<&'static str>) -> ColumnDef {
    ColumnDef { name, data_type, nullable, default }
}

pub static TABLES: &[TableDef] = &[
    TableDef {
        name: PROFILES,
        columns: &[
            col("id", "uuid", false, None),
            col("full_name", "text", true, Some("''::text")),
            col("bio", "text", true, Some("''::text")),
            col("created_at", "timestamp with time zone", false, Some("now()")),
            col("updated_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: WORKS,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("title", "text", false, None),
            col("genre", "text", false, None),
            col("themes", "ARRAY", true, Some("'{}'::text[]")),
            col("description", "text", true, None),
            col("content", "text", true, None),
            col("model_version", "text", true, None),
            col("cover_url", "text", true, None),
            col("prompt", "text", true, None),
            col("original_text", "text", true, None),
            col("variation_prompt", "text", true, None),
            col("variation_text", "text", true, None),
            col("user_id", "uuid", true, None),
            col("library_id", "uuid", true, None),
            col("like_count", "integer", false, Some("0")),
            col("view_count", "integer", false, Some("0")),
            col("comment_count", "integer", false, Some("0")),
            col("is_public", "boolean", false, Some("true")),
            col("created_at", "timestamp with time zone", false, Some("now()")),
            col("updated_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: USER_LIBRARIES,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("user_id", "uuid", false, None),
            col("name", "text", false, None),
            col("description", "text", true, None),
            col("banner_url", "text", true, None),
            col("is_public", "boolean", false, Some("true")),
            col("theme", "text", false, Some("'default'::text")),
            col("total_works", "integer", false, Some("0")),
            col("total_views", "integer", false, Some("0")),
            col("total_likes", "integer", false, Some("0")),
            col("followers_count", "integer", false, Some("0")),
            col("created_at", "timestamp with time zone", false, Some("now()")),
            col("updated_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"], &["user_id"]],
    },
    TableDef {
        name: INTERACTIONS,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("work_id", "uuid", false, None),
            col("user_id", "uuid", false, None),
            col("interaction_type", "text", false, None),
            col("created_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"], &["work_id", "user_id", "interaction_type"]],
    },
    TableDef {
        name: COMMENTS,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("work_id", "uuid", false, None),
            col("user_id", "uuid", false, None),
            col("content", "text", false, None),
            col("created_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: LIBRARY_FOLLOWERS,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("library_id", "uuid", false, None),
            col("follower_id", "uuid", false, None),
            col("created_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"], &["library_id", "follower_id"]],
    },
    TableDef {
        name: NOTIFICATIONS,
        columns: &[
            col("id", "uuid", false, Some("gen_random_uuid()")),
            col("user_id", "uuid", false, None),
            col("type", "text", false, None),
            col("actor_id", "uuid", false, None),
            col("work_id", "uuid", true, None),
            col("library_id", "uuid", true, None),
            col("content", "text", false, Some("''::text")),
            col("is_read", "boolean", false, Some("false")),
            col("created_at", "timestamp with time zone", false, Some("now()")),
        ],
        unique: &[&["id"]],
    },
];

pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

/// 允许自增的计数列
pub fn is_counter_column(table_name: &str, column: &str) -> bool {
    matches!(
        (table_name, column),
        (WORKS, "view_count" | "like_count" | "comment_count")
            | (USER_LIBRARIES, "total_works" | "total_views" | "total_likes" | "followers_count")
    )
}
