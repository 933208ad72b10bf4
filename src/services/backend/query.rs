use serde_json::Value;

/// 行过滤条件，对应 BaaS 的 `eq` / `neq` / `in` / `cs` / `is.null` 运算
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    In(String, Vec<Value>),
    /// 数组列包含给定元素
    Contains(String, Value),
    IsNull(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::In(c, _)
            | Filter::Contains(c, _)
            | Filter::IsNull(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// 表查询：过滤、排序、分页的组合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Neq(column.to_string(), value.into()));
        self
    }

    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn contains(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Contains(column.to_string(), value.into()));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order { column: column.to_string(), ascending: true });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order { column: column.to_string(), ascending: false });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 按页码分页，page 从 1 开始
    pub fn page(mut self, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        self.offset = Some((page - 1).saturating_mul(per_page));
        self.limit = Some(per_page);
        self
    }

    /// 只保留过滤条件（用于 count）
    pub fn filters_only(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_chains_filters_and_order() {
        let q = Query::new()
            .eq("work_id", "w1")
            .is_in("id", vec!["a", "b"])
            .order_desc("created_at")
            .page(3, 10);

        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0], Filter::Eq("work_id".into(), json!("w1")));
        assert_eq!(q.filters[1].column(), "id");
        assert_eq!(q.offset, Some(20));
        assert_eq!(q.limit, Some(10));
        assert!(!q.order[0].ascending);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let q = Query::new().page(0, 5);
        assert_eq!(q.offset, Some(0));
    }

    #[test]
    fn test_huge_page_saturates_offset() {
        let q = Query::new().page(usize::MAX, 2);
        assert_eq!(q.offset, Some(usize::MAX));
        assert_eq!(q.limit, Some(2));
    }

    #[test]
    fn test_filters_only_drops_paging() {
        let q = Query::new().eq("a", 1).order_asc("b").limit(4).filters_only();
        assert_eq!(q.filters.len(), 1);
        assert!(q.order.is_empty());
        assert_eq!(q.limit, None);
    }
}
