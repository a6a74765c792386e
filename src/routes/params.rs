use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with_default(20)
    }

    /// Returns `(page, per_page, offset)` with page >= 1 and per_page in 1..=100.
    pub fn normalize_with_default(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(default_per_page).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilterQuery {
    /// Category name.
    pub category: Option<String>,
    /// Subcategory name.
    pub subcategory: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "per_page")]
    pub limit: Option<i64>,
}

impl ProductFilterQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

impl ReviewListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_page_and_size() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(0, 500).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::default().normalize_with_default(10), (1, 10, 0));
    }
}
