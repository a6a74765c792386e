use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CatalogModel, Category, SubCategory};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubCategoryRequest {
    pub name: String,
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubCategoryRequest {
    pub name: Option<String>,
    pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubCategoriesByCategoriesRequest {
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogModelRequest {
    pub name: String,
    pub image: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCatalogModelRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubCategoryList {
    #[schema(value_type = Vec<SubCategory>)]
    pub items: Vec<SubCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CatalogModelList {
    #[schema(value_type = Vec<CatalogModel>)]
    pub items: Vec<CatalogModel>,
}
