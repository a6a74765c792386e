//! Category tree and product model administration, plus the
//! subcategory/category consistency rule shared by product writes.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    cache::invalidate_catalog,
    dto::catalog::{
        CatalogModelList, CatalogModelRequest, CategoryList, CategoryRequest,
        CreateSubCategoryRequest, SubCategoriesByCategoriesRequest, SubCategoryList,
        UpdateCatalogModelRequest, UpdateSubCategoryRequest,
    },
    entity::{
        catalog_models::{ActiveModel as CatalogModelActive, Entity as CatalogModels},
        categories::{self, ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        product_categories::{Column as ProductCategoryCol, Entity as ProductCategories},
        product_subcategories::{Column as ProductSubCol, Entity as ProductSubcategories},
        products::{Column as ProdCol, Entity as Products},
        sub_categories::{self, ActiveModel as SubCategoryActive, Column as SubCategoryCol, Entity as SubCategories},
        sub_category_categories::{
            ActiveModel as SubCategoryLinkActive, Column as LinkCol, Entity as SubCategoryCategories,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{CatalogModel, Category, SubCategory},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Category and subcategory rows resolved for a product write.
#[derive(Debug, Default)]
pub struct Taxonomy {
    pub categories: Vec<categories::Model>,
    pub sub_categories: Vec<sub_categories::Model>,
}

/// Resolve the requested categories and subcategories and check that every
/// subcategory has a parent among the categories.
///
/// Runs a fixed number of queries whatever the subcategory count.
pub async fn resolve_taxonomy<C: ConnectionTrait>(
    conn: &C,
    category_ids: &[Uuid],
    sub_category_ids: &[Uuid],
) -> AppResult<Taxonomy> {
    let category_ids: HashSet<Uuid> = category_ids.iter().copied().collect();
    let sub_category_ids: HashSet<Uuid> = sub_category_ids.iter().copied().collect();

    let categories = if category_ids.is_empty() {
        Vec::new()
    } else {
        Categories::find()
            .filter(CategoryCol::Id.is_in(category_ids.iter().copied()))
            .all(conn)
            .await?
    };
    if categories.len() != category_ids.len() {
        return Err(AppError::NotFound("One or more categories not found".into()));
    }

    if sub_category_ids.is_empty() {
        return Ok(Taxonomy {
            categories,
            sub_categories: Vec::new(),
        });
    }

    let sub_categories = SubCategories::find()
        .filter(SubCategoryCol::Id.is_in(sub_category_ids.iter().copied()))
        .all(conn)
        .await?;
    if sub_categories.len() != sub_category_ids.len() {
        return Err(AppError::NotFound("One or more subcategories not found".into()));
    }

    let parents = parent_categories(conn, sub_category_ids.iter().copied()).await?;
    let ordered: Vec<Uuid> = sub_categories.iter().map(|s| s.id).collect();
    check_subcategory_parents(&ordered, &parents, &category_ids)?;

    Ok(Taxonomy {
        categories,
        sub_categories,
    })
}

/// Parent category ids for each subcategory, in one query.
pub async fn parent_categories<C, I>(conn: &C, sub_category_ids: I) -> AppResult<HashMap<Uuid, HashSet<Uuid>>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let links = SubCategoryCategories::find()
        .filter(LinkCol::SubCategoryId.is_in(sub_category_ids))
        .all(conn)
        .await?;

    let mut parents: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for link in links {
        parents
            .entry(link.sub_category_id)
            .or_default()
            .insert(link.category_id);
    }
    Ok(parents)
}

pub fn check_subcategory_parents(
    sub_category_ids: &[Uuid],
    parents: &HashMap<Uuid, HashSet<Uuid>>,
    category_ids: &HashSet<Uuid>,
) -> AppResult<()> {
    for sub_id in sub_category_ids {
        let belongs = parents
            .get(sub_id)
            .is_some_and(|p| !p.is_disjoint(category_ids));
        if !belongs {
            return Err(AppError::BadRequest(format!(
                "Subcategory with id {sub_id} does not belong to the provided categories"
            )));
        }
    }
    Ok(())
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;
    let name = required_name(&payload.name)?;
    let category = state
        .timed(async {
            ensure_category_name_free(state, &name, None).await?;

            let category = CategoryActive {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            Ok::<_, AppError>(category)
        })
        .await?;

    audit_quietly(
        state,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;
    let name = required_name(&payload.name)?;

    let category = state
        .timed(async {
            let existing = Categories::find_by_id(id).one(&state.orm).await?;
            let existing = match existing {
                Some(c) => c,
                None => return Err(AppError::not_found("Category")),
            };
            ensure_category_name_free(state, &name, Some(id)).await?;

            let mut active: CategoryActive = existing.into();
            active.name = Set(name);
            let category = active.update(&state.orm).await?;
            Ok::<_, AppError>(category)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;

    Ok(ApiResponse::success(
        "Updated",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    state
        .timed(async {
            let txn = state.orm.begin().await?;

            ProductCategories::delete_many()
                .filter(ProductCategoryCol::CategoryId.eq(id))
                .exec(&txn)
                .await?;
            SubCategoryCategories::delete_many()
                .filter(LinkCol::CategoryId.eq(id))
                .exec(&txn)
                .await?;
            let result = Categories::delete_by_id(id).exec(&txn).await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found("Category"));
            }
            txn.commit().await?;
            Ok::<_, AppError>(())
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_sub_categories(state: &AppState) -> AppResult<ApiResponse<SubCategoryList>> {
    let subs = SubCategories::find()
        .order_by_asc(SubCategoryCol::Name)
        .all(&state.orm)
        .await?;
    let parents = parent_categories(&state.orm, subs.iter().map(|s| s.id)).await?;
    let items = subs
        .into_iter()
        .map(|s| sub_category_view(s, &parents))
        .collect();
    Ok(ApiResponse::success("Subcategories", SubCategoryList { items }, None))
}

pub async fn sub_categories_by_categories(
    state: &AppState,
    payload: SubCategoriesByCategoriesRequest,
) -> AppResult<ApiResponse<SubCategoryList>> {
    if payload.category_ids.is_empty() {
        return Err(AppError::BadRequest("category_ids must not be empty".into()));
    }
    let links = SubCategoryCategories::find()
        .filter(LinkCol::CategoryId.is_in(payload.category_ids.iter().copied()))
        .all(&state.orm)
        .await?;
    let sub_ids: HashSet<Uuid> = links.iter().map(|l| l.sub_category_id).collect();

    let subs = if sub_ids.is_empty() {
        Vec::new()
    } else {
        SubCategories::find()
            .filter(SubCategoryCol::Id.is_in(sub_ids.iter().copied()))
            .order_by_asc(SubCategoryCol::Name)
            .all(&state.orm)
            .await?
    };
    let parents = parent_categories(&state.orm, sub_ids).await?;
    let items = subs
        .into_iter()
        .map(|s| sub_category_view(s, &parents))
        .collect();
    Ok(ApiResponse::success("Subcategories", SubCategoryList { items }, None))
}

pub async fn create_sub_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubCategoryRequest,
) -> AppResult<ApiResponse<SubCategory>> {
    ensure_staff(user)?;
    let name = required_name(&payload.name)?;
    let category_ids = distinct(&payload.category_ids);
    if category_ids.is_empty() {
        return Err(AppError::BadRequest(
            "At least one category is required".into(),
        ));
    }
    let sub = state
        .timed(async {
            if SubCategories::find()
                .filter(SubCategoryCol::Name.eq(name.clone()))
                .one(&state.orm)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict("SubCategory name already exists".into()));
            }

            let txn = state.orm.begin().await?;
            ensure_categories_exist(&txn, &category_ids).await?;

            let sub = SubCategoryActive {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            link_parents(&txn, sub.id, &category_ids).await?;
            txn.commit().await?;
            Ok::<_, AppError>(sub)
        })
        .await?;

    audit_quietly(
        state,
        Some(user.user_id),
        "subcategory_create",
        "sub_categories",
        serde_json::json!({ "sub_category_id": sub.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Subcategory created",
        SubCategory {
            id: sub.id,
            name: sub.name,
            category_ids,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_sub_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubCategoryRequest,
) -> AppResult<ApiResponse<SubCategory>> {
    ensure_staff(user)?;
    let (sub, parents) = state
        .timed(async {
            let txn = state.orm.begin().await?;

            let existing = SubCategories::find_by_id(id).one(&txn).await?;
            let existing = match existing {
                Some(s) => s,
                None => return Err(AppError::not_found("Subcategory")),
            };

            let mut active: SubCategoryActive = existing.into();
            if let Some(name) = payload.name {
                active.name = Set(required_name(&name)?);
            }
            let sub = active.update(&txn).await?;

            if let Some(category_ids) = payload.category_ids {
                let category_ids = distinct(&category_ids);
                if category_ids.is_empty() {
                    return Err(AppError::BadRequest(
                        "At least one category is required".into(),
                    ));
                }
                ensure_categories_exist(&txn, &category_ids).await?;
                SubCategoryCategories::delete_many()
                    .filter(LinkCol::SubCategoryId.eq(id))
                    .exec(&txn)
                    .await?;
                link_parents(&txn, id, &category_ids).await?;
            }

            let parents = parent_categories(&txn, [id]).await?;
            txn.commit().await?;
            Ok::<_, AppError>((sub, parents))
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;

    Ok(ApiResponse::success(
        "Updated",
        sub_category_view(sub, &parents),
        Some(Meta::empty()),
    ))
}

pub async fn delete_sub_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    state
        .timed(async {
            let txn = state.orm.begin().await?;

            ProductSubcategories::delete_many()
                .filter(ProductSubCol::SubCategoryId.eq(id))
                .exec(&txn)
                .await?;
            SubCategoryCategories::delete_many()
                .filter(LinkCol::SubCategoryId.eq(id))
                .exec(&txn)
                .await?;
            let result = SubCategories::delete_by_id(id).exec(&txn).await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found("Subcategory"));
            }
            txn.commit().await?;
            Ok::<_, AppError>(())
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_catalog_models(state: &AppState) -> AppResult<ApiResponse<CatalogModelList>> {
    let items = CatalogModels::find()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CatalogModel::from)
        .collect();
    Ok(ApiResponse::success("Models", CatalogModelList { items }, None))
}

pub async fn create_catalog_model(
    state: &AppState,
    user: &AuthUser,
    payload: CatalogModelRequest,
) -> AppResult<ApiResponse<CatalogModel>> {
    ensure_staff(user)?;
    let model = CatalogModelActive {
        id: Set(Uuid::new_v4()),
        name: Set(required_name(&payload.name)?),
        image: Set(payload.image),
        options: Set(payload.options),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Model created",
        CatalogModel::from(model),
        Some(Meta::empty()),
    ))
}

pub async fn update_catalog_model(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCatalogModelRequest,
) -> AppResult<ApiResponse<CatalogModel>> {
    ensure_staff(user)?;
    let existing = CatalogModels::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(m) => m,
        None => return Err(AppError::not_found("Model")),
    };

    let mut active: CatalogModelActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required_name(&name)?);
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }
    if let Some(options) = payload.options {
        active.options = Set(Some(options));
    }
    let model = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        CatalogModel::from(model),
        Some(Meta::empty()),
    ))
}

pub async fn delete_catalog_model(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    state
        .timed(async {
            let txn = state.orm.begin().await?;

            Products::update_many()
                .col_expr(ProdCol::ModelId, Expr::value(Option::<Uuid>::None))
                .filter(ProdCol::ModelId.eq(id))
                .exec(&txn)
                .await?;
            let result = CatalogModels::delete_by_id(id).exec(&txn).await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found("Model"));
            }
            txn.commit().await?;
            Ok::<_, AppError>(())
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn sub_category_view(
    sub: sub_categories::Model,
    parents: &HashMap<Uuid, HashSet<Uuid>>,
) -> SubCategory {
    let mut category_ids: Vec<Uuid> = parents
        .get(&sub.id)
        .map(|p| p.iter().copied().collect())
        .unwrap_or_default();
    category_ids.sort();
    SubCategory {
        id: sub.id,
        name: sub.name,
        category_ids,
    }
}

async fn ensure_category_name_free(
    state: &AppState,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let clash = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(&state.orm)
        .await?;
    match clash {
        Some(c) if Some(c.id) != except => {
            Err(AppError::Conflict("Category name already exists".into()))
        }
        _ => Ok(()),
    }
}

async fn ensure_categories_exist<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> AppResult<()> {
    let found = Categories::find()
        .filter(CategoryCol::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    if found.len() != ids.len() {
        return Err(AppError::BadRequest("Invalid category IDs".into()));
    }
    Ok(())
}

async fn link_parents<C: ConnectionTrait>(
    conn: &C,
    sub_category_id: Uuid,
    category_ids: &[Uuid],
) -> AppResult<()> {
    let rows = category_ids.iter().map(|category_id| SubCategoryLinkActive {
        sub_category_id: Set(sub_category_id),
        category_id: Set(*category_id),
    });
    SubCategoryCategories::insert_many(rows).exec(conn).await?;
    Ok(())
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    Ok(name.to_string())
}

/// Deduplicate ids, keeping first-seen order.
pub fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.insert(*id) {
            out.push(*id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn subcategory_without_parents_is_rejected() {
        let sub = Uuid::new_v4();
        let chosen: HashSet<Uuid> = ids(2).into_iter().collect();
        let parents = HashMap::new();
        assert!(matches!(
            check_subcategory_parents(&[sub], &parents, &chosen),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn single_parent_must_be_selected() {
        let sub = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let parents = HashMap::from([(sub, HashSet::from([parent]))]);

        let with_parent = HashSet::from([parent, Uuid::new_v4()]);
        assert!(check_subcategory_parents(&[sub], &parents, &with_parent).is_ok());

        let without_parent = HashSet::from([Uuid::new_v4()]);
        assert!(check_subcategory_parents(&[sub], &parents, &without_parent).is_err());
    }

    #[test]
    fn any_of_several_parents_is_enough() {
        let sub = Uuid::new_v4();
        let family = ids(3);
        let parents = HashMap::from([(sub, family.iter().copied().collect())]);

        let chosen = HashSet::from([family[2]]);
        assert!(check_subcategory_parents(&[sub], &parents, &chosen).is_ok());

        let unrelated: HashSet<Uuid> = ids(3).into_iter().collect();
        assert!(check_subcategory_parents(&[sub], &parents, &unrelated).is_err());
    }

    #[test]
    fn one_orphan_fails_the_whole_set() {
        let (good, bad) = (Uuid::new_v4(), Uuid::new_v4());
        let parent = Uuid::new_v4();
        let parents = HashMap::from([
            (good, HashSet::from([parent])),
            (bad, HashSet::from([Uuid::new_v4()])),
        ]);
        let chosen = HashSet::from([parent]);
        let err = check_subcategory_parents(&[good, bad], &parents, &chosen).unwrap_err();
        assert!(err.to_string().contains(&bad.to_string()));
    }

    #[test]
    fn distinct_keeps_first_occurrence_order() {
        let v = ids(3);
        let input = vec![v[1], v[0], v[1], v[2], v[0]];
        assert_eq!(distinct(&input), vec![v[1], v[0], v[2]]);
    }
}
