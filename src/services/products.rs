use crate::{
    db::DbPool,
    entities::{
        order_item,
        product::{self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{validate_positive_amount, PageLimits},
    PaginatedResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Product name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    #[validate(custom = "validate_positive_amount")]
    pub price: Decimal,
    #[validate(custom = "validate_positive_amount")]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_quantity: i32,
    /// Free-text specification pairs such as `"Weight": "8.5 kg"`
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_positive_amount")]
    pub mrp: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_quantity: Option<i32>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    /// Positive to receive stock, negative to write it off
    #[validate(custom = "validate_non_zero")]
    pub delta: i32,
    pub reason: Option<String>,
}

fn validate_non_zero(value: i32) -> Result<(), ValidationError> {
    if value == 0 {
        let mut err = ValidationError::new("delta");
        err.message = Some("Stock adjustment cannot be zero".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Moves stock by `delta` in a single conditional UPDATE. The row is only
/// touched when the result stays within `0..=i32::MAX`; `false` means the
/// guard rejected it (or the product is gone) and nothing changed.
pub(crate) async fn shift_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
) -> Result<bool, ServiceError> {
    let mut update = ProductEntity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).add(delta),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id));

    update = if delta < 0 {
        update.filter(product::Column::StockQuantity.gte(-i64::from(delta)))
    } else {
        update.filter(product::Column::StockQuantity.lte(i32::MAX - delta))
    };

    let result = update.exec(conn).await?;
    Ok(result.rows_affected == 1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    /// Substring of name, sku or description
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    /// Seller views include deactivated products
    pub include_inactive: Option<bool>,
    pub sort: Option<ProductSort>,
}

/// Catalog management for the storefront and the seller dashboard
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    low_stock_threshold: i32,
    page_limits: PageLimits,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        low_stock_threshold: i32,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            low_stock_threshold,
            page_limits,
        }
    }

    pub fn low_stock_threshold(&self) -> i32 {
        self.low_stock_threshold
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        ensure_mrp_covers_price(request.price, request.mrp)?;

        let db = &*self.db_pool;
        let sku = request.sku.trim().to_string();
        self.ensure_sku_available(&sku, None).await?;

        let now = Utc::now();
        let product = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            category: Set(request.category.trim().to_string()),
            price: Set(request.price),
            mrp: Set(request.mrp),
            stock_quantity: Set(request.stock_quantity),
            specifications: Set(serde_json::to_value(&request.specifications)?),
            image_urls: Set(serde_json::to_value(&request.image_urls)?),
            is_active: Set(request.is_active),
            is_featured: Set(request.is_featured),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert product");
            ServiceError::db_error(e)
        })?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<PaginatedResponse<ProductModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);

        let mut select = ProductEntity::find();

        if !query.include_inactive.unwrap_or(false) {
            select = select.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            select = select.filter(product::Column::Category.eq(category));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::Sku.contains(search))
                    .add(product::Column::Description.contains(search)),
            );
        }
        if let Some(min_price) = query.min_price {
            select = select.filter(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = query.max_price {
            select = select.filter(product::Column::Price.lte(max_price));
        }
        match query.in_stock {
            Some(true) => select = select.filter(product::Column::StockQuantity.gt(0)),
            Some(false) => select = select.filter(product::Column::StockQuantity.lte(0)),
            None => {}
        }
        if let Some(featured) = query.featured {
            select = select.filter(product::Column::IsFeatured.eq(featured));
        }

        select = match query.sort.unwrap_or_default() {
            ProductSort::Newest => select.order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceAsc => select.order_by_asc(product::Column::Price),
            ProductSort::PriceDesc => select.order_by_desc(product::Column::Price),
            ProductSort::Name => select.order_by_asc(product::Column::Name),
        }
        .order_by_asc(product::Column::Id);

        let paginator = select.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        let existing = self.get_product(product_id).await?;

        let price = request.price.unwrap_or(existing.price);
        let mrp = request.mrp.or(existing.mrp);
        ensure_mrp_covers_price(price, mrp)?;

        let mut model: ProductActiveModel = existing.into();

        if let Some(sku) = request.sku {
            let sku = sku.trim().to_string();
            self.ensure_sku_available(&sku, Some(product_id)).await?;
            model.sku = Set(sku);
        }
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            model.description = Set(Some(description));
        }
        if let Some(category) = request.category {
            model.category = Set(category.trim().to_string());
        }
        model.price = Set(price);
        model.mrp = Set(mrp);
        if let Some(stock) = request.stock_quantity {
            model.stock_quantity = Set(stock);
        }
        if let Some(specifications) = request.specifications {
            model.specifications = Set(serde_json::to_value(&specifications)?);
        }
        if let Some(image_urls) = request.image_urls {
            model.image_urls = Set(serde_json::to_value(&image_urls)?);
        }
        if let Some(is_active) = request.is_active {
            model.is_active = Set(is_active);
        }
        if let Some(is_featured) = request.is_featured {
            model.is_featured = Set(is_featured);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        info!(product_id = %product_id, "Product updated");
        Ok(updated)
    }

    /// Products that appear on orders cannot be removed; deactivate them instead.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let product = self.get_product(product_id).await?;

        let references = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        if references > 0 {
            warn!(product_id = %product_id, references, "Refusing to delete ordered product");
            return Err(ServiceError::Conflict(format!(
                "Product {} appears on {} order line(s); deactivate it instead",
                product.sku, references
            )));
        }

        ProductEntity::delete_by_id(product_id).exec(db).await?;
        info!(product_id = %product_id, sku = %product.sku, "Product deleted");
        Ok(())
    }

    #[instrument(skip(self, request), fields(delta = request.delta))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        request: AdjustStockRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let new_quantity = product.stock_quantity.checked_add(request.delta).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Adjusting {} by {} exceeds the maximum stock level",
                product.sku, request.delta
            ))
        })?;
        if new_quantity < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "{} has {} in stock, cannot remove {}",
                product.sku,
                product.stock_quantity,
                request.delta.unsigned_abs()
            )));
        }

        if !shift_stock(&txn, product_id, request.delta).await? {
            return Err(ServiceError::InsufficientStock(format!(
                "Stock of {} changed concurrently; retry the adjustment",
                product.sku
            )));
        }
        let updated = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        txn.commit().await?;

        info!(
            product_id = %product_id,
            new_quantity = updated.stock_quantity,
            reason = request.reason.as_deref().unwrap_or("unspecified"),
            "Stock adjusted"
        );

        if updated.stock_quantity <= self.low_stock_threshold {
            self.event_sender
                .send_or_log(Event::LowStock {
                    product_id: updated.id,
                    name: updated.name.clone(),
                    sku: updated.sku.clone(),
                    stock_quantity: updated.stock_quantity,
                })
                .await;
        }

        Ok(updated)
    }

    /// Distinct categories of active products, alphabetical
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories: Vec<String> = ProductEntity::find()
            .select_only()
            .column(product::Column::Category)
            .filter(product::Column::IsActive.eq(true))
            .distinct()
            .order_by_asc(product::Column::Category)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;
        Ok(categories)
    }

    #[instrument(skip(self))]
    pub async fn low_stock_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        let products = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::StockQuantity.lte(self.low_stock_threshold))
            .order_by_asc(product::Column::StockQuantity)
            .order_by_asc(product::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(products)
    }

    async fn ensure_sku_available(
        &self,
        sku: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut select = ProductEntity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = except {
            select = select.filter(product::Column::Id.ne(id));
        }
        if select.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!("SKU {} already exists", sku)));
        }
        Ok(())
    }
}

fn ensure_mrp_covers_price(price: Decimal, mrp: Option<Decimal>) -> Result<(), ServiceError> {
    match mrp {
        Some(mrp) if mrp < price => Err(ServiceError::ValidationError(format!(
            "MRP {} cannot be below the selling price {}",
            mrp, price
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mrp_must_not_undercut_price() {
        assert!(ensure_mrp_covers_price(dec!(12999), Some(dec!(15999))).is_ok());
        assert!(ensure_mrp_covers_price(dec!(12999), Some(dec!(12999))).is_ok());
        assert!(ensure_mrp_covers_price(dec!(12999), None).is_ok());
        assert!(ensure_mrp_covers_price(dec!(12999), Some(dec!(9999))).is_err());
    }

    #[test]
    fn create_request_rejects_non_positive_price_and_negative_stock() {
        let request = CreateProductRequest {
            sku: "RO-1".into(),
            name: "Purifier".into(),
            description: None,
            category: "RO".into(),
            price: dec!(0),
            mrp: None,
            stock_quantity: -1,
            specifications: BTreeMap::new(),
            image_urls: vec![],
            is_active: true,
            is_featured: false,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("stock_quantity"));
    }

    #[test]
    fn zero_stock_adjustment_is_invalid() {
        let request = AdjustStockRequest {
            delta: 0,
            reason: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn sort_parses_from_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
