use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use super::{loading_plan::OptimizationResult, order_data::OrderData};

/// Processing state of an uploaded purchase order
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, EnumString, Display, Default,
)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub document_path: String,
    pub status: OrderStatus,
    pub raw_ocr_data: Option<String>, // JSON-serialized OrderData
    pub loading_instructions: Option<String>, // JSON-serialized OptimizationResult
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn parsed_ocr_data(&self) -> Option<OrderData> {
        self.raw_ocr_data
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
    }

    pub fn parsed_loading_instructions(&self) -> Option<OptimizationResult> {
        self.loading_instructions
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Row in the order list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: Option<String>,
    pub po_number: Option<String>,
    pub status: OrderStatus,
    pub document_path: String,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        let header = order.parsed_ocr_data().map(|data| data.order_header);
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        Self {
            id: order.id,
            order_number: header
                .as_ref()
                .and_then(|h| non_empty(h.order_number.clone())),
            po_number: header.and_then(|h| non_empty(h.po_number)),
            status: order.status,
            document_path: order.document_path,
            created_at: order.created_at,
        }
    }
}

/// Order detail as shown to the user. Currency lines are already filtered
/// out of `order_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: Uuid,
    pub document_path: String,
    pub status: OrderStatus,
    pub order_data: Option<OrderData>,
    pub loading_instructions: Option<OptimizationResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderDetail {
    fn from(order: Order) -> Self {
        Self {
            order_data: order
                .parsed_ocr_data()
                .map(|data| data.without_currency_items()),
            loading_instructions: order.parsed_loading_instructions(),
            id: order.id,
            document_path: order.document_path,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Protocol(e.to_string()))
}

impl Order {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        document_path: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, document_path, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(document_path)
        .bind(OrderStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Replace `raw_ocr_data` wholesale, optionally moving the status along.
    pub async fn update_ocr_data(
        pool: &SqlitePool,
        id: Uuid,
        data: &OrderData,
        status: Option<OrderStatus>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let json = to_json(data)?;
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET raw_ocr_data = ?,
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            RETURNING id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            "#,
        )
        .bind(json)
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Replace the stored loading plan. Last write wins.
    pub async fn update_loading_instructions(
        pool: &SqlitePool,
        id: Uuid,
        result: &OptimizationResult,
    ) -> Result<Option<Self>, sqlx::Error> {
        let json = to_json(result)?;
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET loading_instructions = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, document_path, status, raw_ocr_data, loading_instructions, created_at, updated_at
            "#,
        )
        .bind(json)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
