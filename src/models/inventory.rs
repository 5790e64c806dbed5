// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{non_negative, not_blank};
use crate::models::{Collection, Patchable, Record, dashboard::DashboardData};

// Abaixo disso o item aparece como "estoque baixo"
pub const LOW_STOCK_THRESHOLD: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub account_id: Uuid,
    pub item: String,
    pub qty: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low(&self) -> bool {
        self.qty < Decimal::from(LOW_STOCK_THRESHOLD)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewInventoryItem {
    #[validate(custom(function = "not_blank", message = "O nome do item é obrigatório."))]
    pub item: String,
    #[validate(custom(function = "non_negative", message = "A quantidade não pode ser negativa."))]
    pub qty: Decimal,
}

// Edição de quantidade direto na lista
#[derive(Debug, Clone, Validate)]
pub struct QuantityChange {
    #[validate(custom(function = "non_negative", message = "A quantidade não pode ser negativa."))]
    pub qty: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryPatch {
    pub item: Option<String>,
    pub qty: Option<Decimal>,
}

impl InventoryPatch {
    pub fn qty(qty: Decimal) -> Self {
        Self {
            qty: Some(qty),
            ..Default::default()
        }
    }
}

impl Patchable<InventoryItem> for InventoryPatch {
    fn apply(&self, row: &mut InventoryItem) {
        if let Some(item) = &self.item {
            row.item = item.clone();
        }
        if let Some(qty) = self.qty {
            row.qty = qty;
        }
    }

    fn revert(&self, row: &mut InventoryItem, snapshot: &InventoryItem) {
        if self.item.is_some() {
            row.item = snapshot.item.clone();
        }
        if self.qty.is_some() {
            row.qty = snapshot.qty;
        }
    }
}

impl Record for InventoryItem {
    type New = NewInventoryItem;
    type Patch = InventoryPatch;

    const COLLECTION: Collection = Collection::Inventory;

    fn id(&self) -> Uuid {
        self.id
    }

    fn rows(data: &DashboardData) -> &Vec<Self> {
        &data.inventory
    }

    fn rows_mut(data: &mut DashboardData) -> &mut Vec<Self> {
        &mut data.inventory
    }
}
