use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};

use crate::models::{Product, SaveProduct};

/// Sea-ORM entity for the `products` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub product_code: String,
    pub name: String,
    pub category: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub quantity: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub const TAG: &'static str = "Products";
}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            product_code: model.product_code,
            name: model.name,
            category: model.category,
            price: model.price,
            quantity: model.quantity,
            description: model.description,
            image_path: model.image_path,
            created_at: model.created_at.into(),
        }
    }
}

// New row; the id comes from the sequence
impl From<SaveProduct> for ActiveModel {
    fn from(input: SaveProduct) -> Self {
        ActiveModel {
            id: NotSet,
            product_code: Set(input.product_code),
            name: Set(input.name),
            category: Set(input.category),
            price: Set(input.price),
            quantity: Set(input.quantity),
            description: Set(input.description),
            image_path: Set(input.image_path),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}

impl ActiveModel {
    /// Overwrite the editable columns, leaving `id` and `created_at` alone.
    pub fn apply(&mut self, input: SaveProduct) {
        self.product_code = Set(input.product_code);
        self.name = Set(input.name);
        self.category = Set(input.category);
        self.price = Set(input.price);
        self.quantity = Set(input.quantity);
        self.description = Set(input.description);
        self.image_path = Set(input.image_path);
    }
}
