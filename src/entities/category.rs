//! Category entity - groups expenses and aggregates their spend.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dashboard this category belongs to
    pub dashboard_id: String,
    /// Display name
    pub name: String,
    /// Aggregate spend recorded against the category this period
    pub spent: f64,
}

/// Categories have no relations the engine navigates
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
