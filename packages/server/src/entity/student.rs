use common::Gender;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,
    pub gender: Gender,
    pub age: i32,

    pub class_id: String,
    #[sea_orm(belongs_to, from = "class_id", to = "id")]
    pub class: HasOne<super::class_info::Entity>,

    pub enrollment_date: Date,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub address: Option<String>,

    #[sea_orm(has_many)]
    pub scores: HasMany<super::score::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
