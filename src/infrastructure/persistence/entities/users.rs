//! SeaORM Entity for the users table
//! One row per platform identity; placeholder rows carry only the key

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub github_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub username: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub name: Option<String>,
    #[sea_orm(column_name = "type", column_type = "Text", nullable)]
    pub account_type: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub gender: Option<String>,
    pub has_pronouns: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub location: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub profile_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub company: Option<String>,
    pub following: Option<i32>,
    pub followers: Option<i32>,
    pub hireable: Option<bool>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub public_repos: Option<i32>,
    pub public_gists: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub twitter_username: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,
    pub private_sponsor_count: Option<i32>,
    pub min_sponsor_cost_cents: Option<i64>,
    pub is_enriched: bool,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub last_scraped: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub github_created_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
