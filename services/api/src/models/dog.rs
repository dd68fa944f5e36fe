//! Dog model and related functionality

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Dog entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Dog {
    pub id: i64,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

/// New dog creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDog {
    pub name: String,
    pub birthday: Option<NaiveDate>,
}
