use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use bugzot_domain::Actor;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub mod attachments;
pub mod audit;
pub mod auth;
pub mod bugs;
pub mod comments;
pub mod health;
pub mod products;
pub mod users;

const DEFAULT_PAGE_SIZE: usize = 50;
