use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::likes::{LikeError, LikeStore};

/// `{ "likes": n }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: u32,
}

/// GET /api/likes
pub async fn list_likes(
    State(store): State<Arc<LikeStore>>,
) -> Result<Json<BTreeMap<String, u32>>, LikeError> {
    Ok(Json(store.get_all().await?))
}

/// POST /api/likes/:image_id
pub async fn like_image(
    State(store): State<Arc<LikeStore>>,
    Path(image_id): Path<String>,
) -> Result<Json<LikesResponse>, LikeError> {
    let likes = store.increment(&image_id).await?;
    Ok(Json(LikesResponse { likes }))
}

/// DELETE /api/likes/:image_id
pub async fn unlike_image(
    State(store): State<Arc<LikeStore>>,
    Path(image_id): Path<String>,
) -> Result<Json<LikesResponse>, LikeError> {
    let likes = store.decrement(&image_id).await?;
    Ok(Json(LikesResponse { likes }))
}
