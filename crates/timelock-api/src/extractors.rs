//! Custom Axum Extractors

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the escrow error body
pub struct EscrowJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for EscrowJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidRequestBody(e.body_text()))?;
        Ok(EscrowJson(value))
    }
}
