mod admin;
mod notes;

use serde::Deserialize;

use crate::api::response::{ApiError, Pagination};

/// Shared pagination query parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl PaginationParams {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.limit == 0 {
            return Err(ApiError::bad_request("limit must be greater than 0"));
        }
        if self.limit > MAX_LIMIT {
            return Err(ApiError::bad_request(format!(
                "limit must not exceed {MAX_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Slice `items` to the requested page.
    pub fn page<T>(&self, items: Vec<T>) -> (Vec<T>, Pagination) {
        let total = items.len() as u64;
        let page = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        (
            page,
            Pagination {
                limit: self.limit,
                offset: self.offset,
                total,
            },
        )
    }
}

const MAX_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    20
}

pub use admin::{current_session, health, service_info};
pub use notes::{create_note, delete_note, get_note, list_notes, list_public_notes, update_note};
