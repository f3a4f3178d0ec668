//! Showing catalog: creation and read path for seat maps

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, DomainResult, NewShowing, Showing, ShowingId, UnitOfWork};

pub struct ShowingCatalog {
    uow: Arc<dyn UnitOfWork>,
}

impl ShowingCatalog {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Create a showing with every seat of its layout available.
    pub async fn create_showing(&self, new: NewShowing) -> DomainResult<Showing> {
        validate_layout(&new)?;
        let showing = new.into_showing();

        let unit = self.uow.begin().await?;
        unit.inventory().insert_showing(&showing).await?;
        unit.commit().await?;

        info!(
            showing_id = %showing.id,
            movie_id = %showing.movie_id,
            seats = showing.seats.len(),
            "🎬 Showing created"
        );
        Ok(showing)
    }

    pub async fn list_showings(&self) -> DomainResult<Vec<Showing>> {
        let unit = self.uow.begin().await?;
        let showings = unit.inventory().list_showings().await;
        unit.abort().await?;
        showings
    }

    /// Current seat map of one showing.
    pub async fn seat_map(&self, showing_id: &ShowingId) -> DomainResult<Showing> {
        let unit = self.uow.begin().await?;
        let showing = unit.inventory().find_showing(showing_id).await;
        unit.abort().await?;
        showing?.ok_or_else(|| DomainError::not_found("Showing", "id", showing_id))
    }
}

fn validate_layout(new: &NewShowing) -> DomainResult<()> {
    let layout = &new.layout;
    if layout.columns == 0 || layout.categories.is_empty() {
        return Err(DomainError::Validation(
            "Seat layout must have at least one row and one column".to_string(),
        ));
    }
    let mut rows = HashSet::new();
    for category in &layout.categories {
        if category.price < 0 {
            return Err(DomainError::Validation(format!(
                "Category {} has a negative price",
                category.name
            )));
        }
        if category.rows.is_empty() {
            return Err(DomainError::Validation(format!(
                "Category {} has no rows",
                category.name
            )));
        }
        for row in &category.rows {
            if !rows.insert(row.as_str()) {
                return Err(DomainError::Validation(format!(
                    "Row {} appears in more than one category",
                    row
                )));
            }
        }
    }
    Ok(())
}
