//! Showing DTOs

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Seat, SeatCategory, SeatLayout, SeatStatus, Showing};

/// Showing without its seats
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShowingDto {
    pub id: String,
    pub movie_id: String,
    pub theatre_id: String,
    pub screen_number: u32,
    pub show_date: NaiveDate,
    /// Local start time, `HH:MM`
    pub show_time: String,
    pub total_seats: usize,
    pub available_seats: usize,
}

impl From<&Showing> for ShowingDto {
    fn from(s: &Showing) -> Self {
        Self {
            id: s.id.to_string(),
            movie_id: s.movie_id.clone(),
            theatre_id: s.theatre_id.clone(),
            screen_number: s.screen_number,
            show_date: s.show_date,
            show_time: s.show_time.format("%H:%M").to_string(),
            total_seats: s.seats.len(),
            available_seats: s.count_with_status(SeatStatus::Available),
        }
    }
}

/// One seat as shown to clients. Holder identity is not exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeatDto {
    pub seat_id: String,
    pub row: String,
    pub column: u32,
    pub category: String,
    pub price: i64,
    /// `available`, `locked` or `booked`
    pub status: String,
}

impl From<&Seat> for SeatDto {
    fn from(s: &Seat) -> Self {
        Self {
            seat_id: s.seat_id.to_string(),
            row: s.row.clone(),
            column: s.column,
            category: s.category.clone(),
            price: s.price,
            status: s.status().as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeatMapDto {
    pub showing: ShowingDto,
    pub seats: Vec<SeatDto>,
}

impl From<&Showing> for SeatMapDto {
    fn from(s: &Showing) -> Self {
        Self {
            showing: ShowingDto::from(s),
            seats: s.seats.iter().map(SeatDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SeatCategoryDto {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(length(min = 1))]
    pub rows: Vec<String>,
}

/// Request to schedule a showing
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateShowingRequest {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1))]
    pub movie_id: String,
    #[validate(length(min = 1))]
    pub theatre_id: String,
    #[serde(default = "default_screen")]
    #[validate(range(min = 1))]
    pub screen_number: u32,
    pub show_date: NaiveDate,
    /// `HH:MM`
    pub show_time: String,
    /// Seats per row; defaults to the standard layout when `categories` is empty
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    #[validate(nested)]
    pub categories: Vec<SeatCategoryDto>,
}

fn default_screen() -> u32 {
    1
}

impl CreateShowingRequest {
    pub fn parse_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.show_time, "%H:%M").ok()
    }

    pub fn layout(&self) -> SeatLayout {
        if self.categories.is_empty() {
            return SeatLayout::standard();
        }
        SeatLayout {
            columns: self.columns.unwrap_or(SeatLayout::standard().columns),
            categories: self
                .categories
                .iter()
                .map(|c| SeatCategory {
                    name: c.name.clone(),
                    price: c.price,
                    rows: c.rows.clone(),
                })
                .collect(),
        }
    }
}
