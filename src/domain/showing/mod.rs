//! Showing aggregate
//!
//! Seat map, tagged seat states, guarded transitions and the inventory
//! interface.

pub mod inventory;
pub mod model;

pub use inventory::ShowingInventory;
pub use model::{
    NewShowing, Seat, SeatCategory, SeatLayout, SeatState, SeatStatus, SeatTransition, Showing,
    TransitionOutcome,
};
