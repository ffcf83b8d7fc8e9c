pub mod client;
pub mod error;
pub mod models;

pub use client::LadderClient;
pub use error::ApiError;
pub use models::{MatchResult, Player, PlayerId, ResultsCollection, Standings};
