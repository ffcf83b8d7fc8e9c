pub mod ladder;
pub mod list;
pub mod results;
pub mod source;

pub use ladder::render_players;
pub use results::{LoadStatus, ResultsView};
