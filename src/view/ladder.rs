use std::fmt;

use crate::api::{Player, Standings};

/// Go rank notation: negative ranks are kyu, the rest dan.
pub fn format_rank(rank: f64) -> String {
    // -0.0 would otherwise print as "-0D"
    let rank = if rank == 0.0 { 0.0 } else { rank };
    let (value, suffix) = if rank < 0.0 { (-rank, 'K') } else { (rank, 'D') };
    if value.fract() == 0.0 {
        format!("{:.0}{}", value, suffix)
    } else {
        format!("{}{}", value, suffix)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            Some(rank) => write!(f, "{} {}", self.name, format_rank(rank)),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Standings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ladder standings:")?;
        for (position, player) in self.standings.iter().enumerate() {
            write!(f, "\n    {}. {}", position + 1, player)?;
        }
        Ok(())
    }
}

pub fn render_players(players: &[Player]) -> String {
    let mut out = String::from("Players\n");
    for player in players {
        out.push_str("  ");
        out.push_str(&player.to_string());
        out.push('\n');
    }
    out
}
