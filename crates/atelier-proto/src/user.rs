//! User presence types.
//!
//! A [`User`] is ephemeral: it is recreated at the start of every session
//! and never persisted anywhere except the local username preference.

use serde::{Deserialize, Serialize};

/// Default display names assigned when no username preference exists.
pub const DEFAULT_USERNAMES: [&str; 8] = [
    "Schema Surfer",
    "Query Cowboy",
    "Data Diver",
    "Index Intruder",
    "Table Troublemaker",
    "Byte Bandit",
    "Row Wrangler",
    "Column Commander",
];

/// Default cursor colors, one picked at random per session.
pub const DEFAULT_COLORS: [&str; 8] = [
    "#e11d48", "#c026d3", "#7c3aed", "#2563eb", "#0891b2", "#059669", "#65a30d", "#d97706",
];

/// Pick a display name from the default pool.
pub fn username_from_seed(seed: u64) -> String {
    DEFAULT_USERNAMES[(seed % DEFAULT_USERNAMES.len() as u64) as usize].to_string()
}

/// Pick a cursor color from the default pool.
pub fn color_from_seed(seed: u64) -> String {
    DEFAULT_COLORS[(seed % DEFAULT_COLORS.len() as u64) as usize].to_string()
}

/// Cursor position in document coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// A session participant as seen by its peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    pub username: String,
    /// Cursor color (CSS hex string)
    pub color: String,
    /// Last reported cursor position
    pub cursor: Cursor,
}

impl User {
    /// Create a user with the given or a pool-picked name, a pool-picked
    /// color, and the cursor at the origin.
    ///
    /// The two seeds are drawn independently so the name does not determine
    /// the color.
    pub fn seeded(username: Option<String>, name_seed: u64, color_seed: u64) -> Self {
        Self {
            username: username.unwrap_or_else(|| username_from_seed(name_seed)),
            color: color_from_seed(color_seed),
            cursor: Cursor::default(),
        }
    }
}
