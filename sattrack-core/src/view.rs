//! Views and the module layout grid.
//!
//! A module arranges its views on a grid described by an ordered list of
//! compact tokens, `kind:left:right:top:bottom` (for example `map:0:2:0:1`).
//! The module owns the view objects; the tick path only calls
//! [`View::render`], fire-and-forget, in registration order.

use std::collections::HashMap;
use std::fmt;

use crate::config::ConfigError;
use crate::sat::{CatNum, SatelliteRecord};

/// The view types a module can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Tabular list of all tracked satellites.
    List,
    /// Ground-track map.
    Map,
    /// Polar az/el plot.
    Polar,
    /// Single-satellite detail display.
    Single,
}

impl ViewKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "list" => Some(Self::List),
            "map" => Some(Self::Map),
            "polar" => Some(Self::Polar),
            "single" => Some(Self::Single),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Map => "map",
            Self::Polar => "polar",
            Self::Single => "single",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the layout grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCell {
    pub kind: ViewKind,
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl LayoutCell {
    /// Parse a `kind:left:right:top:bottom` token.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            key: "layout",
            reason,
        };

        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 5 {
            return Err(invalid(format!(
                "`{token}`: expected kind:left:right:top:bottom"
            )));
        }
        let kind = ViewKind::parse(parts[0])
            .ok_or_else(|| invalid(format!("`{token}`: unknown view kind `{}`", parts[0])))?;

        let mut edges = [0u32; 4];
        for (slot, part) in edges.iter_mut().zip(&parts[1..]) {
            *slot = part
                .parse()
                .map_err(|_| invalid(format!("`{token}`: `{part}` is not a grid index")))?;
        }
        let [left, right, top, bottom] = edges;
        if left >= right || top >= bottom {
            return Err(invalid(format!("`{token}`: empty grid rectangle")));
        }

        Ok(Self {
            kind,
            left,
            right,
            top,
            bottom,
        })
    }
}

impl fmt::Display for LayoutCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.kind, self.left, self.right, self.top, self.bottom
        )
    }
}

/// A rendering surface notified once per tick.
///
/// Calls are fire-and-forget: no return value is consulted and no
/// backpressure exists. Implementations must tolerate satellites without a
/// computed position yet.
pub trait View: Send + Sync {
    fn kind(&self) -> ViewKind;

    /// Render the satellite set at the given simulated day number.
    fn render(&self, daynum: f64, satellites: &HashMap<CatNum, SatelliteRecord>);
}

/// Builds the view for one layout cell; supplied by the embedder.
pub type ViewFactory = dyn Fn(&LayoutCell) -> Box<dyn View> + Send + Sync;
