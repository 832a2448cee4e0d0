//! Tracing-backed views.
//!
//! The daemon has no widgets; each view kind renders a tick as structured
//! log events instead. Output volume differs per kind the way the GUI
//! counterparts differ: the list view emits one row per satellite, the map
//! and polar views a coverage summary, the single view one detailed line.

use std::sync::Arc;

use sattrack_core::sat::SatMap;
use sattrack_core::time::daynum_to_datetime;
use sattrack_core::view::{LayoutCell, View, ViewFactory, ViewKind};

pub struct TraceView {
    kind: ViewKind,
}

impl TraceView {
    pub fn new(kind: ViewKind) -> Self {
        Self { kind }
    }
}

fn format_daynum(daynum: f64) -> String {
    match daynum_to_datetime(daynum) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("daynum {daynum:.6}"),
    }
}

impl View for TraceView {
    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn render(&self, daynum: f64, satellites: &SatMap) {
        let when = format_daynum(daynum);
        match self.kind {
            ViewKind::List => {
                let mut records: Vec<_> = satellites.values().collect();
                records.sort_by_key(|r| r.catnum);
                for record in records {
                    match record.position {
                        Some(pos) => tracing::info!(
                            "[list] {} ({:5}) lat {:+7.2} lon {:+8.2} alt {:8.1} km",
                            record.name,
                            record.catnum,
                            pos.lat_deg,
                            pos.lon_deg,
                            pos.alt_km
                        ),
                        None => tracing::info!(
                            "[list] {} ({:5}) no position at {}",
                            record.name,
                            record.catnum,
                            when
                        ),
                    }
                }
            }
            ViewKind::Map | ViewKind::Polar => {
                let plotted = satellites.values().filter(|r| r.position.is_some()).count();
                tracing::info!(
                    "[{}] {} of {} satellites plotted at {}",
                    self.kind,
                    plotted,
                    satellites.len(),
                    when
                );
            }
            ViewKind::Single => {
                let focus = satellites.values().min_by_key(|r| r.catnum);
                match focus {
                    Some(record) => tracing::info!(
                        "[single] {} ({}) at {}: {:?}",
                        record.name,
                        record.catnum,
                        when,
                        record.position
                    ),
                    None => tracing::debug!("[single] no satellites at {}", when),
                }
            }
        }
    }
}

/// Factory handed to modules: every layout cell becomes a [`TraceView`].
pub fn view_factory() -> Arc<ViewFactory> {
    Arc::new(|cell: &LayoutCell| Box::new(TraceView::new(cell.kind)) as Box<dyn View>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_preserves_view_kind() {
        let factory = view_factory();
        let cell = LayoutCell::parse("polar:0:1:0:1").unwrap();
        assert_eq!(factory(&cell).kind(), ViewKind::Polar);
    }
}
