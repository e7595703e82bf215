use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{Context, Pos2, Vec2};

use crate::config::Settings;
use crate::driver::DriverLink;
use crate::scan::OutboundEvent;

mod graph;
mod physics;
mod projector;
mod render_utils;
mod session;
mod ui;

pub(crate) use physics::LayoutConfig;
pub(crate) use session::SessionOptions;

use projector::SessionView;
use session::ScanSession;

/// Upper bound on driver events applied per frame so a burst cannot stall
/// the UI; the rest wait for the next frame.
const MAX_EVENTS_PER_FRAME: usize = 256;
const DRIVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct ScanTopologyApp {
    link: DriverLink,
    model: ViewModel,
}

struct ViewModel {
    session: ScanSession,
    target_input: String,
    ports_input: String,
    search: String,
    selected: Option<String>,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    show_quadtree_overlay: bool,
    dragging: Option<String>,
    notice: Option<String>,
    pending_requests: Vec<OutboundEvent>,
    projection_cache: Option<ProjectionCache>,
    search_match_cache: Option<SearchMatchCache>,
    view_scratch: ViewScratch,
}

struct ProjectionCache {
    revision: u64,
    view: Arc<SessionView>,
}

struct SearchMatchCache {
    query: String,
    revision: u64,
    matches: Arc<HashSet<usize>>,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    quadtree_cells: Vec<physics::QuadtreeCell>,
}

impl ScanTopologyApp {
    pub(crate) fn new(_cc: &eframe::CreationContext<'_>, settings: Settings, link: DriverLink) -> Self {
        Self {
            link,
            model: ViewModel::new(&settings),
        }
    }
}

impl eframe::App for ScanTopologyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let events = self.link.drain(MAX_EVENTS_PER_FRAME);
        let received = !events.is_empty();
        for event in events {
            self.model.session.handle(event);
        }

        self.model
            .show(ctx, self.link.description(), self.link.is_connected());

        for request in self.model.pending_requests.drain(..) {
            self.link.send(request);
        }

        if received {
            ctx.request_repaint();
        } else if self.link.is_connected() {
            ctx.request_repaint_after(DRIVER_POLL_INTERVAL);
        }
    }
}
