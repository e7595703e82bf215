use std::sync::Arc;

use eframe::egui::{self, Align, Context, Layout, RichText, Vec2};
use tracing::warn;

use crate::config::Settings;

use super::super::projector::SessionView;
use super::super::render_utils::banner_color;
use super::super::session::ScanSession;
use super::super::{ProjectionCache, ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn new(settings: &Settings) -> Self {
        Self {
            session: ScanSession::new(settings.session_options()),
            target_input: settings.target.clone(),
            ports_input: settings.ports.clone(),
            search: String::new(),
            selected: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            show_quadtree_overlay: false,
            dragging: None,
            notice: None,
            pending_requests: Vec::new(),
            projection_cache: None,
            search_match_cache: None,
            view_scratch: ViewScratch::default(),
        }
    }

    /// Projection of the current session, recomputed only when the session
    /// revision moved.
    pub(in crate::app) fn current_view(&mut self) -> Arc<SessionView> {
        let revision = self.session.revision();
        if let Some(cache) = &self.projection_cache
            && cache.revision == revision
        {
            return Arc::clone(&cache.view);
        }

        let view = Arc::new(self.session.project());
        self.projection_cache = Some(ProjectionCache {
            revision,
            view: Arc::clone(&view),
        });
        view
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context, link_description: &str, connected: bool) {
        let view = self.current_view();
        if let Some(selected) = &self.selected
            && view.host(selected).is_none()
        {
            self.selected = None;
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("scan-topology");
                    ui.separator();
                    ui.label(
                        RichText::new(&view.banner.text)
                            .color(banner_color(view.banner.tone))
                            .strong(),
                    );
                    if let Some(target) = self.session.target() {
                        ui.label(format!("target: {target}"));
                    }
                    ui.label(format!("hosts: {}", view.hosts.len()));
                    ui.label(format!("links: {}", view.links.len()));
                    let annotations = self.session.annotations();
                    if !annotations.is_empty() {
                        ui.label(format!("ports: {}", annotations.len()));
                    }
                    if view.orphan_annotations > 0 {
                        ui.label(format!("pending hosts: {}", view.orphan_annotations));
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let state = if connected { "connected" } else { "offline" };
                        ui.label(format!("driver: {link_description} ({state})"));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui, &view));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.draw_details(ui, &view));

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.graph().is_empty() {
                let scanning = self.session.phase().is_active();
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading(if scanning {
                        "Waiting for hosts..."
                    } else {
                        "No hosts discovered yet"
                    });
                    if scanning {
                        ui.add_space(8.0);
                        ui.spinner();
                    }
                });
            } else {
                self.draw_graph(ui, &view);
            }
        });
    }

    pub(in crate::app) fn request_start(&mut self) {
        match self
            .session
            .request_start(&self.target_input, &self.ports_input)
        {
            Ok(request) => {
                self.notice = None;
                self.selected = None;
                self.dragging = None;
                self.pan = Vec2::ZERO;
                self.pending_requests.push(request);
            }
            Err(error) => {
                warn!(%error, "start request rejected");
                self.notice = Some(error.to_string());
            }
        }
    }

    pub(in crate::app) fn request_stop(&mut self) {
        match self.session.request_stop() {
            Ok(request) => self.pending_requests.push(request),
            Err(error) => warn!(%error, "stop request rejected"),
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected != selected {
            self.selected = selected;
        }
    }
}
