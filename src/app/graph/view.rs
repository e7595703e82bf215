use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, Vec2, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::super::physics::LayoutEngine;
use super::super::projector::SessionView;
use super::super::render_utils::{blend_color, draw_background, node_tone_color, world_to_screen};
use super::super::{SearchMatchCache, ViewModel};

const NODE_RADIUS: f32 = 20.0;
const LABEL_OFFSET: f32 = 25.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn project_positions(
    view: &SessionView,
    layout: &LayoutEngine,
    rect: egui::Rect,
    pan: Vec2,
    zoom: f32,
    out: &mut Vec<Pos2>,
) {
    out.clear();
    out.extend(view.hosts.iter().map(|host| {
        let world = layout.position(&host.id).unwrap_or(Vec2::ZERO);
        world_to_screen(rect, pan, zoom, world)
    }));
}

impl ViewModel {
    fn cached_search_matches(&mut self, view: &SessionView) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let revision = self.session.revision();
        if let Some(cached) = &self.search_match_cache
            && cached.revision == revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = view
            .hosts
            .iter()
            .enumerate()
            .filter(|(_, host)| {
                fuzzy_match_score(&matcher, &host.label, query).is_some()
                    || host
                        .os_label
                        .as_deref()
                        .is_some_and(|os| fuzzy_match_score(&matcher, os, query).is_some())
            })
            .map(|(index, _)| index)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui, view: &SessionView) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);
        self.handle_graph_zoom(ui, rect, &response);

        let radius = (NODE_RADIUS * self.zoom.powf(0.40)).clamp(6.0, 40.0);
        project_positions(
            view,
            self.session.layout(),
            rect,
            self.pan,
            self.zoom,
            &mut self.view_scratch.screen_positions,
        );
        let hovered = Self::hovered_index(ui, rect, &self.view_scratch.screen_positions, radius);
        let hovered_id = hovered
            .and_then(|index| view.hosts.get(index))
            .map(|host| host.id.clone());

        let holding = self.handle_node_drag(rect, &response, hovered_id.as_deref());
        self.handle_graph_pan(&response);

        let mut moving = false;
        if self.live_physics {
            moving = self.session.layout_mut().step();
        }
        if moving || holding || response.dragged() {
            ui.ctx().request_repaint();
        }

        project_positions(
            view,
            self.session.layout(),
            rect,
            self.pan,
            self.zoom,
            &mut self.view_scratch.screen_positions,
        );

        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter, rect);
        }

        let search_matches = self.cached_search_matches(view);
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let positions = &self.view_scratch.screen_positions;

        let link_width = (1.6 * self.zoom.sqrt()).clamp(0.8, 3.4);
        for &(from, to) in &view.links {
            let (Some(&start), Some(&end)) = (positions.get(from), positions.get(to)) else {
                continue;
            };
            painter.line_segment(
                [start, end],
                Stroke::new(link_width, Color32::from_rgba_unmultiplied(153, 153, 153, 150)),
            );
        }

        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;
        for (index, host) in view.hosts.iter().enumerate() {
            let Some(&position) = positions.get(index) else {
                continue;
            };

            let is_selected = self.selected.as_deref() == Some(host.id.as_str());
            let is_hovered = hovered == Some(index);
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let base_color = node_tone_color(host.tone);
            let color = if is_hovered {
                blend_color(base_color, Color32::WHITE, 0.25)
            } else if search_active && !is_match {
                blend_color(base_color, Color32::from_rgb(19, 23, 29), 0.55)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("host-selection", host.id.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            painter.circle_filled(position, radius, color);
            if selection_mix > 0.0 {
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(1.0 + selection_mix * 1.4, selected_color),
                );
            }
            if is_match {
                painter.circle_stroke(
                    position,
                    radius + 2.0,
                    Stroke::new(1.6, Color32::from_rgb(103, 196, 255)),
                );
            }
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190)),
            );

            let label_offset = LABEL_OFFSET * self.zoom.powf(0.40);
            painter.text(
                position + vec2(label_offset, 0.0),
                Align2::LEFT_CENTER,
                &host.label,
                FontId::proportional(12.0),
                Color32::from_gray(238),
            );
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if let Some(host) = hovered.and_then(|index| view.hosts.get(index)) {
            let open_ports = host
                .cards
                .iter()
                .filter(|card| card.service_badge.is_some())
                .count();
            let mut text = format!(
                "{}  |  {}  |  open ports {}",
                host.label,
                host.status.label(),
                open_ports
            );
            if let Some(os) = &host.os_label {
                text.push_str(&format!("  |  {os}"));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            self.set_selected(hovered_id);
        }
    }

    fn draw_quadtree_overlay(&mut self, painter: &egui::Painter, rect: egui::Rect) {
        let cells = &mut self.view_scratch.quadtree_cells;
        self.session.layout_mut().quadtree_cells(cells);
        for cell in cells.iter() {
            let min = cell.center - vec2(cell.half_extent, cell.half_extent);
            let max = cell.center + vec2(cell.half_extent, cell.half_extent);
            let top_left = world_to_screen(rect, self.pan, self.zoom, vec2(min.x, min.y));
            let top_right = world_to_screen(rect, self.pan, self.zoom, vec2(max.x, min.y));
            let bottom_right = world_to_screen(rect, self.pan, self.zoom, vec2(max.x, max.y));
            let bottom_left = world_to_screen(rect, self.pan, self.zoom, vec2(min.x, max.y));

            let alpha = if cell.is_leaf { 110 } else { 55 };
            let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
            let stroke = Stroke::new(
                line_width,
                Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
            );

            painter.line_segment([top_left, top_right], stroke);
            painter.line_segment([top_right, bottom_right], stroke);
            painter.line_segment([bottom_right, bottom_left], stroke);
            painter.line_segment([bottom_left, top_left], stroke);
        }
    }
}
