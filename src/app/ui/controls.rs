use eframe::egui::{self, Key, RichText, Ui, Vec2};

use crate::scan::{AccessTier, TierPolicy};

use super::super::ViewModel;
use super::super::projector::SessionView;
use super::super::render_utils::node_tone_color;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, view: &SessionView) {
        ui.heading("Scan");
        ui.separator();
        ui.add_space(4.0);

        let editable = view.controls.can_start;
        ui.label("Target")
            .on_hover_text("Host, address or CIDR range handed to the scan driver.");
        let target_response =
            ui.add_enabled(editable, egui::TextEdit::singleline(&mut self.target_input));
        ui.label("Ports")
            .on_hover_text("Port specification such as 22,80,443 or 1-1000.");
        let ports_response =
            ui.add_enabled(editable, egui::TextEdit::singleline(&mut self.ports_input));

        let submitted = (target_response.lost_focus() || ports_response.lost_focus())
            && ui.input(|input| input.key_pressed(Key::Enter));

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let start = ui
                .add_enabled(view.controls.can_start, egui::Button::new("Start scan"))
                .on_hover_text("Clear the current results and ask the driver for a new scan.");
            if start.clicked() || (submitted && view.controls.can_start) {
                self.request_start();
            }

            let stop = ui
                .add_enabled(view.controls.can_stop, egui::Button::new("Stop scan"))
                .on_hover_text("Ask the driver to stop; results gathered so far are kept.");
            if stop.clicked() {
                self.request_stop();
            }
        });

        if let Some(notice) = &self.notice {
            ui.colored_label(egui::Color32::from_rgb(240, 96, 96), notice);
        }

        ui.separator();

        let mut full_detail = matches!(
            self.session.tier_policy(),
            TierPolicy::Fixed(AccessTier::Full)
        );
        if ui
            .checkbox(&mut full_detail, "Pro detail")
            .on_hover_text(
                "Show full vulnerability analysis regardless of what the driver reported.",
            )
            .changed()
        {
            self.session.set_tier_policy(if full_detail {
                TierPolicy::Fixed(AccessTier::Full)
            } else {
                TierPolicy::FromDriver
            });
        }

        ui.separator();

        ui.label("Search hosts")
            .on_hover_text("Fuzzy-highlight hosts by address or operating system.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Type to highlight matching hosts, then click one to select it.");

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Continuously simulate layout forces while viewing the graph.");
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the Barnes-Hut cells used for repulsion.");

        let layout = self.session.layout();
        let pinned = layout.nodes().iter().filter(|node| node.pin.is_some()).count();
        ui.small(format!(
            "alpha {:.3}  |  {} nodes  |  {} springs  |  {} pinned",
            layout.alpha(),
            layout.len(),
            layout.edges().len(),
            pinned
        ));

        ui.horizontal(|ui| {
            if ui
                .button("Reheat layout")
                .on_hover_text("Give the layout energy to untangle again.")
                .clicked()
            {
                self.session.layout_mut().reheat();
            }
            if ui.button("Reset view").clicked() {
                self.pan = Vec2::ZERO;
                self.zoom = 1.0;
            }
        });

        ui.separator();

        egui::CollapsingHeader::new(format!("Hosts ({})", view.hosts.len()))
            .default_open(true)
            .show(ui, |ui| self.draw_host_list(ui, view));
    }

    fn draw_host_list(&mut self, ui: &mut Ui, view: &SessionView) {
        if view.hosts.is_empty() {
            ui.label("No hosts yet.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("host_list")
            .max_height(320.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, view.hosts.len(), |ui, row_range| {
                for host in &view.hosts[row_range] {
                    let is_selected = self.selected.as_deref() == Some(host.id.as_str());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("●").color(node_tone_color(host.tone)));
                        let text = format!("{}  ({} ports)", host.label, host.cards.len());
                        if ui.selectable_label(is_selected, text).clicked() {
                            clicked = Some(host.id.clone());
                        }
                    });
                }
            });

        if let Some(id) = clicked {
            let already_selected = self.selected.as_deref() == Some(id.as_str());
            self.set_selected((!already_selected).then_some(id));
        }
    }
}
