use eframe::egui::{self, Color32, RichText, Ui};

use crate::util::format_accuracy;

use super::super::ViewModel;
use super::super::projector::{
    Badge, HostView, PortCard, SessionView, UPSELL_NOTICE, VulnerabilityPanel,
};
use super::super::render_utils::{badge_color, node_tone_color};

fn badge(ui: &mut Ui, badge: &Badge) {
    let color = badge_color(badge.tone);
    egui::Frame::new()
        .fill(color.gamma_multiply(0.25))
        .stroke(egui::Stroke::new(1.0, color))
        .corner_radius(4.0)
        .inner_margin(egui::Margin::symmetric(6, 1))
        .show(ui, |ui| {
            ui.label(RichText::new(&badge.text).small().color(Color32::from_gray(235)));
        });
}

fn port_card(ui: &mut Ui, card: &PortCard) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new(&card.title).strong());
            badge(ui, &card.state_badge);
            if let Some(service) = &card.service_badge {
                badge(ui, service);
            }
        });

        match &card.vulnerability {
            Some(VulnerabilityPanel::Full {
                heading,
                description,
                recommendations,
            }) => {
                ui.add_space(4.0);
                ui.label(RichText::new(heading).strong().color(Color32::from_rgb(240, 96, 96)));
                ui.label(description);
                if !recommendations.is_empty() {
                    ui.label(RichText::new("Recommendations").strong());
                    for recommendation in recommendations {
                        ui.label(format!("- {recommendation}"));
                    }
                }
            }
            Some(VulnerabilityPanel::Teaser { heading, notice }) => {
                ui.add_space(4.0);
                ui.label(RichText::new(heading).strong().color(Color32::from_rgb(240, 96, 96)));
                ui.label(notice);
            }
            None => {}
        }

        if card.upsell {
            ui.add_space(2.0);
            ui.label(
                RichText::new(UPSELL_NOTICE)
                    .small()
                    .italics()
                    .color(Color32::from_rgb(246, 194, 80)),
            );
        }
    });
}

fn host_summary(ui: &mut Ui, host: &HostView) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("●").color(node_tone_color(host.tone)));
        ui.label(RichText::new(&host.label).strong());
    });
    ui.label(format!("Status: {}", host.status.label()));
    match &host.os_label {
        Some(os) => ui.label(format!("OS: {os}")),
        None => ui.label("OS: unknown"),
    };
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, view: &SessionView) {
        ui.heading("Host Details");
        ui.add_space(6.0);

        let selected = self.selected.as_deref().and_then(|id| view.host(id));
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match selected {
                Some(host) => {
                    host_summary(ui, host);
                    let alternatives = self
                        .session
                        .graph()
                        .get(&host.id)
                        .map(|node| node.os_guesses.iter().skip(1).collect::<Vec<_>>())
                        .unwrap_or_default();
                    if !alternatives.is_empty() {
                        egui::CollapsingHeader::new("Other OS guesses")
                            .default_open(false)
                            .show(ui, |ui| {
                                for guess in alternatives {
                                    ui.label(format!(
                                        "{} ({})",
                                        guess.name,
                                        format_accuracy(guess.accuracy)
                                    ));
                                }
                            });
                    }
                    ui.separator();
                    if host.cards.is_empty() {
                        ui.label("No port results for this host yet.");
                    }
                    for card in &host.cards {
                        port_card(ui, card);
                    }
                    ui.add_space(6.0);
                    if ui.button("Clear selection").clicked() {
                        self.set_selected(None);
                    }
                }
                None if view.hosts.is_empty() => {
                    ui.label("Start a scan to discover hosts.");
                }
                None => {
                    ui.label("Select a host in the graph to focus on it.");
                    ui.separator();
                    for host in &view.hosts {
                        egui::CollapsingHeader::new(&host.label)
                            .id_salt(("host_details", host.id.as_str()))
                            .default_open(false)
                            .show(ui, |ui| {
                                host_summary(ui, host);
                                for card in &host.cards {
                                    port_card(ui, card);
                                }
                            });
                    }
                }
            });
    }
}
