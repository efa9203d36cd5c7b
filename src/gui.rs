use crate::chat_api::ChatConfig;
use crate::markdown::{MarkdownRenderer, PulldownRenderer};
use crate::widget::{ChatWidget, Message, Role, WidgetSlots};
use crate::worker::{ThreadDispatcher, WorkerEvent};
use anyhow::{anyhow, Context, Result};
use eframe::egui::{self, Align, Align2, Button, Color32, Frame, Layout, RichText, ScrollArea};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;
use tracing::{error, info};

const PAGE_BG: Color32 = Color32::from_rgb(244, 246, 250);
const WINDOW_BG: Color32 = Color32::from_rgb(255, 255, 255);
const HEADER_BG: Color32 = Color32::from_rgb(31, 64, 128);
const HEADER_TEXT: Color32 = Color32::from_rgb(255, 255, 255);
const USER_BUBBLE: Color32 = Color32::from_rgb(222, 235, 255);
const BOT_BUBBLE: Color32 = Color32::from_rgb(240, 240, 240);
const COLLAPSED_SIZE: [f32; 2] = [360.0, 480.0];
const EXPANDED_SIZE: [f32; 2] = [560.0, 660.0];
const INPUT_ID: &str = "message_input";

#[derive(Clone, Debug)]
pub struct GuiOptions {
    pub greeting: String,
    pub raw_markdown: bool,
    pub transcript_path: Option<PathBuf>,
    pub slots: WidgetSlots,
}

enum WindowAction {
    Toggle,
    ToggleSize,
    QuickReply(usize),
    Submit,
    Enter { shift: bool },
    SaveTranscript,
}

pub fn run_gui(config: ChatConfig, options: GuiOptions) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 720.0])
            .with_min_inner_size([420.0, 560.0])
            .with_title("Chat"),
        ..Default::default()
    };

    eframe::run_native(
        "chatwidget",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(ChatWidgetApp::new(config, options)))
        }),
    )
    .map_err(|err| anyhow!("cannot start the chat window: {err}"))
}

fn configure_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.visuals = egui::Visuals::light();
    style.visuals.panel_fill = PAGE_BG;
    style.visuals.window_fill = WINDOW_BG;
    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style
        .text_styles
        .insert(egui::TextStyle::Body, egui::FontId::proportional(14.0));
    style
        .text_styles
        .insert(egui::TextStyle::Button, egui::FontId::proportional(14.0));
    ctx.set_style(style);
}

pub struct ChatWidgetApp {
    widget: ChatWidget<ThreadDispatcher>,
    worker_rx: Receiver<WorkerEvent>,
    transcript_path: Option<PathBuf>,
    status: String,
}

impl ChatWidgetApp {
    fn new(config: ChatConfig, options: GuiOptions) -> Self {
        info!(base_url = %config.base_url, "chat widget starting");
        let (dispatcher, worker_rx) = ThreadDispatcher::channel(config);
        let renderer: Option<Box<dyn MarkdownRenderer>> = if options.raw_markdown {
            None
        } else {
            Some(Box::new(PulldownRenderer))
        };
        let widget = ChatWidget::new(dispatcher, options.slots)
            .with_renderer(renderer)
            .with_greeting(options.greeting);

        Self {
            widget,
            worker_rx,
            transcript_path: options.transcript_path,
            status: String::new(),
        }
    }

    fn drain_worker_events(&mut self) {
        loop {
            match self.worker_rx.try_recv() {
                Ok(event) => self.widget.handle_event(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn save_transcript(&self) -> Result<PathBuf> {
        let path = self
            .transcript_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("chat-transcript.html"));
        fs::write(&path, self.widget.transcript_html())
            .with_context(|| format!("cannot write transcript to {}", path.display()))?;
        Ok(path)
    }

    fn apply(&mut self, action: WindowAction) {
        match action {
            WindowAction::Toggle => self.widget.toggle_chat_window(),
            WindowAction::ToggleSize => self.widget.toggle_size(),
            WindowAction::QuickReply(index) => {
                self.widget.activate_quick_reply(index);
            }
            WindowAction::Submit => {
                self.widget.submit_input();
            }
            WindowAction::Enter { shift } => {
                self.widget.handle_enter(shift);
            }
            WindowAction::SaveTranscript => {
                self.status = match self.save_transcript() {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(err) => {
                        error!(error = %err, "transcript export failed");
                        format!("{err:#}")
                    }
                };
            }
        }
    }

    fn window_contents(&mut self, ui: &mut egui::Ui, actions: &mut Vec<WindowAction>) {
        let slots = self.widget.slots();
        let affordances = self.widget.affordances();

        Frame::default()
            .fill(HEADER_BG)
            .inner_margin(egui::Margin::symmetric(8, 6))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Chat").strong().color(HEADER_TEXT));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if slots.close && ui.small_button("✕").clicked() {
                            actions.push(WindowAction::Toggle);
                        }
                        if slots.minimize
                            && affordances.minimize_visible
                            && ui.small_button("🗕").on_hover_text("Minimize").clicked()
                        {
                            actions.push(WindowAction::ToggleSize);
                        }
                        if slots.expand
                            && affordances.expand_visible
                            && ui.small_button("🗖").on_hover_text("Expand").clicked()
                        {
                            actions.push(WindowAction::ToggleSize);
                        }
                    });
                });
            });

        let footer_height = 150.0;
        let scroll_to_bottom = self.widget.take_scroll_request();
        ScrollArea::vertical()
            .id_salt("chat_messages")
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .max_height((ui.available_height() - footer_height).max(120.0))
            .show(ui, |ui| {
                if slots.messages {
                    for message in self.widget.messages() {
                        render_message(ui, message);
                        ui.add_space(4.0);
                    }
                }
                if self.widget.typing_visible() {
                    ui.label(RichText::new("Typing…").italics().weak());
                }
                if scroll_to_bottom {
                    ui.scroll_to_cursor(Some(Align::BOTTOM));
                }
            });

        if slots.quick_replies && self.widget.quick_replies_visible() {
            ui.horizontal_wrapped(|ui| {
                for (index, reply) in self.widget.quick_replies().iter().enumerate() {
                    if ui.button(reply.label.as_str()).clicked() {
                        actions.push(WindowAction::QuickReply(index));
                    }
                }
            });
        }

        ui.separator();

        if slots.input {
            let input_id = egui::Id::new(INPUT_ID);
            let has_focus = ui.ctx().memory(|mem| mem.has_focus(input_id));
            // Plain Enter is taken before the text field sees it; Shift+Enter
            // is left in the queue so the field inserts a newline.
            // `consume_key` ignores shift, hence the explicit check.
            let enter_shift = ui.input_mut(|i| {
                if !has_focus || !i.key_pressed(egui::Key::Enter) {
                    return None;
                }
                let shift = i.modifiers.shift;
                if !shift {
                    i.consume_key(egui::Modifiers::NONE, egui::Key::Enter);
                }
                Some(shift)
            });
            if let Some(shift) = enter_shift {
                actions.push(WindowAction::Enter { shift });
            }

            ui.horizontal(|ui| {
                let send_width = 72.0;
                let response = ui.add_sized(
                    [(ui.available_width() - send_width - 8.0).max(120.0), 48.0],
                    egui::TextEdit::multiline(&mut self.widget.input)
                        .id(input_id)
                        .desired_rows(2)
                        .hint_text("Type your message…"),
                );
                if self.widget.take_focus_request() {
                    response.request_focus();
                }

                if slots.form
                    && ui
                        .add(Button::new("Send").min_size(egui::vec2(send_width, 48.0)))
                        .clicked()
                {
                    actions.push(WindowAction::Submit);
                }
            });
        }

        ui.horizontal(|ui| {
            if ui.small_button("Save transcript").clicked() {
                actions.push(WindowAction::SaveTranscript);
            }
            if !self.status.is_empty() {
                ui.label(RichText::new(self.status.as_str()).small());
            }
        });
    }
}

fn render_message(ui: &mut egui::Ui, message: &Message) -> egui::Rect {
    let (fill, row_layout) = match message.role {
        Role::User => (USER_BUBBLE, Layout::right_to_left(Align::TOP)),
        Role::Bot => (BOT_BUBBLE, Layout::left_to_right(Align::TOP)),
    };
    let max_bubble_width = (ui.available_width() * 0.82).clamp(160.0, 640.0);

    let mut bubble_rect = egui::Rect::NOTHING;
    ui.horizontal(|ui| {
        ui.set_width(ui.available_width());
        ui.with_layout(row_layout, |ui| {
            bubble_rect = ui
                .scope(|ui| {
                    ui.set_max_width(max_bubble_width);
                    Frame::default()
                        .fill(fill)
                        .inner_margin(egui::Margin::same(8))
                        .show(ui, |ui| {
                            ui.add(egui::Label::new(message.display_text()).wrap());
                        })
                        .response
                        .rect
                })
                .inner;
        });
    });

    bubble_rect
}

impl eframe::App for ChatWidgetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker_events();
        let slots = self.widget.slots();
        let mut actions = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Welcome");
            ui.label("Open the chat from the button in the corner.");
        });

        if slots.launcher {
            egui::Area::new(egui::Id::new("chat_launcher"))
                .anchor(Align2::RIGHT_BOTTOM, [-16.0, -16.0])
                .show(ctx, |ui| {
                    let label = if self.widget.is_open() { "✕" } else { "💬 Chat" };
                    if ui
                        .add(Button::new(label).min_size(egui::vec2(48.0, 36.0)))
                        .clicked()
                    {
                        actions.push(WindowAction::Toggle);
                    }
                });
        }

        if self.widget.is_open() {
            let size = if self.widget.state().is_expanded {
                EXPANDED_SIZE
            } else {
                COLLAPSED_SIZE
            };
            egui::Window::new("Chat")
                .id(egui::Id::new("chat_window"))
                .title_bar(false)
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::RIGHT_BOTTOM, [-16.0, -64.0])
                .fixed_size(size)
                .show(ctx, |ui| self.window_contents(ui, &mut actions));
        }

        for action in actions {
            self.apply(action);
        }

        ctx.request_repaint_after(Duration::from_millis(16));
    }
}
