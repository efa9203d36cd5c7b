//! Toolkit-independent chat widget controller.
//!
//! [`ChatWidget`] owns every piece of widget state (open/expanded flags,
//! transcript, quick replies, typing indicator, input buffer) and talks to
//! the backend only through a [`Dispatch`] implementation. Replies come
//! back as [`WorkerEvent`]s and are applied in arrival order.

use crate::markdown::{escape_text, markup_to_text, render_markup, MarkdownRenderer, PulldownRenderer};
use crate::worker::{Dispatch, RequestId, WorkerEvent};
use tracing::{debug, error, info, warn};

pub const DEFAULT_GREETING: &str = "hello";
pub const APOLOGY_TEXT: &str = "Sorry, an error occurred. Please try again.";
pub const NETWORK_ERROR_TEXT: &str = "Network error. Please check your connection and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    fn css_class(self) -> &'static str {
        match self {
            Self::User => "message user",
            Self::Bot => "message bot",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub is_markup: bool,
    display: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, is_markup: bool) -> Self {
        let content = content.into();
        let display = if is_markup {
            markup_to_text(&content)
        } else {
            content.clone()
        };
        Self {
            role,
            content,
            is_markup,
            display,
        }
    }

    /// Text shown by widgets that cannot lay out HTML.
    pub fn display_text(&self) -> &str {
        &self.display
    }

    /// Markup goes in as-is, plain text is escaped.
    pub fn to_html(&self) -> String {
        let body = if self.is_markup {
            self.content.clone()
        } else {
            escape_text(&self.content)
        };
        format!(
            "<div class=\"{}\"><div class=\"bubble\">{body}</div></div>",
            self.role.css_class()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickReply {
    pub label: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WidgetState {
    pub is_open: bool,
    pub is_expanded: bool,
    pub has_opened_once: bool,
}

/// Visibility of the expand and minimize controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affordances {
    pub expand_visible: bool,
    pub minimize_visible: bool,
}

impl Default for Affordances {
    fn default() -> Self {
        Self {
            expand_visible: true,
            minimize_visible: false,
        }
    }
}

/// Which presentation slots exist. A missing slot silently disables the
/// feature bound to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetSlots {
    pub launcher: bool,
    pub window: bool,
    pub close: bool,
    pub expand: bool,
    pub minimize: bool,
    pub messages: bool,
    pub form: bool,
    pub input: bool,
    pub typing: bool,
    pub quick_replies: bool,
}

impl Default for WidgetSlots {
    fn default() -> Self {
        Self {
            launcher: true,
            window: true,
            close: true,
            expand: true,
            minimize: true,
            messages: true,
            form: true,
            input: true,
            typing: true,
            quick_replies: true,
        }
    }
}

impl WidgetSlots {
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("launcher", self.launcher),
            ("window", self.window),
            ("close", self.close),
            ("expand", self.expand),
            ("minimize", self.minimize),
            ("messages", self.messages),
            ("form", self.form),
            ("input", self.input),
            ("typing", self.typing),
            ("quick_replies", self.quick_replies),
        ]
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name)
        .collect()
    }
}

pub struct ChatWidget<D: Dispatch> {
    dispatcher: D,
    renderer: Option<Box<dyn MarkdownRenderer>>,
    slots: WidgetSlots,
    greeting: String,
    state: WidgetState,
    affordances: Affordances,
    messages: Vec<Message>,
    quick_replies: Vec<QuickReply>,
    typing_visible: bool,
    next_request_id: RequestId,
    scroll_requested: bool,
    focus_requested: bool,
    pub input: String,
}

impl<D: Dispatch> ChatWidget<D> {
    pub fn new(dispatcher: D, slots: WidgetSlots) -> Self {
        let missing = slots.missing();
        if !missing.is_empty() {
            info!(?missing, "chat widget slots absent, related features disabled");
        }

        Self {
            dispatcher,
            renderer: Some(Box::new(PulldownRenderer)),
            slots,
            greeting: DEFAULT_GREETING.to_string(),
            state: WidgetState::default(),
            affordances: Affordances::default(),
            messages: Vec::new(),
            quick_replies: Vec::new(),
            typing_visible: false,
            next_request_id: 1,
            scroll_requested: false,
            focus_requested: false,
            input: String::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Option<Box<dyn MarkdownRenderer>>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn aria_hidden(&self) -> bool {
        !self.state.is_open
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn slots(&self) -> WidgetSlots {
        self.slots
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn quick_replies(&self) -> &[QuickReply] {
        &self.quick_replies
    }

    pub fn quick_replies_visible(&self) -> bool {
        !self.quick_replies.is_empty()
    }

    pub fn typing_visible(&self) -> bool {
        self.typing_visible
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn toggle_chat_window(&mut self) {
        if !self.slots.window {
            return;
        }

        if self.state.is_open {
            self.state.is_open = false;
            if self.state.is_expanded {
                self.toggle_size();
            }
            debug!("chat window closed");
            return;
        }

        self.state.is_open = true;
        self.focus_requested = self.slots.input;
        debug!("chat window opened");

        if !self.state.has_opened_once {
            self.state.has_opened_once = true;
            let greeting = self.greeting.clone();
            self.send(&greeting, true);
            self.dispatcher.track_view();
        }
    }

    pub fn toggle_size(&mut self) {
        self.state.is_expanded = !self.state.is_expanded;
        self.affordances.expand_visible = !self.affordances.expand_visible;
        self.affordances.minimize_visible = !self.affordances.minimize_visible;
    }

    /// Returns the id of the dispatched request, or `None` for blank text.
    pub fn send(&mut self, text: &str, is_implicit: bool) -> Option<RequestId> {
        if text.trim().is_empty() {
            return None;
        }

        if !is_implicit {
            self.add_message(Role::User, text, false);
        }
        self.typing_visible = self.slots.typing;
        self.set_quick_replies(&[]);
        self.scroll_requested = true;

        let id = self.next_request_id;
        self.next_request_id += 1;
        debug!(id, implicit = is_implicit, "dispatching chat request");
        self.dispatcher.chat(id, text.to_string());
        Some(id)
    }

    pub fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Reply { id, outcome } => {
                self.typing_visible = false;
                match outcome {
                    Ok(reply) => {
                        debug!(id, buttons = reply.quick_replies().len(), "chat reply received");
                        let markup =
                            render_markup(self.renderer.as_deref(), reply.renderable_markdown());
                        self.add_message(Role::Bot, markup, true);
                        self.set_quick_replies(reply.quick_replies());
                    }
                    Err(err) if err.is_network() => {
                        error!(id, error = %err, "chat request failed");
                        self.add_message(Role::Bot, NETWORK_ERROR_TEXT, false);
                    }
                    Err(err) => {
                        warn!(id, error = %err, "chat endpoint returned an error");
                        self.add_message(Role::Bot, APOLOGY_TEXT, false);
                    }
                }
            }
        }
    }

    pub fn add_message(&mut self, role: Role, content: impl Into<String>, is_markup: bool) {
        if !self.slots.messages {
            return;
        }
        self.messages.push(Message::new(role, content, is_markup));
        self.scroll_requested = true;
    }

    pub fn set_quick_replies(&mut self, labels: &[String]) {
        self.quick_replies.clear();
        if !self.slots.quick_replies {
            return;
        }
        self.quick_replies.extend(labels.iter().map(|label| QuickReply {
            label: label.clone(),
        }));
    }

    pub fn activate_quick_reply(&mut self, index: usize) -> Option<RequestId> {
        let label = self.quick_replies.get(index)?.label.clone();
        self.send(&label, false)
    }

    /// Form submission: trims the input, clears it and sends.
    pub fn submit_input(&mut self) -> Option<RequestId> {
        if !self.slots.input {
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.input.clear();
        self.send(&text, false)
    }

    /// Enter submits; Shift+Enter is left to the text field as a newline.
    pub fn handle_enter(&mut self, shift: bool) -> Option<RequestId> {
        if shift {
            return None;
        }
        self.submit_input()
    }

    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    pub fn transcript_html(&self) -> String {
        let mut html = String::from("<div id=\"chat-messages\">\n");
        for message in &self.messages {
            html.push_str(&message.to_html());
            html.push('\n');
        }
        html.push_str("</div>\n");
        html
    }
}
