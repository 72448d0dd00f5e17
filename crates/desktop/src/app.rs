//! Mocha Desktop: egui app state and UI.
//!
//! All chat state lives in `lib::store::ChatState`; this module dispatches
//! actions into it, drives the fetches on worker threads, and renders. Each
//! in-flight call reports through an mpsc channel polled once per frame, and
//! send/history calls are tagged with the session id they were issued for.

use eframe::egui;
use lib::api::{BackendClient, ChatReply};
use lib::config::{self, Config};
use lib::models::{size_description, Model};
use lib::monitor::{ConnectionMonitor, Link, POLL_INTERVAL};
use lib::session::{session_label, Message, Session};
use lib::store::{ChatAction, ChatState, SendBlocked};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

const CHAT_INPUT_HEIGHT: f32 = 96.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;
const TITLE_BAR_HEIGHT: f32 = 32.0;

/// Ring buffer of log lines for the Logs screen.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{} [{}] {}", timestamp_label(), record.level(), record.args());
        push_log_line(line);
    }

    fn flush(&self) {}
}

/// Wall-clock HH:MM:SS.mmm label for log lines.
fn timestamp_label() -> String {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = t.as_secs();
    let millis = t.subsec_millis();
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, millis)
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Info,
    Logs,
}

/// One-way window-control signals from the title bar to the shell. Queued per
/// frame and applied as viewport commands; no acknowledgement flows back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum WindowCommand {
    Minimize,
    MaximizeToggle,
    Close,
}

/// Run one async API call to completion on a dedicated single-thread runtime.
/// Worker threads use this so the UI thread never blocks on the network.
fn block_on_api<T>(
    fut: impl std::future::Future<Output = Result<T, lib::api::ApiError>>,
) -> Result<T, String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;
    rt.block_on(fut).map_err(|e| e.to_string())
}

/// Serve the embedded UI bundle in the background for browser access.
/// Failures (e.g. the port is taken by another instance) are logged and the
/// app keeps running without it.
fn spawn_asset_server(config: Config) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("asset server runtime: {}", e);
                return;
            }
        };
        if let Err(e) = rt.block_on(lib::assets::run_asset_server(&config)) {
            log::error!("asset server: {}", e);
        }
    });
}

pub struct MochaApp {
    config: Config,
    config_path: PathBuf,
    client: BackendClient,
    state: ChatState,
    monitor: ConnectionMonitor,
    /// Current input text for the chat box.
    chat_input: String,
    /// Blocked-send or fetch notice, shown under the input.
    notice: Option<String>,
    /// Edge-triggered disconnect notice; cleared when the link recovers.
    link_notice: Option<String>,
    /// When Some, a connectivity probe is in flight (it doubles as the
    /// model-directory refresh).
    probe_receiver: Option<mpsc::Receiver<Result<Vec<Model>, String>>>,
    last_probe: Option<Instant>,
    /// When Some, a session-list fetch is in flight.
    sessions_receiver: Option<mpsc::Receiver<Result<Vec<Session>, String>>>,
    /// In-flight history fetch, tagged with the session it was issued for.
    history_inflight: Option<(Option<i64>, mpsc::Receiver<Result<Vec<Message>, String>>)>,
    /// In-flight send, tagged with the session it was issued for.
    send_inflight: Option<(Option<i64>, mpsc::Receiver<Result<ChatReply, String>>)>,
    /// Window-control signals queued this frame, drained after rendering.
    window_commands: Vec<WindowCommand>,
    /// Mirror of the shell's maximized flag for the maximize toggle.
    maximized: bool,
    sessions_collapsed: bool,
    models_collapsed: bool,
    dark_mode: bool,
    current_screen: Screen,
}

impl MochaApp {
    /// Space between a screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let (config, config_path) = config::load_config(None).unwrap_or_else(|e| {
            log::warn!("failed to load config, using defaults: {}", e);
            (Config::default(), PathBuf::new())
        });
        let client = BackendClient::new(Some(config::resolve_backend_base_url(&config)));
        spawn_asset_server(config.clone());

        let mut app = Self {
            config,
            config_path,
            client,
            state: ChatState::new(),
            monitor: ConnectionMonitor::new(),
            chat_input: String::new(),
            notice: None,
            link_notice: None,
            probe_receiver: None,
            last_probe: None,
            sessions_receiver: None,
            history_inflight: None,
            send_inflight: None,
            window_commands: Vec::new(),
            maximized: false,
            sessions_collapsed: false,
            models_collapsed: false,
            dark_mode: true,
            current_screen: Screen::default(),
        };
        // Preselect the configured default model; the first model refresh
        // clears it again if the backend does not list it.
        if let Some(model) = app.config.chat.default_model.clone() {
            app.state.apply(ChatAction::ModelSelected(model));
        }
        app.start_sessions_fetch();
        app.start_probe();
        app
    }

    /// Start a connectivity probe (model-list call) on a worker thread.
    fn start_probe(&mut self) {
        if self.probe_receiver.is_some() {
            return;
        }
        self.last_probe = Some(Instant::now());
        let client = self.client.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(block_on_api(async move { client.list_models().await }));
        });
        self.probe_receiver = Some(rx);
    }

    /// Start a probe when the interval has elapsed and none is in flight.
    fn maybe_start_probe(&mut self) {
        let due = self
            .last_probe
            .map(|t| t.elapsed() >= POLL_INTERVAL)
            .unwrap_or(true);
        if self.probe_receiver.is_none() && due {
            self.start_probe();
        }
    }

    /// Poll the probe result: fold into the monitor, refresh the model list.
    fn poll_probe(&mut self) {
        let Some(rx) = &self.probe_receiver else { return };
        match rx.try_recv() {
            Ok(result) => {
                self.probe_receiver = None;
                let ok = result.is_ok();
                match result {
                    Ok(models) => self.state.apply(ChatAction::ModelsLoaded(models)),
                    Err(e) => log::debug!("probe failed: {}", e),
                }
                if let Some(link) = self.monitor.observe(ok) {
                    self.state.apply(ChatAction::LinkChanged(link));
                    match link {
                        Link::Disconnected => {
                            log::warn!("backend became unreachable");
                            self.link_notice = Some(
                                "Lost connection to the backend. Sending is disabled until it returns."
                                    .to_string(),
                            );
                        }
                        Link::Connected => {
                            log::info!("backend connection restored");
                            self.link_notice = None;
                        }
                    }
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.probe_receiver = None;
            }
        }
    }

    fn start_sessions_fetch(&mut self) {
        if self.sessions_receiver.is_some() {
            return;
        }
        self.state.sessions_stale = false;
        let client = self.client.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(block_on_api(async move { client.chat_sessions().await }));
        });
        self.sessions_receiver = Some(rx);
    }

    fn poll_sessions(&mut self) {
        let Some(rx) = &self.sessions_receiver else { return };
        match rx.try_recv() {
            Ok(result) => {
                self.sessions_receiver = None;
                match result {
                    Ok(sessions) => {
                        let before = self.state.current_session;
                        self.state.apply(ChatAction::SessionsLoaded(sessions));
                        // The first load may adopt a session; fetch its history.
                        if self.state.current_session != before {
                            self.start_history_fetch();
                        }
                    }
                    Err(e) => log::warn!("session list fetch failed: {}", e),
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.sessions_receiver = None;
            }
        }
    }

    /// Fetch the full history of the current session. Replaces any in-flight
    /// fetch; the dropped receiver discards the older response.
    fn start_history_fetch(&mut self) {
        let Some(session) = self.state.current_session else {
            return;
        };
        let client = self.client.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(block_on_api(async move {
                client.chat_history(Some(session)).await
            }));
        });
        self.history_inflight = Some((Some(session), rx));
    }

    fn poll_history(&mut self) {
        let Some((session, rx)) = &self.history_inflight else {
            return;
        };
        let session = *session;
        match rx.try_recv() {
            Ok(result) => {
                self.history_inflight = None;
                match result {
                    Ok(messages) => {
                        self.state.apply(ChatAction::HistoryLoaded { session, messages })
                    }
                    Err(e) => {
                        log::warn!("history fetch failed: {}", e);
                        self.notice = Some(format!("failed to load history: {}", e));
                    }
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.history_inflight = None;
            }
        }
    }

    /// Switch to a session and re-fetch its history from the backend.
    fn select_session(&mut self, id: Option<i64>) {
        if self.state.current_session == id {
            return;
        }
        self.state.apply(ChatAction::SessionSelected(id));
        self.notice = None;
        self.start_history_fetch();
    }

    /// Validate and start a send. A blocked send reports its reason without
    /// touching the network.
    fn start_send(&mut self) {
        let content = self.chat_input.trim().to_string();
        match self.state.check_send(&content) {
            Ok(()) => {}
            Err(SendBlocked::Empty) => return,
            Err(reason) => {
                self.notice = Some(reason.to_string());
                return;
            }
        }
        self.notice = None;
        self.chat_input.clear();

        let session = self.state.current_session;
        let model = self.state.selected_model.clone().unwrap_or_default();
        self.state.apply(ChatAction::SendStarted {
            content: content.clone(),
        });

        let client = self.client.clone();
        let messages = vec![Message::user(content)];
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(block_on_api(async move {
                client.send_chat(&model, &messages, session).await
            }));
        });
        self.send_inflight = Some((session, rx));
    }

    fn poll_send(&mut self) {
        let Some((session, rx)) = &self.send_inflight else {
            return;
        };
        let session = *session;
        match rx.try_recv() {
            Ok(result) => {
                self.send_inflight = None;
                match result {
                    Ok(reply) => self.state.apply(ChatAction::SendSucceeded {
                        session,
                        reply: reply.message,
                        new_session: reply.session_id,
                    }),
                    Err(e) => {
                        log::warn!("send failed: {}", e);
                        self.state.apply(ChatAction::SendFailed { session, error: e });
                    }
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                // The worker died without reporting; the send is over either
                // way, so the loading gate must still release.
                self.send_inflight = None;
                self.state.apply(ChatAction::SendFailed {
                    session,
                    error: "send worker exited unexpectedly".to_string(),
                });
            }
        }
    }

    /// Translate queued window-control signals into viewport commands.
    fn apply_window_commands(&mut self, ctx: &egui::Context) {
        for cmd in self.window_commands.drain(..) {
            match cmd {
                WindowCommand::Minimize => {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true))
                }
                WindowCommand::MaximizeToggle => {
                    self.maximized = !self.maximized;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(self.maximized));
                }
                WindowCommand::Close => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            }
        }
    }

    /// One traffic-light button for the title bar.
    fn traffic_light(ui: &mut egui::Ui, color: egui::Color32, hover: &str) -> egui::Response {
        let (rect, response) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::click());
        let fill = if response.hovered() {
            color
        } else {
            color.linear_multiply(0.8)
        };
        ui.painter().circle_filled(rect.center(), 6.0, fill);
        response.on_hover_text(hover)
    }

    /// Custom window chrome: drag region, traffic lights, title, theme and
    /// sidebar toggles, connection indicator.
    fn ui_title_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("title_bar")
            .exact_height(TITLE_BAR_HEIGHT)
            .show(ctx, |ui| {
                let bar_rect = ui.max_rect();
                let response = ui.interact(
                    bar_rect,
                    egui::Id::new("title_bar_drag"),
                    egui::Sense::click_and_drag(),
                );
                if response.drag_started() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                if response.double_clicked() {
                    self.window_commands.push(WindowCommand::MaximizeToggle);
                }

                ui.horizontal_centered(|ui| {
                    ui.add_space(8.0);
                    if Self::traffic_light(ui, egui::Color32::from_rgb(0xd0, 0x60, 0x60), "Close")
                        .clicked()
                    {
                        self.window_commands.push(WindowCommand::Close);
                    }
                    if Self::traffic_light(ui, egui::Color32::from_rgb(0xd9, 0xa4, 0x41), "Minimize")
                        .clicked()
                    {
                        self.window_commands.push(WindowCommand::Minimize);
                    }
                    if Self::traffic_light(ui, egui::Color32::from_rgb(0x6f, 0xbf, 0x73), "Maximize")
                        .clicked()
                    {
                        self.window_commands.push(WindowCommand::MaximizeToggle);
                    }
                    ui.add_space(12.0);
                    ui.label(egui::RichText::new("Mocha").strong());

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(8.0);
                        if ui
                            .button("☰")
                            .on_hover_text("Toggle sessions panel")
                            .clicked()
                        {
                            self.sessions_collapsed = !self.sessions_collapsed;
                        }
                        let theme_icon = if self.dark_mode { "☀" } else { "🌙" };
                        if ui.button(theme_icon).on_hover_text("Toggle theme").clicked() {
                            self.dark_mode = !self.dark_mode;
                            ctx.set_visuals(if self.dark_mode {
                                egui::Visuals::dark()
                            } else {
                                egui::Visuals::light()
                            });
                        }
                        ui.add_space(8.0);
                        let (color, label) = match self.state.link {
                            Link::Connected => {
                                (egui::Color32::from_rgb(0x6f, 0xbf, 0x73), "Connected")
                            }
                            Link::Disconnected => {
                                (egui::Color32::from_rgb(0xd0, 0x60, 0x60), "Disconnected")
                            }
                        };
                        ui.label(egui::RichText::new(label).weak().small());
                        ui.colored_label(color, "●");
                    });
                });
            });
    }

    /// Left navigation strip between the screens.
    fn ui_nav(&mut self, ctx: &egui::Context) {
        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("nav")
            .resizable(false)
            .exact_width(110.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Chat, "Chat")
                            .clicked()
                        {
                            *current_screen = Screen::Chat;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Info, "Info")
                            .clicked()
                        {
                            *current_screen = Screen::Info;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Logs, "Logs")
                            .clicked()
                        {
                            *current_screen = Screen::Logs;
                        }
                    });
            });
    }

    /// Right sidebar: session list plus the collapsible model directory.
    fn ui_sessions_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("sessions_panel")
            .resizable(false)
            .exact_width(240.0)
            .show_animated(ctx, !self.sessions_collapsed, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        ui.horizontal(|ui| {
                            ui.heading("Chats");
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.button("New chat").clicked() {
                                        // Always clears, even when already on
                                        // the unsaved buffer.
                                        self.state.apply(ChatAction::SessionSelected(None));
                                        self.notice = None;
                                    }
                                },
                            );
                        });
                        ui.add_space(8.0);

                        let entries: Vec<(i64, String)> = self
                            .state
                            .sessions
                            .iter()
                            .map(|s| (s.id, session_label(s)))
                            .collect();
                        if entries.is_empty() {
                            ui.label(
                                egui::RichText::new("No chats yet. Send a message to start one.")
                                    .weak(),
                            );
                        }
                        let mut clicked: Option<i64> = None;
                        egui::ScrollArea::vertical()
                            .id_source("sessions_scroll")
                            .max_height((ui.available_height() * 0.5).max(120.0))
                            .show(ui, |ui| {
                                for (id, label) in &entries {
                                    let selected = self.state.current_session == Some(*id);
                                    if ui.selectable_label(selected, label).clicked() {
                                        clicked = Some(*id);
                                    }
                                }
                            });
                        if let Some(id) = clicked {
                            self.select_session(Some(id));
                        }

                        ui.add_space(16.0);
                        ui.separator();
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new("Models").strong());
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    let icon = if self.models_collapsed { "⏵" } else { "⏷" };
                                    if ui.button(icon).clicked() {
                                        self.models_collapsed = !self.models_collapsed;
                                    }
                                },
                            );
                        });
                        if !self.models_collapsed {
                            ui.add_space(4.0);
                            if self.state.models.is_empty() {
                                let hint = match self.state.link {
                                    Link::Disconnected => "Backend unreachable; no models.",
                                    Link::Connected => "Loading models...",
                                };
                                ui.label(egui::RichText::new(hint).weak());
                            }
                            let mut picked: Option<String> = None;
                            egui::ScrollArea::vertical().id_source("models_scroll").show(
                                ui,
                                |ui| {
                                    for m in &self.state.models {
                                        let selected = self.state.selected_model.as_deref()
                                            == Some(m.name.as_str());
                                        let label =
                                            format!("{}\n{}", m.name, size_description(m.size));
                                        if ui.selectable_label(selected, label).clicked() {
                                            picked = Some(m.name.clone());
                                        }
                                    }
                                },
                            );
                            if let Some(name) = picked {
                                self.state.apply(ChatAction::ModelSelected(name));
                            }
                        }
                        ui.add_space(Self::SCREEN_FOOTER_SPACING);
                    });
            });
    }

    /// Renders a single chat message (frame, role-based fill, content).
    fn render_chat_message(ui: &mut egui::Ui, m: &Message) {
        let is_user = m.is_user();
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&m.content).strong());
            } else {
                ui.label(&m.content);
                if let Some(ref model) = m.model_name {
                    ui.add_space(2.0);
                    ui.label(egui::RichText::new(model.as_str()).weak().small());
                }
            }
        });
    }

    /// Chat screen: messages fill the space with stick-to-bottom; input and
    /// controls are fixed at the bottom.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let can_send = self.state.can_send();

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section_height =
            CHAT_INPUT_HEIGHT + 8.0 + row_height + Self::SCREEN_FOOTER_SPACING;
        let available = ui.available_height();
        let messages_height = (available - bottom_section_height).max(CHAT_MESSAGES_MIN_HEIGHT);

        let messages_width = ui.available_width();
        let messages_rect = ui
            .allocate_exact_size(
                egui::vec2(messages_width, messages_height),
                egui::Sense::hover(),
            )
            .0;
        let mut messages_ui =
            ui.child_ui(messages_rect, egui::Layout::top_down(egui::Align::Min));
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(&mut messages_ui, |ui| {
                // Force scroll content to viewport width so the scrollbar stays right.
                let content_width = ui.available_width();
                ui.allocate_exact_size(egui::vec2(content_width, 0.0), egui::Sense::hover());
                for m in &self.state.messages {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
                if self.state.loading {
                    ui.label(egui::RichText::new("waiting for reply...").weak().italics());
                } else if self.state.messages.is_empty() {
                    ui.label(egui::RichText::new("No messages yet. Say hello.").weak());
                }
            });

        ui.add_space(8.0);

        let text_response = ui.add_enabled_ui(can_send, |ui| {
            ui.add_sized(
                [ui.available_width(), CHAT_INPUT_HEIGHT],
                egui::TextEdit::multiline(&mut self.chat_input).hint_text("Ask anything..."),
            )
        });
        let response = text_response.inner;
        ui.add_space(8.0);

        let row_width = ui.available_width();
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(row_width, row_height), egui::Sense::hover());
        let mut row_ui = ui.child_ui(rect, egui::Layout::right_to_left(egui::Align::Center));
        let mut send_now = false;
        egui::Frame::none()
            .inner_margin(egui::Margin {
                left: 0.0,
                right: 8.0,
                top: 4.0,
                bottom: 4.0,
            })
            .show(&mut row_ui, |ui| {
                let send_button = ui.add_enabled(can_send, egui::Button::new("Send"));
                if send_button.clicked() {
                    send_now = true;
                }
                ui.add_space(8.0);
                if ui.button("New chat").clicked() {
                    self.state.apply(ChatAction::SessionSelected(None));
                    self.notice = None;
                }
                ui.add_space(8.0);
                match self.state.selected_model.as_deref() {
                    Some(model) => {
                        ui.label(egui::RichText::new(model).weak());
                    }
                    None => {
                        ui.label(egui::RichText::new("no model selected").weak());
                    }
                }
                if can_send && response.has_focus() {
                    let modifiers = ui.input(|i| i.modifiers);
                    if (modifiers.command || modifiers.ctrl)
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    {
                        send_now = true;
                    }
                }
            });
        if send_now {
            self.start_send();
        }

        if let Some(ref err) = self.state.last_error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
        if let Some(ref notice) = self.notice {
            ui.add_space(4.0);
            ui.colored_label(egui::Color32::RED, notice);
        }
        if let Some(ref notice) = self.link_notice {
            ui.add_space(4.0);
            ui.colored_label(egui::Color32::YELLOW, notice);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_info_screen(&mut self, ui: &mut egui::Ui) {
        const INFO_LINE_SPACING: f32 = 6.0;
        const INFO_SUBSECTION_SPACING: f32 = 18.0;
        ui.add_space(24.0);
        ui.heading("Info");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        ui.label(egui::RichText::new("Backend").strong());
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!("Base URL: {}", self.client.base_url()));
        ui.add_space(INFO_LINE_SPACING);
        let status = match self.state.link {
            Link::Connected => "connected",
            Link::Disconnected => "disconnected",
        };
        ui.label(format!("Status: {}", status));
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!("Models available: {}", self.state.models.len()));
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!("Sessions stored: {}", self.state.sessions.len()));
        ui.add_space(INFO_SUBSECTION_SPACING);

        ui.label(egui::RichText::new("UI bundle server").strong());
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!(
            "Serving at: http://{}:{}",
            self.config.ui.bind.trim(),
            self.config.ui.port
        ));
        ui.add_space(INFO_SUBSECTION_SPACING);

        ui.label(egui::RichText::new("Chat").strong());
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!(
            "Default model: {}",
            self.config
                .chat
                .default_model
                .as_deref()
                .unwrap_or("(none)")
        ));
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!(
            "Selected model: {}",
            self.state.selected_model.as_deref().unwrap_or("(none)")
        ));
        ui.add_space(INFO_SUBSECTION_SPACING);

        ui.label(egui::RichText::new("Config").strong());
        ui.add_space(INFO_LINE_SPACING);
        if self.config_path.as_os_str().is_empty() {
            ui.label("Path: (defaults, no config file)");
        } else {
            ui.label(format!("Path: {}", self.config_path.display()));
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }
}

impl eframe::App for MochaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_probe();
        self.poll_sessions();
        self.poll_history();
        self.poll_send();
        if self.state.sessions_stale && self.sessions_receiver.is_none() {
            self.start_sessions_fetch();
        }
        self.maybe_start_probe();
        // Keep the probe timer ticking even when no input arrives.
        ctx.request_repaint_after(Duration::from_secs(1));

        self.ui_title_bar(ctx);
        self.ui_nav(ctx);
        if self.current_screen == Screen::Chat {
            self.ui_sessions_panel(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Chat => {
                        ui.add_space(16.0);
                        self.ui_chat(ui);
                    }
                    Screen::Info => self.ui_info_screen(ui),
                    Screen::Logs => self.ui_logs_screen(ui),
                });
        });

        self.apply_window_commands(ctx);
    }
}
