//! Chat controller: turns visitor events into view updates, network calls
//! and profile changes.
//!
//! Sends are split into [`ChatController::begin_send`] and
//! [`ChatController::complete`]. Nothing serializes two sends: when a second
//! request starts before the first reply arrives, both user turns land in the
//! history first and the replies are rendered in arrival order, sharing the
//! single loading row.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use concierge_ipc::chat_request::{ChatProxyRequest, ConversationTurn};
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};

use crate::camera::{
    is_secure_origin, CameraDevice, CameraSession, CAMERA_UNAVAILABLE_MESSAGE, INSECURE_ORIGIN_MESSAGE,
};
use crate::config::WidgetSettings;
use crate::error::WidgetError;
use crate::page::{collect_page_context, PageContentProvider};
use crate::products::{ProductCardData, ProductRegistry, RecommendedProduct};
use crate::profile::{ProfileStore, UserProfile};
use crate::prompt::{to_japan_time, PromptAssembler};
use crate::reply::{parse_reply, speech_text};
use crate::reservation::{ReservationForm, ReservationRequest, FORM_INTRO_MESSAGE};
use crate::session::SessionState;
use crate::theme::detect_brand_color;
use crate::speech::{clean_user_speech, NoSpeech, SpeechAction, SpeechIo, SpeechLoop, UNSUPPORTED_TOOLTIP};
use crate::transport::{reply_text, ChatTransport};
use crate::view::{ChatMessage, ChatView, Control, ControlState};

/// Any of these in the input wipes the profile instead of chatting
pub const RESET_COMMANDS: [&str; 3] = ["記憶をリセット", "記憶を消して", "忘れて"];
pub const RESET_DONE_MESSAGE: &str =
    "かしこまりました。これまでの好みに関する情報をすべてリセットしました。";

pub const LOADING_TEXT: &str = "...";
pub const IMAGE_LOADING_TEXT: &str = "画像を解析中...";
/// Shown in the chat for a captured image
pub const IMAGE_SENT_DISPLAY: &str = "（画像を送信しました）";
/// Recorded in the history for a captured image
pub const IMAGE_SENT_HISTORY: &str = "（画像送信）";

pub const RECOMMEND_MESSAGE: &str = "おすすめのメニューですね！こちらはいかがでしょうか？";
pub const RECOMMEND_FALLBACK_MESSAGE: &str =
    "おすすめのメニューですね！\n申し訳ありません、現在メニュー情報を取得できませんでした。";
pub const FAQ_MESSAGE: &str = "よくあるご質問ですね。何について知りたいですか？";
pub const PRODUCT_DETAIL_UNAVAILABLE: &str =
    "申し訳ありません。この商品の詳細情報は現在取得できません。";

/// Page the widget runs on when none is configured
pub const DEFAULT_PAGE_URL: &str = "http://localhost/";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn welcome_message(site_name: &str) -> String {
    format!(
        "いらっしゃいませ！ {}へようこそ！\n\n何かお手伝いできることはありますか？\n（例：「おすすめのメニューは？」）",
        site_name
    )
}

/// Shortcut chips above the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Reservation,
    Recommend,
    Faq,
}

impl FromStr for QuickAction {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reservation" => Ok(QuickAction::Reservation),
            "recommend" => Ok(QuickAction::Recommend),
            "faq" => Ok(QuickAction::Faq),
            other => Err(WidgetError::Page(format!("Unknown quick action: {}", other))),
        }
    }
}

/// A request that left the controller and whose reply is still out
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub request: ChatProxyRequest,
}

pub struct ChatController {
    settings: WidgetSettings,
    session: SessionState,
    profile: ProfileStore,
    page: Arc<dyn PageContentProvider>,
    prompt: PromptAssembler,
    transport: Arc<dyn ChatTransport>,
    view: Box<dyn ChatView>,
    speech: SpeechLoop,
    speech_io: Box<dyn SpeechIo>,
    camera_device: Option<Arc<dyn CameraDevice>>,
    camera: Option<CameraSession>,
    page_url: String,
    clock: Clock,
}

impl ChatController {
    pub fn new(
        settings: WidgetSettings,
        profile: ProfileStore,
        page: Arc<dyn PageContentProvider>,
        transport: Arc<dyn ChatTransport>,
        view: Box<dyn ChatView>,
    ) -> Self {
        let prompt = PromptAssembler::new(&settings);
        Self {
            settings,
            session: SessionState::default(),
            profile,
            page,
            prompt,
            transport,
            view,
            speech: SpeechLoop::new(false),
            speech_io: Box::new(NoSpeech),
            camera_device: None,
            camera: None,
            page_url: DEFAULT_PAGE_URL.to_string(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_speech(mut self, speech_io: Box<dyn SpeechIo>) -> Self {
        self.speech = SpeechLoop::new(speech_io.recognition_supported());
        self.speech_io = speech_io;
        self
    }

    pub fn with_camera(mut self, device: Arc<dyn CameraDevice>) -> Self {
        self.camera_device = Some(device);
        self
    }

    /// URL of the hosting page; decides whether the camera may be used
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = page_url.into();
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn profile(&self) -> &UserProfile {
        self.profile.profile()
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn speech(&self) -> &SpeechLoop {
        &self.speech
    }

    pub fn camera_open(&self) -> bool {
        self.camera.is_some()
    }

    /// Page load: count the visit, drop legacy history, greet.
    pub fn start(&mut self) {
        if let Err(e) = self.profile.clear_legacy_history() {
            warn!(error = %e, "Failed to clear legacy chat history");
        }
        let now = (self.clock)();
        if let Err(e) = self.profile.record_visit(now) {
            warn!(error = %e, "Failed to persist visit");
        }

        self.view.set_control(Control::Avatar, ControlState::from_flag(self.session.avatar_visible));
        self.view.set_control(Control::Transparency, ControlState::from_flag(self.session.transparent));
        self.view.set_control(Control::Tts, ControlState::from_flag(self.session.tts_enabled));
        let microphone = if self.speech.recognition_supported() {
            ControlState::Inactive
        } else {
            ControlState::Disabled {
                tooltip: UNSUPPORTED_TOOLTIP.to_string(),
            }
        };
        self.view.set_control(Control::Microphone, microphone);

        self.session.theme_color =
            detect_brand_color(self.page.as_ref()).unwrap_or_else(|| self.settings.primary_color.clone());
        self.view.set_theme_color(&self.session.theme_color);

        let welcome = welcome_message(&self.settings.site_name);
        self.view.add_message(&ChatMessage::bot(welcome.clone()));
        self.session.push(ConversationTurn::model(welcome));
        info!(visitor_id = %self.profile.visitor_id(), "Widget started");
    }

    /// Send typed (or recognized) text and render the reply.
    pub async fn send_message(&mut self, text: &str) {
        if let Some(pending) = self.begin_send(text) {
            let raw = self.dispatch(&pending).await;
            self.complete(&raw);
        }
    }

    /// First half of a send: echo, record the user turn, show the loading
    /// row and build the request. `None` when there is nothing to send.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingReply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if RESET_COMMANDS.iter().any(|command| text.contains(command)) {
            self.reset_profile();
            self.view.add_message(&ChatMessage::user(text));
            self.view.add_message(&ChatMessage::bot(RESET_DONE_MESSAGE));
            return None;
        }

        self.view.add_message(&ChatMessage::user(text));
        self.session.push(ConversationTurn::user(text));
        self.view.show_loading(LOADING_TEXT);
        Some(self.build_request(None))
    }

    /// Post a pending request and map the outcome to reply text
    pub async fn dispatch(&self, pending: &PendingReply) -> String {
        reply_text(self.transport.send(&pending.request).await)
    }

    /// Second half of a send: parse the raw reply, apply the profile delta,
    /// render, record the model turn, speak.
    pub fn complete(&mut self, raw_reply: &str) {
        self.view.remove_loading();

        let parsed = parse_reply(raw_reply);
        if let Some(delta) = &parsed.profile_delta {
            if let Err(e) = self.profile.apply_delta(delta) {
                warn!(error = %e, "Failed to persist profile delta");
            }
        }

        let recommended = parsed
            .product_block
            .as_ref()
            .map(|block| block.products())
            .unwrap_or_default();
        self.show_bot_message(&parsed.display_text, &recommended);

        self.session.push(ConversationTurn::model(parsed.history_text.clone()));
        self.speak(&speech_text(&parsed.history_text));
    }

    fn build_request(&self, image_base64: Option<String>) -> PendingReply {
        let now = (self.clock)();
        let system_prompt = self.prompt.build(
            &self.session.history,
            self.profile.profile(),
            Some(self.page.as_ref()),
            now,
            image_base64.is_some(),
        );
        PendingReply {
            request: ChatProxyRequest {
                history: self.session.history.clone(),
                image_base64,
                system_prompt: Some(system_prompt),
            },
        }
    }

    /// Render a bot row. Model recommendations win; otherwise the first
    /// (longest) product name mentioned in the text gets a card.
    fn show_bot_message(&mut self, text: &str, recommended: &[RecommendedProduct]) {
        let registry = ProductRegistry::from_page(self.page.as_ref());

        let cards: Vec<ProductCardData> = if !recommended.is_empty() {
            recommended.iter().map(|product| registry.merge(product)).collect()
        } else if let Some(product) = registry.find_mentioned(text) {
            debug!(product = %product.name, "Product mentioned in reply");
            self.session.last_mentioned_product = Some(product.name.clone());
            vec![product.clone()]
        } else {
            Vec::new()
        };

        self.view.add_message(&ChatMessage::bot(text).with_products(cards));
    }

    fn reset_profile(&mut self) {
        if let Err(e) = self.profile.reset() {
            warn!(error = %e, "Failed to remove stored profile");
        }
    }

    pub fn quick_action(&mut self, action: QuickAction) {
        match action {
            QuickAction::Reservation => {
                let hour = to_japan_time((self.clock)()).hour();
                if self.settings.hours.is_open_at(hour) {
                    self.show_bot_message(FORM_INTRO_MESSAGE, &[]);
                    self.view.show_reservation_form(&ReservationForm::default());
                } else {
                    let message = self.settings.off_hours_message.clone();
                    self.show_bot_message(&message, &[]);
                }
            }
            QuickAction::Recommend => {
                let items = collect_page_context(self.page.as_ref())
                    .map(|context| context.items)
                    .unwrap_or_default();
                match items.choose(&mut rand::thread_rng()) {
                    Some(item) => {
                        let registry = ProductRegistry::from_page(self.page.as_ref());
                        let card = registry
                            .get(&item.id)
                            .cloned()
                            .unwrap_or_else(|| ProductCardData::from(item));
                        self.view
                            .add_message(&ChatMessage::bot(RECOMMEND_MESSAGE).with_products(vec![card]));
                    }
                    None => self.show_bot_message(RECOMMEND_FALLBACK_MESSAGE, &[]),
                }
            }
            QuickAction::Faq => self.show_bot_message(FAQ_MESSAGE, &[]),
        }
    }

    /// Demo only: validates, locks the form and confirms. Nothing is booked.
    pub fn submit_reservation(&mut self, form: &ReservationForm) -> Option<ReservationRequest> {
        match form.validate() {
            Ok(request) => {
                info!(date = %request.date, time = %request.time, party_size = %request.party_size, "Reservation request accepted");
                self.view.disable_reservation_form();
                let message = self.settings.reservation_success_message.clone();
                self.show_bot_message(&message, &[]);
                Some(request)
            }
            Err(WidgetError::Reservation(message)) => {
                self.view.alert(&message);
                None
            }
            Err(e) => {
                self.view.alert(&e.to_string());
                None
            }
        }
    }

    pub fn show_product_detail(&mut self, product_id: &str) {
        let registry = ProductRegistry::from_page(self.page.as_ref());
        match registry.get(product_id) {
            Some(product) => self.view.show_product_detail(product),
            None => self.show_bot_message(PRODUCT_DETAIL_UNAVAILABLE, &[]),
        }
    }

    pub fn toggle_avatar(&mut self) {
        self.session.avatar_visible = !self.session.avatar_visible;
        self.view
            .set_control(Control::Avatar, ControlState::from_flag(self.session.avatar_visible));
    }

    pub fn toggle_transparent(&mut self) {
        self.session.transparent = !self.session.transparent;
        self.view
            .set_control(Control::Transparency, ControlState::from_flag(self.session.transparent));
    }

    pub fn toggle_tts(&mut self) {
        self.session.tts_enabled = !self.session.tts_enabled;
        if !self.session.tts_enabled {
            let actions = self.speech.cancel_speech();
            self.perform(actions);
        }
        self.view
            .set_control(Control::Tts, ControlState::from_flag(self.session.tts_enabled));
    }

    /// Palette button in the header
    pub fn toggle_theme_picker(&mut self) {
        self.session.theme_picker_open = !self.session.theme_picker_open;
        self.view.set_control(
            Control::ThemePicker,
            ControlState::from_flag(self.session.theme_picker_open),
        );
    }

    /// A swatch was picked; the picker closes.
    pub fn choose_theme_color(&mut self, color: &str) {
        let color = color.trim();
        if color.is_empty() {
            return;
        }
        debug!(color, "Theme colour changed");
        self.session.theme_color = color.to_string();
        self.view.set_theme_color(color);
        self.session.theme_picker_open = false;
        self.view.set_control(Control::ThemePicker, ControlState::Inactive);
    }

    /// Avatar click
    pub fn toggle_chat_window(&mut self) {
        self.session.chat_open = !self.session.chat_open;
        self.view
            .set_control(Control::ChatWindow, ControlState::from_flag(self.session.chat_open));
    }

    /// Close button. A hidden avatar comes back so the widget can be reopened.
    pub fn close_chat(&mut self) {
        self.session.chat_open = false;
        self.view.set_control(Control::ChatWindow, ControlState::Inactive);
        if !self.session.avatar_visible {
            self.session.avatar_visible = true;
            self.view.set_control(Control::Avatar, ControlState::Active);
        }
    }

    pub async fn open_camera(&mut self) {
        if !is_secure_origin(&self.page_url) {
            self.show_bot_message(INSECURE_ORIGIN_MESSAGE, &[]);
            return;
        }
        let Some(device) = self.camera_device.clone() else {
            warn!("No camera device available");
            self.show_bot_message(CAMERA_UNAVAILABLE_MESSAGE, &[]);
            return;
        };

        match CameraSession::open(device.as_ref(), &self.page_url).await {
            Ok(session) => {
                self.camera = Some(session);
                self.view.set_control(Control::CameraPreview, ControlState::Active);
            }
            Err(e) => {
                error!(error = %e, "Camera error");
                self.show_bot_message(CAMERA_UNAVAILABLE_MESSAGE, &[]);
            }
        }
    }

    pub fn cancel_camera(&mut self) {
        if let Some(session) = self.camera.take() {
            session.cancel();
        }
        self.view.set_control(Control::CameraPreview, ControlState::Inactive);
    }

    /// Shutter: send the frame to the model. Does nothing without an open
    /// camera.
    pub async fn capture_and_send(&mut self) {
        if let Some(pending) = self.begin_capture() {
            let raw = self.dispatch(&pending).await;
            self.complete(&raw);
        }
    }

    pub fn begin_capture(&mut self) -> Option<PendingReply> {
        let session = self.camera.take()?;
        let captured = session.capture();
        self.view.set_control(Control::CameraPreview, ControlState::Inactive);

        let data_url = match captured {
            Ok(data_url) => data_url,
            Err(e) => {
                error!(error = %e, "Camera capture failed");
                self.show_bot_message(CAMERA_UNAVAILABLE_MESSAGE, &[]);
                return None;
            }
        };

        self.view.add_message(&ChatMessage::user(IMAGE_SENT_DISPLAY));
        self.session.push(ConversationTurn::user(IMAGE_SENT_HISTORY));
        self.view.show_loading(IMAGE_LOADING_TEXT);
        Some(self.build_request(Some(data_url)))
    }

    /// Microphone control
    pub fn toggle_microphone(&mut self) {
        let actions = self.speech.toggle_listening();
        self.perform(actions);
    }

    pub fn on_recognition_started(&mut self) {
        self.speech.on_recognition_started();
        self.view.set_control(Control::Microphone, ControlState::Active);
    }

    pub fn on_recognition_ended(&mut self) {
        self.speech.on_recognition_ended();
        self.view.set_control(Control::Microphone, ControlState::Inactive);
    }

    pub fn on_recognition_error(&mut self, error: &str) {
        self.speech.on_recognition_error(error);
        self.view.set_control(Control::Microphone, ControlState::Inactive);
    }

    /// A transcript arrived: clean it up and send it like typed text
    pub async fn on_recognition_result(&mut self, transcript: &str) {
        let cleaned = clean_user_speech(transcript, self.session.last_mentioned_product.as_deref());
        self.send_message(&cleaned).await;
    }

    pub fn on_speech_ended(&mut self) {
        let actions = self.speech.on_speech_ended(self.session.tts_enabled);
        self.perform(actions);
    }

    pub fn on_restart_due(&mut self) {
        let actions = self.speech.on_restart_due(self.session.tts_enabled);
        self.perform(actions);
    }

    fn speak(&mut self, text: &str) {
        let voices = self.speech_io.voices();
        let actions = self.speech.speak(text, self.session.tts_enabled, &voices);
        self.perform(actions);
    }

    fn perform(&mut self, actions: Vec<SpeechAction>) {
        for action in actions {
            if let Err(e) = self.speech_io.perform(action) {
                warn!(error = %e, "Speech action failed");
            }
        }
    }
}
