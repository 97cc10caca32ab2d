mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use concierge_ipc::chat_request::Role;
use concierge_widget::camera::{CameraDevice, FacingMode, MediaStream, PNG_DATA_URL_PREFIX};
use concierge_widget::controller::{
    welcome_message, ChatController, QuickAction, IMAGE_SENT_DISPLAY, IMAGE_SENT_HISTORY,
    PRODUCT_DETAIL_UNAVAILABLE, RECOMMEND_FALLBACK_MESSAGE, RECOMMEND_MESSAGE, RESET_DONE_MESSAGE,
};
use concierge_widget::page::{MenuCard, StaticPage};
use concierge_widget::profile::{profile_key, user_id_key, ProfileStore, LEGACY_HISTORY_KEY};
use concierge_widget::reservation::{ReservationForm, FORM_INTRO_MESSAGE, MISSING_FIELDS_ALERT};
use concierge_widget::speech::{SpeechAction, SpeechIo, Voice, RESTART_DELAY, UNSUPPORTED_TOOLTIP};
use concierge_widget::storage::{InMemoryStorage, KeyValueStorage, StorageRef};
use concierge_widget::theme::DEFAULT_THEME_COLOR;
use concierge_widget::transport::TransportError;
use concierge_widget::view::{Control, ControlState, MessageRole};
use concierge_widget::{UserProfile, WidgetSettings};
use serde_json::json;

use common::{RecordingView, ScriptedTransport, ViewLog};

const SCENARIO: &str = "おすすめです\n```json\n{\"products\":[{\"name\":\"X\",\"price\":\"500\"}]}\n```\n[[PROFILE_DELTA:\n{\"likes_fries\": true}\n]]";

/// 12:00 in Tokyo
fn lunch_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap()
}

/// 23:00 in Tokyo
fn late_night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 14, 0, 0).unwrap()
}

fn burger_page() -> StaticPage {
    StaticPage {
        title: Some("Miryu Burger".to_string()),
        store_info: Some("営業時間\n11:00-22:00".to_string()),
        menu_cards: vec![
            MenuCard {
                title: Some("チーズバーガー".to_string()),
                description: Some("濃厚チーズ".to_string()),
                price: Some("¥980".to_string()),
                image: Some("img/cheese.jpg".to_string()),
                tags: vec!["人気".to_string()],
            },
            MenuCard {
                title: Some("X".to_string()),
                description: Some("シンプル".to_string()),
                price: Some("¥450".to_string()),
                image: Some("img/x.jpg".to_string()),
                tags: vec![],
            },
        ],
        ..Default::default()
    }
}

struct Harness {
    controller: ChatController,
    transport: Arc<ScriptedTransport>,
    log: Arc<Mutex<ViewLog>>,
    storage: InMemoryStorage,
}

impl Harness {
    fn new(page: StaticPage, transport: Arc<ScriptedTransport>) -> Self {
        Self::build(page, transport, lunch_time(), |controller| controller)
    }

    fn with_clock(page: StaticPage, transport: Arc<ScriptedTransport>, now: DateTime<Utc>) -> Self {
        Self::build(page, transport, now, |controller| controller)
    }

    fn build(
        page: StaticPage,
        transport: Arc<ScriptedTransport>,
        now: DateTime<Utc>,
        configure: impl FnOnce(ChatController) -> ChatController,
    ) -> Self {
        let storage = InMemoryStorage::new();
        let storage_ref: StorageRef = Arc::new(storage.clone());
        let profile = ProfileStore::open(storage_ref, "miryu_ai").unwrap();
        let view = RecordingView::default();
        let log = view.log.clone();

        let controller = ChatController::new(
            WidgetSettings::default(),
            profile,
            Arc::new(page),
            transport.clone(),
            Box::new(view),
        )
        .with_clock(Arc::new(move || now));
        let mut controller = configure(controller);
        controller.start();

        Self {
            controller,
            transport,
            log,
            storage,
        }
    }

    fn texts(&self) -> Vec<String> {
        self.log.lock().unwrap().texts()
    }

    fn stored_profile(&self) -> UserProfile {
        let visitor_id = self.storage.get_item(&user_id_key("miryu_ai")).unwrap().unwrap();
        let raw = self
            .storage
            .get_item(&profile_key("miryu_ai", &visitor_id))
            .unwrap()
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

#[tokio::test]
async fn start_greets_and_counts_the_visit() {
    let transport = ScriptedTransport::replying(&[]);
    let storage = InMemoryStorage::new();
    storage.set_item(LEGACY_HISTORY_KEY, "[]").unwrap();

    let storage_ref: StorageRef = Arc::new(storage.clone());
    let profile = ProfileStore::open(storage_ref, "miryu_ai").unwrap();
    let view = RecordingView::default();
    let log = view.log.clone();
    let mut controller = ChatController::new(
        WidgetSettings::default(),
        profile,
        Arc::new(burger_page()),
        transport.clone(),
        Box::new(view),
    );
    controller.start();

    assert_eq!(storage.get_item(LEGACY_HISTORY_KEY).unwrap(), None);
    assert_eq!(controller.profile().visit_count, 1);

    let log = log.lock().unwrap();
    assert_eq!(log.texts(), vec![welcome_message("Miryu Burger Demo")]);
    assert_eq!(
        log.control(Control::Microphone),
        Some(ControlState::Disabled {
            tooltip: UNSUPPORTED_TOOLTIP.to_string()
        })
    );
    assert_eq!(controller.session().history.len(), 1);
    assert_eq!(controller.session().history[0].role, Role::Model);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn reply_blocks_become_cards_and_profile_updates() {
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[SCENARIO]));

    h.controller.send_message("  おすすめは？ ").await;

    {
        let log = h.log.lock().unwrap();
        let reply = log.last_message();
        assert_eq!(reply.role, MessageRole::Bot);
        assert_eq!(reply.text, "おすすめです");
        assert_eq!(reply.products.len(), 1);
        assert_eq!(reply.products[0].name, "X");
        assert_eq!(reply.products[0].price, "500");
        assert_eq!(reply.products[0].id, "menu_2");
        assert_eq!(reply.products[0].image_url, "img/x.jpg");
        assert_eq!(log.loading, None);
    }

    assert_eq!(h.controller.profile().likes_fries, Some(true));
    assert_eq!(h.stored_profile().likes_fries, Some(true));
    assert_eq!(h.stored_profile().visit_count, 1);

    let history = &h.controller.session().history;
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].text(), "おすすめは？");
    assert!(history[2].text().contains("```json"));
    assert!(!history[2].text().contains("PROFILE_DELTA"));

    let request = h.transport.last_request();
    assert_eq!(request.history.len(), 2);
    assert_eq!(request.image_base64, None);
    let prompt = request.system_prompt.unwrap();
    assert!(prompt.contains("【現在表示中のページ情報（優先参照）】"));
    assert!(prompt.contains("\"name\": \"チーズバーガー\""));
    assert!(prompt.contains("特に情報なし（初対面に近い）"));
}

#[tokio::test]
async fn blank_page_sends_no_page_context() {
    let mut h = Harness::new(StaticPage::default(), ScriptedTransport::replying(&["いらっしゃいませ"]));

    h.controller.send_message("こんにちは").await;

    let prompt = h.transport.last_request().system_prompt.unwrap();
    assert!(!prompt.contains("【現在表示中のページ情報（優先参照）】"));
    assert!(!prompt.contains("\"siteName\""));
    assert!(prompt.contains("特に情報なし（初対面に近い）"));
    assert_eq!(h.log.lock().unwrap().last_message().text, "いらっしゃいませ");
}

#[tokio::test]
async fn malformed_blocks_stay_visible() {
    let raw = "こちらです\n```json\n{products: oops}\n```\n[[PROFILE_DELTA: {likes_fries: yes} ]]";
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[raw]));

    h.controller.send_message("おすすめ").await;

    let log = h.log.lock().unwrap();
    assert_eq!(log.last_message().text, raw);
    assert!(log.last_message().products.is_empty());
    assert_eq!(h.controller.profile().likes_fries, None);
}

#[tokio::test]
async fn reset_command_never_reaches_the_network() {
    let mut h = Harness::new(
        burger_page(),
        ScriptedTransport::replying(&["了解です\n[[PROFILE_DELTA: {\"likes_spicy\": true, \"preferred_drink\": \"コーラ\"}]]"]),
    );
    h.controller.send_message("辛いのが好き").await;
    assert_eq!(h.controller.profile().likes_spicy, Some(true));

    h.controller.send_message("私のこと忘れて").await;

    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.controller.profile(), &UserProfile::default());
    let texts = h.texts();
    assert_eq!(texts[texts.len() - 2], "私のこと忘れて");
    assert_eq!(texts[texts.len() - 1], RESET_DONE_MESSAGE);
    // the reset exchange is not part of the conversation
    assert_eq!(h.controller.session().history.len(), 3);
}

#[tokio::test]
async fn upstream_and_transport_failures_become_messages() {
    let transport = ScriptedTransport::replying(&[]);
    transport.push_body(json!({ "error": { "message": "API key not valid" } }));
    transport.push_error(TransportError::Decode("HTTP 502: expected value".to_string()));
    transport.push_body(json!({ "candidates": [] }));
    let mut h = Harness::new(burger_page(), transport);

    h.controller.send_message("one").await;
    h.controller.send_message("two").await;
    h.controller.send_message("three").await;

    let texts = h.texts();
    assert_eq!(texts[2], "申し訳ありません。エラーが発生しました: API key not valid");
    assert_eq!(texts[4], "通信エラーが発生しました: Invalid response body: HTTP 502: expected value");
    assert_eq!(texts[6], "応答の生成に失敗しました。");
}

#[tokio::test]
async fn mentioned_product_gets_a_card_and_resolves_demonstratives() {
    let mut h = Harness::new(
        burger_page(),
        ScriptedTransport::replying(&["チーズバーガーが人気です", "¥980です"]),
    );

    h.controller.send_message("人気なのは？").await;
    {
        let log = h.log.lock().unwrap();
        assert_eq!(log.last_message().products.len(), 1);
        assert_eq!(log.last_message().products[0].id, "menu_1");
    }
    assert_eq!(
        h.controller.session().last_mentioned_product.as_deref(),
        Some("チーズバーガー")
    );

    h.controller.on_recognition_result("えっとそれの値段は？").await;
    assert_eq!(h.transport.last_request().history[3].text(), "チーズバーガーの値段は？");
}

/// Two sends in flight at once are not serialized: both user turns are
/// recorded before either reply, and replies render in arrival order.
#[tokio::test]
async fn overlapping_sends_render_in_arrival_order() {
    let mut h = Harness::new(StaticPage::default(), ScriptedTransport::replying(&[]));

    let first = h.controller.begin_send("A").unwrap();
    let second = h.controller.begin_send("B").unwrap();
    assert_eq!(first.request.history.len(), 2);
    assert_eq!(second.request.history.len(), 3);

    h.controller.complete("reply to B");
    assert_eq!(h.log.lock().unwrap().loading, None);
    h.controller.complete("reply to A");

    assert_eq!(
        h.texts()[1..],
        ["A", "B", "reply to B", "reply to A"].map(String::from)
    );
    let history: Vec<&str> = h.controller.session().history.iter().map(|t| t.text()).collect();
    assert_eq!(history[1..], ["A", "B", "reply to B", "reply to A"]);
}

#[tokio::test]
async fn reservation_follows_business_hours() {
    let mut open = Harness::with_clock(burger_page(), ScriptedTransport::replying(&[]), lunch_time());
    open.controller.quick_action(QuickAction::Reservation);
    {
        let log = open.log.lock().unwrap();
        assert_eq!(log.last_message().text, FORM_INTRO_MESSAGE);
        assert_eq!(log.forms, vec![ReservationForm::default()]);
    }

    let mut closed = Harness::with_clock(burger_page(), ScriptedTransport::replying(&[]), late_night());
    closed.controller.quick_action(QuickAction::Reservation);
    let log = closed.log.lock().unwrap();
    assert_eq!(log.last_message().text, WidgetSettings::default().off_hours_message);
    assert!(log.forms.is_empty());
}

#[tokio::test]
async fn reservation_submit_validates_then_confirms() {
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[]));

    let mut form = ReservationForm::default();
    assert_eq!(h.controller.submit_reservation(&form), None);
    assert_eq!(h.log.lock().unwrap().alerts, vec![MISSING_FIELDS_ALERT.to_string()]);

    form.date = "2026-10-24".to_string();
    form.name = "田中 太郎".to_string();
    let request = h.controller.submit_reservation(&form).unwrap();
    assert_eq!(request.party_size, "1名");

    let log = h.log.lock().unwrap();
    assert!(log.form_disabled);
    assert_eq!(log.last_message().text, WidgetSettings::default().reservation_success_message);
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn recommend_and_faq_quick_actions() {
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[]));
    h.controller.quick_action(QuickAction::Recommend);
    {
        let log = h.log.lock().unwrap();
        let message = log.last_message();
        assert_eq!(message.text, RECOMMEND_MESSAGE);
        assert_eq!(message.products.len(), 1);
        assert!(message.products[0].id.starts_with("menu_"));
    }

    let mut empty = Harness::new(StaticPage::default(), ScriptedTransport::replying(&[]));
    empty.controller.quick_action(QuickAction::Recommend);
    empty.controller.quick_action("faq".parse().unwrap());
    let texts = empty.texts();
    assert_eq!(texts[texts.len() - 2], RECOMMEND_FALLBACK_MESSAGE);
    assert_eq!(texts[texts.len() - 1], "よくあるご質問ですね。何について知りたいですか？");
}

#[tokio::test]
async fn product_detail_lookup() {
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[]));

    h.controller.show_product_detail("menu_1");
    h.controller.show_product_detail("menu_99");

    let log = h.log.lock().unwrap();
    assert_eq!(log.details.len(), 1);
    assert_eq!(log.details[0].name, "チーズバーガー");
    assert_eq!(log.details[0].tags, vec!["人気".to_string()]);
    assert_eq!(log.last_message().text, PRODUCT_DETAIL_UNAVAILABLE);
}

#[tokio::test]
async fn closing_the_chat_brings_back_a_hidden_avatar() {
    let mut h = Harness::new(burger_page(), ScriptedTransport::replying(&[]));

    h.controller.toggle_chat_window();
    h.controller.toggle_avatar();
    h.controller.toggle_transparent();
    assert!(h.controller.session().chat_open);
    assert!(!h.controller.session().avatar_visible);
    assert!(h.controller.session().transparent);

    h.controller.close_chat();
    assert!(!h.controller.session().chat_open);
    assert!(h.controller.session().avatar_visible);
    assert_eq!(h.log.lock().unwrap().control(Control::Avatar), Some(ControlState::Active));
}

#[tokio::test]
async fn theme_follows_page_brand_then_picker() {
    let plain = Harness::new(burger_page(), ScriptedTransport::replying(&[]));
    assert_eq!(plain.log.lock().unwrap().theme_colors, vec![DEFAULT_THEME_COLOR.to_string()]);

    let branded = StaticPage {
        header_background: Some("rgb(200, 30, 30)".to_string()),
        ..burger_page()
    };
    let mut h = Harness::new(branded, ScriptedTransport::replying(&[]));
    assert_eq!(h.controller.session().theme_color, "rgb(200, 30, 30)");

    h.controller.toggle_theme_picker();
    assert_eq!(h.log.lock().unwrap().control(Control::ThemePicker), Some(ControlState::Active));

    h.controller.choose_theme_color("#27ae60");
    assert_eq!(h.controller.session().theme_color, "#27ae60");
    assert!(!h.controller.session().theme_picker_open);
    let log = h.log.lock().unwrap();
    assert_eq!(log.theme_colors.last().map(String::as_str), Some("#27ae60"));
    assert_eq!(log.control(Control::ThemePicker), Some(ControlState::Inactive));
}

#[derive(Clone, Default)]
struct RecordingSpeech {
    actions: Arc<Mutex<Vec<SpeechAction>>>,
}

impl SpeechIo for RecordingSpeech {
    fn recognition_supported(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            name: "Google 日本語".to_string(),
            lang: "ja-JP".to_string(),
        }]
    }

    fn perform(&mut self, action: SpeechAction) -> concierge_widget::Result<()> {
        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

#[tokio::test]
async fn spoken_replies_loop_back_into_listening() {
    let speech = RecordingSpeech::default();
    let actions = speech.actions.clone();
    let mut h = Harness::build(
        burger_page(),
        ScriptedTransport::replying(&[SCENARIO]),
        lunch_time(),
        |controller| controller.with_speech(Box::new(speech)),
    );
    assert_eq!(h.log.lock().unwrap().control(Control::Microphone), Some(ControlState::Inactive));

    h.controller.toggle_tts();
    h.controller.send_message("おすすめは？").await;

    let spoken = actions
        .lock()
        .unwrap()
        .iter()
        .find_map(|action| match action {
            SpeechAction::Speak(utterance) => Some(utterance.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(spoken.text, "おすすめです");
    assert_eq!(spoken.voice.unwrap().name, "Google 日本語");

    actions.lock().unwrap().clear();
    h.controller.on_speech_ended();
    h.controller.on_restart_due();
    assert_eq!(
        *actions.lock().unwrap(),
        vec![SpeechAction::ScheduleRestart(RESTART_DELAY), SpeechAction::StartRecognition]
    );

    actions.lock().unwrap().clear();
    h.controller.toggle_tts();
    assert_eq!(*actions.lock().unwrap(), vec![SpeechAction::CancelSpeech]);
}

struct StillCamera;

struct StillStream;

impl MediaStream for StillStream {
    fn capture_png(&mut self) -> concierge_widget::Result<Vec<u8>> {
        Ok(b"png".to_vec())
    }

    fn stop(&mut self) {}
}

#[async_trait]
impl CameraDevice for StillCamera {
    async fn open(&self, _facing: FacingMode) -> concierge_widget::Result<Box<dyn MediaStream>> {
        Ok(Box::new(StillStream))
    }
}

#[tokio::test]
async fn captured_image_is_sent_with_the_history_placeholder() {
    let mut h = Harness::build(
        burger_page(),
        ScriptedTransport::replying(&["画像を拝見しました。チーズバーガーですね"]),
        lunch_time(),
        |controller| {
            controller
                .with_camera(Arc::new(StillCamera))
                .with_page_url("https://shop.example.com/")
        },
    );

    h.controller.open_camera().await;
    assert!(h.controller.camera_open());
    h.controller.capture_and_send().await;
    assert!(!h.controller.camera_open());

    let request = h.transport.last_request();
    assert!(request.image_base64.unwrap().starts_with(PNG_DATA_URL_PREFIX));
    assert_eq!(request.history.last().unwrap().text(), IMAGE_SENT_HISTORY);
    assert!(request.system_prompt.unwrap().contains("【画像入力】"));

    let texts = h.texts();
    assert!(texts.contains(&IMAGE_SENT_DISPLAY.to_string()));
    assert_eq!(texts.last().unwrap(), "画像を拝見しました。チーズバーガーですね");
}

#[tokio::test]
async fn camera_is_refused_on_plain_http() {
    let mut h = Harness::build(
        burger_page(),
        ScriptedTransport::replying(&[]),
        lunch_time(),
        |controller| {
            controller
                .with_camera(Arc::new(StillCamera))
                .with_page_url("http://shop.example.com/")
        },
    );

    h.controller.open_camera().await;
    assert!(!h.controller.camera_open());
    assert_eq!(
        h.texts().last().unwrap(),
        "カメラは安全な接続（HTTPS）またはローカル環境でのみ利用できます。"
    );
}
