//! System prompt assembly.
//!
//! The persona/policy template carries two runtime placeholders, replaced by
//! literal substitution on every request. A placeholder missing from a
//! custom template is simply not substituted.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use concierge_ipc::chat_request::ConversationTurn;
use regex::Regex;
use tracing::warn;

use crate::config::WidgetSettings;
use crate::page::{collect_page_context, PageContentProvider};
use crate::profile::UserProfile;

pub const CURRENT_TIME_PLACEHOLDER: &str = "{{CURRENT_TIME_PLACEHOLDER}}";
pub const USER_PROFILE_PLACEHOLDER: &str = "{{USER_PROFILE_PLACEHOLDER}}";

const PAGE_CONTEXT_HEADER: &str =
    "\n\n【現在表示中のページ情報（優先参照）】\nこの情報だけを信頼して回答してください。\n";

const IMAGE_INPUT_HINT: &str = "\n\n【画像入力】\nユーザーから画像が送信されました。「画像を拝見しました。」から回答を始めてください。画像の内容を説明し、もしメニューや商品が写っていれば特定して案内してください。";

/// Japan has no daylight saving time, a fixed offset is exact.
const JST_OFFSET_SECS: i32 = 9 * 3600;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"
あなたは、企業・店舗の公式Webサイトに設置された
「AIコンシェルジュ」です。

あなたの役割は、
・Webサイト訪問者の質問に答えること
・商品・サービス・利用方法を案内すること
・利用可能な時間帯や対応範囲を正確に伝えること
です。

以下の【運用設定】を必ず最優先で参照し、
現在時刻と照合したうえで、適切な返答を行ってください。

────────────
【運用設定】
・ブランド／店舗名：{{BRAND_NAME}}
・タイムゾーン：Asia/Tokyo
・現在時刻：{{CURRENT_TIME_PLACEHOLDER}}

■ 有人対応（人が対応する業務）
・有人対応時間：{{OPEN_HOUR}}:00 〜 {{CLOSE_HOUR}}:00（ラストオーダー {{LAST_ORDER}}）
・休業日：なし
・対応チャネル：店舗・電話（{{PHONE}}）

■ オンライン対応（Web上で完結する対応）
・オンライン対応モード：24H
・オンラインで可能なこと：商品案内／FAQ回答／おしゃべり／**来店予約リクエスト受付**
・オンラインで不可なこと：実際の注文決済（カート機能未実装のため）

────────────
【重要ルール】

1. 「来店予約」に関しては、「チャット画面上の【来店予約】ボタン、またはメニューからご予約いただけます」と案内してください。
   ※ あなた自身が予約を受け付けるのではなく、フォームへの入力を促してください。
2. 有人対応時間外でも、オンライン対応が24Hの場合は
   ・商品やサービスの案内
   ・**予約リクエストの受付**
   は継続して行って構いません。
3. できないことは、ただ断るのではなく
   「次に取れる行動」を必ず提示してください。

────────────
【営業時間外の対応方針】

・営業時間外に「今すぐ来店できます」など誤解を与える表現は使用しない。
・深夜や早朝でも、オンライン対応が可能な内容については落ち着いたトーンで案内する。
・人が対応しているような誤認を与えない。

────────────
【禁止事項】

・営業時間、対応内容、価格、キャンペーンの捏造
・設定情報と矛盾する案内
・営業時間外に注文や来店を強く促す表現

────────────
【会話スタイル】

・丁寧で親しみやすい
・結論 → 理由 → 次の行動 の順で簡潔に
・汎用的な店舗スタッフらしい自然な接客口調
・絵文字は控えめに使用してOK

========================
■ 情報源と優先順位
========================
1. 【現在表示中のページ情報】として渡されるJSON
   - ここに書かれたメニュー一覧（name / description / price）を「唯一の正解」とみなしてください。
   - **必ずJSONに含まれる商品名だけ**を使ってください。
2. 必要に応じて、一般的なハンバーガーショップの知識で説明文を少し補足するのはOKです
   （ただし、存在しないメニュー名は絶対に作らないこと）。

- 外部サイトの商品を案内しないでください。
- 分からない場合は「このメニューにはその情報がありません」と正直に伝えてください。

========================
■ ユーザープロファイルの利用
========================
{{USER_PROFILE_PLACEHOLDER}}

- これまでの会話から分かっている好みを、さりげなく提案に反映してください。
- 「データによると〜」のような内部情報の存在を明示する言い方はせず、
  「前にポテトがお好きとおっしゃっていたので〜」のように自然な言い回しにしてください。

========================
■ プロファイル更新（隠しメモ）
========================
会話の中からユーザーの好みが分かった場合、応答テキストの末尾に、
次の形式で「差分情報（PROFILE_DELTA）」を**こっそり**追加してください。
[[PROFILE_DELTA:
{
  "likes_fries": true,
  "likes_spicy": false,
  "preferred_drink": "コーラ",
  "is_health_conscious": true
}
]]
ルール：
- 更新したい項目だけを含めてください。
- 分からない項目は書かないでください（推測で true/false を入れないこと）。
- JSONの中にコメントを書かないでください。
- PROFILE_DELTA ブロックは、通常の会話文と製品JSONブロックの「後ろ」に置いてください。

========================
■ 製品推薦とJSON出力ルール
========================
ユーザーが具体的にメニューを選びたい状況のときは、次の2つをセットで返してください。
1. 会話文（2〜3文で、ユーザーの好みにふれつつ、おすすめ理由を簡潔に）
2. 製品リストJSON（会話文の後ろに ```json ... ``` で囲んで出力、最大3件程度）

```json
{
  "products": [
    {
      "id": "任意のID",
      "name": "商品名（ページJSONのnameと完全一致させる）",
      "price": "価格",
      "description": "簡単な説明",
      "imageUrl": "",
      "tags": ["辛口", "ヘルシー"],
      "detailText": "モーダルに表示する少し詳しい説明文"
    }
  ]
}
```

- name は、必ず【現在表示中のページ情報】に含まれるメニュー名と完全一致させてください。
- imageUrl は、分からなければ空文字 "" のままで構いません（システム側で埋めます）。

========================
■ その他の注意
========================
- 雑談だけのときは、無理に商品を出さず、自然な一言返し＋様子をうかがう程度にしてください。
- ページ情報にないことは正直に「確認できません」と伝えて構いません。
"#;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://").expect("valid regex"))
}

/// Render a timestamp the way a Japanese locale prints Tokyo time:
/// `2026/10/17 9:05:00`.
pub fn format_japan_time(now: DateTime<Utc>) -> String {
    to_japan_time(now).format("%Y/%-m/%-d %-H:%M:%S").to_string()
}

/// The instant as Tokyo wall-clock time
pub fn to_japan_time(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&jst)
}

/// Profile section of the prompt
pub fn profile_prompt_text(profile: &UserProfile) -> String {
    let mut lines = vec![format!("- 訪問回数: {}回", profile.visit_count)];

    if let Some(likes_fries) = profile.likes_fries {
        lines.push(format!("- ポテト好き: {}", if likes_fries { "はい" } else { "いいえ" }));
    }
    if let Some(likes_spicy) = profile.likes_spicy {
        lines.push(format!("- 辛いもの: {}", if likes_spicy { "好き" } else { "苦手" }));
    }
    if let Some(drink) = profile.preferred_drink.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("- 好みのドリンク: {}", drink));
    }
    if let Some(healthy) = profile.is_health_conscious {
        lines.push(format!("- ヘルシー志向: {}", if healthy { "はい" } else { "いいえ" }));
    }

    if profile.has_no_preferences() {
        return "【ユーザープロファイル】\n特に情報なし（初対面に近い）".to_string();
    }
    format!("【ユーザープロファイル（以前の会話の記憶）】\n{}", lines.join("\n"))
}

/// True when the turn's text contains an http(s) URL
pub fn mentions_url(text: &str) -> bool {
    url_re().is_match(text)
}

/// Builds the full system prompt for one request
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
}

impl PromptAssembler {
    /// Default persona template filled with the store settings
    pub fn new(settings: &WidgetSettings) -> Self {
        let template = SYSTEM_PROMPT_TEMPLATE
            .replace("{{BRAND_NAME}}", &settings.brand_name)
            .replace("{{OPEN_HOUR}}", &settings.hours.open.to_string())
            .replace("{{CLOSE_HOUR}}", &settings.hours.close.to_string())
            .replace("{{LAST_ORDER}}", &settings.hours.last_order)
            .replace("{{PHONE}}", &settings.phone);
        Self { template }
    }

    /// Use a custom template verbatim
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Assemble the prompt: profile and time substituted, page context
    /// appended unless the latest turn carries a URL, image hint appended
    /// when an image accompanies the request.
    pub fn build(
        &self,
        history: &[ConversationTurn],
        profile: &UserProfile,
        page: Option<&dyn PageContentProvider>,
        now: DateTime<Utc>,
        has_image: bool,
    ) -> String {
        let latest = history.last().map(ConversationTurn::text).unwrap_or("");

        let mut prompt = self
            .template
            .replacen(USER_PROFILE_PLACEHOLDER, &profile_prompt_text(profile), 1)
            .replacen(CURRENT_TIME_PLACEHOLDER, &format_japan_time(now), 1);

        if !mentions_url(latest) {
            if let Some(context) = page.and_then(collect_page_context) {
                match serde_json::to_string_pretty(&context) {
                    Ok(json) => {
                        prompt.push_str(PAGE_CONTEXT_HEADER);
                        prompt.push_str(&json);
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize page context"),
                }
            }
        }

        if has_image {
            prompt.push_str(IMAGE_INPUT_HINT);
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MenuCard, StaticPage};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 0, 5, 9).unwrap()
    }

    fn menu_page() -> StaticPage {
        StaticPage {
            title: Some("Miryu Burger".to_string()),
            menu_cards: vec![MenuCard {
                title: Some("ミリューバーガー".to_string()),
                price: Some("¥880".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn time_is_rendered_in_japan() {
        assert_eq!(format_japan_time(now()), "2026/10/17 9:05:09");
    }

    #[test]
    fn first_visit_profile_text() {
        let text = profile_prompt_text(&UserProfile::default());
        assert_eq!(text, "【ユーザープロファイル】\n特に情報なし（初対面に近い）");

        // Returning visitor with only an empty drink recorded
        let profile = UserProfile {
            visit_count: 3,
            preferred_drink: Some(String::new()),
            ..Default::default()
        };
        assert!(profile.has_no_preferences());
        assert_eq!(profile_prompt_text(&profile), text);
    }

    #[test]
    fn known_preferences_are_listed() {
        let profile = UserProfile {
            likes_fries: Some(true),
            likes_spicy: Some(false),
            preferred_drink: Some("コーラ".to_string()),
            visit_count: 4,
            ..Default::default()
        };
        assert_eq!(
            profile_prompt_text(&profile),
            "【ユーザープロファイル（以前の会話の記憶）】\n- 訪問回数: 4回\n- ポテト好き: はい\n- 辛いもの: 苦手\n- 好みのドリンク: コーラ"
        );
    }

    #[test]
    fn placeholders_and_page_context_are_filled() {
        let assembler = PromptAssembler::new(&WidgetSettings::default());
        let page = menu_page();
        let history = vec![ConversationTurn::user("おすすめは？")];

        let prompt = assembler.build(&history, &UserProfile::default(), Some(&page), now(), false);
        assert!(!prompt.contains(CURRENT_TIME_PLACEHOLDER));
        assert!(!prompt.contains(USER_PROFILE_PLACEHOLDER));
        assert!(prompt.contains("・ブランド／店舗名：Miryu Burger"));
        assert!(prompt.contains("・現在時刻：2026/10/17 9:05:09"));
        assert!(prompt.contains("【現在表示中のページ情報（優先参照）】"));
        assert!(prompt.contains("  \"siteName\": \"Miryu Burger\""));
        assert!(!prompt.contains("【画像入力】"));
    }

    #[test]
    fn url_in_latest_turn_suppresses_page_context() {
        let assembler = PromptAssembler::new(&WidgetSettings::default());
        let page = menu_page();
        let history = vec![ConversationTurn::user("https://example.com のこれは？")];

        let prompt = assembler.build(&history, &UserProfile::default(), Some(&page), now(), true);
        assert!(!prompt.contains("【現在表示中のページ情報（優先参照）】"));
        assert!(prompt.ends_with(IMAGE_INPUT_HINT));
    }

    #[test]
    fn empty_page_omits_context_section() {
        let assembler = PromptAssembler::new(&WidgetSettings::default());
        let page = StaticPage::default();
        let prompt = assembler.build(&[], &UserProfile::default(), Some(&page), now(), false);
        assert!(!prompt.contains(PAGE_CONTEXT_HEADER));

        let expected = assembler
            .template()
            .replacen(USER_PROFILE_PLACEHOLDER, &profile_prompt_text(&UserProfile::default()), 1)
            .replacen(CURRENT_TIME_PLACEHOLDER, &format_japan_time(now()), 1);
        assert_eq!(prompt, expected);
    }

    #[test]
    fn template_without_placeholders_is_left_alone() {
        let assembler = PromptAssembler::with_template("固定プロンプト");
        let prompt = assembler.build(&[], &UserProfile::default(), None, now(), false);
        assert_eq!(prompt, "固定プロンプト");
    }
}
