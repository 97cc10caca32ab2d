use concierge_core::config::WidgetConfig as CoreWidgetConfig;
use serde::{Deserialize, Serialize};

use crate::theme::DEFAULT_THEME_COLOR;

/// Staffed business hours, in Japan local time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    /// Opening hour (inclusive)
    pub open: u32,
    /// Closing hour (exclusive)
    pub close: u32,
    /// Last order, displayed only
    pub last_order: String,
}

impl BusinessHours {
    /// `open <= hour < close`; minutes are not considered
    pub fn is_open_at(&self, hour: u32) -> bool {
        hour >= self.open && hour < self.close
    }
}

/// Fully resolved widget settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetSettings {
    pub brand_name: String,
    /// Used in the welcome message
    pub site_name: String,
    pub hours: BusinessHours,
    pub phone: String,
    pub off_hours_message: String,
    pub reservation_success_message: String,
    /// Prefix of every storage key the widget owns
    pub storage_namespace: String,
    /// Endpoint of the chat proxy
    pub proxy_url: String,
    /// Accent colour when the page does not declare a brand colour
    pub primary_color: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            brand_name: "Miryu Burger".to_string(),
            site_name: "Miryu Burger Demo".to_string(),
            hours: BusinessHours {
                open: 11,
                close: 22,
                last_order: "21:30".to_string(),
            },
            phone: "03-1234-5678".to_string(),
            off_hours_message: "申し訳ありません。現在は営業時間外（11:00〜22:00）のため、予約リクエストの受付のみ承ります。翌営業日にスタッフより確認のご連絡を差し上げます。".to_string(),
            reservation_success_message: "ご予約リクエストを承りました。\n※これはデモ画面です。実際の予約は確定していません。".to_string(),
            storage_namespace: "miryu_ai".to_string(),
            proxy_url: "http://127.0.0.1:8080/api/chat".to_string(),
            primary_color: DEFAULT_THEME_COLOR.to_string(),
        }
    }
}

impl From<&CoreWidgetConfig> for WidgetSettings {
    fn from(config: &CoreWidgetConfig) -> Self {
        let mut settings = Self::default();

        // Only overwrite if the fields are present in the core config
        if let Some(brand_name) = &config.brand_name {
            settings.brand_name = brand_name.clone();
        }
        if let Some(site_name) = &config.site_name {
            settings.site_name = site_name.clone();
        }
        if let Some(open) = config.open_hour {
            settings.hours.open = open;
        }
        if let Some(close) = config.close_hour {
            settings.hours.close = close;
        }
        if let Some(last_order) = &config.last_order {
            settings.hours.last_order = last_order.clone();
        }
        if let Some(phone) = &config.phone {
            settings.phone = phone.clone();
        }
        if let Some(message) = &config.off_hours_message {
            settings.off_hours_message = message.clone();
        }
        if let Some(message) = &config.reservation_success_message {
            settings.reservation_success_message = message.clone();
        }
        if let Some(namespace) = &config.storage_namespace {
            settings.storage_namespace = namespace.clone();
        }
        if let Some(proxy_url) = &config.proxy_url {
            settings.proxy_url = proxy_url.clone();
        }
        if let Some(color) = &config.primary_color {
            settings.primary_color = color.clone();
        }

        settings
    }
}
