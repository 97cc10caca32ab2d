use std::collections::HashMap;
use std::time::Duration;

use colored::*;
use concierge_widget::products::ProductCardData;
use concierge_widget::reservation::{ReservationForm, PARTY_SIZES, TIME_SLOTS};
use concierge_widget::theme::THEME_PALETTE;
use concierge_widget::view::{ChatMessage, ChatView, Control, ControlState, MessageRole};
use indicatif::{ProgressBar, ProgressStyle};

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn control_label(control: Control) -> &'static str {
    match control {
        Control::Avatar => "avatar",
        Control::Transparency => "transparency",
        Control::Tts => "voice output",
        Control::Microphone => "microphone",
        Control::ChatWindow => "chat window",
        Control::CameraPreview => "camera",
        Control::ThemePicker => "colour picker",
    }
}

/// Draws the conversation on a terminal.
///
/// Control and theme changes are announced only after the first state has
/// been seen, so startup does not print every toggle.
#[derive(Default)]
pub struct TerminalView {
    spinner: Option<ProgressBar>,
    controls: HashMap<Control, ControlState>,
    echo_user: bool,
    theme_color: Option<String>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the visitor's own messages too (off when they were typed at
    /// the prompt)
    pub fn with_user_echo(mut self, echo_user: bool) -> Self {
        self.echo_user = echo_user;
        self
    }
}

pub fn format_product_card(product: &ProductCardData) -> String {
    let mut line = format!(
        "  [{}] {} {}",
        product.id.dimmed(),
        product.name.bold(),
        product.price.yellow()
    );
    if !product.description.is_empty() {
        line.push_str(&format!("\n      {}", product.description));
    }
    if !product.tags.is_empty() {
        line.push_str(&format!("\n      #{}", product.tags.join(" #").cyan()));
    }
    line
}

impl ChatView for TerminalView {
    fn add_message(&mut self, message: &ChatMessage) {
        match message.role {
            MessageRole::User => {
                if self.echo_user {
                    println!("{}: {}", "You".green().bold(), message.text);
                }
            }
            MessageRole::Bot => {
                println!("{}: {}", "Concierge".blue().bold(), message.text);
            }
        }
        for product in &message.products {
            println!("{}", format_product_card(product));
        }
        if !message.products.is_empty() {
            println!("  {}", "/detail <id> で詳細を表示".dimmed());
        }
    }

    fn show_loading(&mut self, text: &str) {
        self.remove_loading();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(text.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(spinner);
    }

    fn remove_loading(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn show_product_detail(&mut self, product: &ProductCardData) {
        println!("{}", "─".repeat(40).dimmed());
        println!("{}  {}", product.name.bold(), product.price.yellow());
        if !product.image_url.is_empty() {
            println!("{}", product.image_url.dimmed());
        }
        if !product.tags.is_empty() {
            println!("#{}", product.tags.join(" #").cyan());
        }
        println!("{}", product.detail_body());
        println!("{}", "─".repeat(40).dimmed());
    }

    fn show_reservation_form(&mut self, form: &ReservationForm) {
        println!("{}", "予約フォーム".green().bold());
        println!("  日付:   YYYY-MM-DD");
        println!("  時間:   {} (既定: {})", TIME_SLOTS.join(" / "), form.time);
        println!("  人数:   {} (既定: {})", PARTY_SIZES.join(" / "), form.party_size);
        println!("  お名前: 任意の文字列");
        println!(
            "  {}",
            "/book <日付> <時間> <人数> <お名前> で送信".cyan()
        );
    }

    fn disable_reservation_form(&mut self) {
        println!("{}", "（予約フォームは送信済みです）".dimmed());
    }

    fn alert(&mut self, message: &str) {
        self.remove_loading();
        println!("{} {}", "!".yellow().bold(), message.yellow());
    }

    fn set_theme_color(&mut self, color: &str) {
        if self.theme_color.replace(color.to_string()).is_some() {
            println!("{}", format!("[theme {}]", color).dimmed());
        }
    }

    fn set_control(&mut self, control: Control, state: ControlState) {
        let previous = self.controls.insert(control, state.clone());
        if previous.is_none() || previous.as_ref() == Some(&state) {
            return;
        }
        let label = control_label(control);
        match state {
            ControlState::Active => println!("{}", format!("[{} on]", label).dimmed()),
            ControlState::Inactive => println!("{}", format!("[{} off]", label).dimmed()),
            ControlState::Disabled { tooltip } => {
                println!("{}", format!("[{} unavailable: {}]", label, tooltip).dimmed())
            }
        }
    }
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "concierge \"your message\"".green().bold());
    println!("    Send a single message to the concierge");
    println!();
    println!("  {}", "concierge -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --page <FILE>         Page description (TOML or JSON)");
    println!("  --proxy-url <URL>     Chat proxy endpoint");
    println!("  --storage-dir <DIR>   Where the visitor profile is kept");
    println!("  --help                Show this help message");
    println!();
}

pub fn print_theme_palette() {
    for (index, color) in THEME_PALETTE.iter().enumerate() {
        println!("  {} {}", (index + 1).to_string().cyan(), color);
    }
    println!("  {}", "/theme <番号|色> で選択".dimmed());
}

pub fn print_chat_commands() {
    println!("{}", "Commands:".cyan());
    println!("  /reserve /recommend /faq       Quick actions");
    println!("  /book <date> <time> <pax> <name>  Submit the reservation form");
    println!("  /detail <id>                   Show a product");
    println!("  /camera <png-file>             Send a photo");
    println!("  /tts /avatar /transparent      Toggle settings");
    println!("  /theme [colour]                Show the palette or pick a colour");
    println!("  /reset                         Forget your preferences");
    println!("  /quit                          Leave");
    println!();
}
