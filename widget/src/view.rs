//! Rendering seam between the controller and a concrete UI.

use crate::products::ProductCardData;
use crate::reservation::ReservationForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Bot,
}

/// One chat row: a bubble plus the product cards attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    pub products: Vec<ProductCardData>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            products: Vec::new(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Bot,
            text: text.into(),
            products: Vec::new(),
        }
    }

    pub fn with_products(mut self, products: Vec<ProductCardData>) -> Self {
        self.products = products;
        self
    }
}

/// Controls whose appearance follows the session flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Avatar,
    Transparency,
    Tts,
    Microphone,
    ChatWindow,
    CameraPreview,
    ThemePicker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlState {
    /// Toggle on (or window shown)
    Active,
    Inactive,
    /// Unusable; the tooltip explains why
    Disabled { tooltip: String },
}

impl ControlState {
    pub fn from_flag(active: bool) -> Self {
        if active {
            ControlState::Active
        } else {
            ControlState::Inactive
        }
    }
}

/// What a chat front-end has to be able to draw.
///
/// There is a single loading row: showing it again replaces it, removing it
/// when absent does nothing.
pub trait ChatView: Send {
    fn add_message(&mut self, message: &ChatMessage);

    fn show_loading(&mut self, text: &str);

    fn remove_loading(&mut self);

    fn show_product_detail(&mut self, product: &ProductCardData);

    fn show_reservation_form(&mut self, form: &ReservationForm);

    fn disable_reservation_form(&mut self);

    /// Blocking notice outside the chat flow
    fn alert(&mut self, message: &str);

    fn set_control(&mut self, control: Control, state: ControlState);

    /// Repaint the widget in the given CSS colour
    fn set_theme_color(&mut self, color: &str);
}
