#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use concierge_ipc::chat_request::ChatProxyRequest;
use concierge_widget::products::ProductCardData;
use concierge_widget::reservation::ReservationForm;
use concierge_widget::transport::{ChatTransport, TransportError};
use concierge_widget::view::{ChatMessage, ChatView, Control, ControlState};
use serde_json::{json, Value};

/// Transport answering from a script, recording what it was sent
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    pub requests: Mutex<Vec<ChatProxyRequest>>,
}

impl ScriptedTransport {
    pub fn replying(texts: &[&str]) -> Arc<Self> {
        let transport = Self::default();
        for text in texts {
            transport.push_body(candidate(text));
        }
        Arc::new(transport)
    }

    pub fn push_body(&self, body: Value) {
        self.replies.lock().unwrap().push_back(Ok(body));
    }

    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ChatProxyRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &ChatProxyRequest) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }
}

pub fn candidate(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

#[derive(Debug, Default)]
pub struct ViewLog {
    pub messages: Vec<ChatMessage>,
    pub loading: Option<String>,
    pub details: Vec<ProductCardData>,
    pub forms: Vec<ReservationForm>,
    pub form_disabled: bool,
    pub alerts: Vec<String>,
    pub controls: Vec<(Control, ControlState)>,
    pub theme_colors: Vec<String>,
}

impl ViewLog {
    pub fn texts(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.text.clone()).collect()
    }

    pub fn last_message(&self) -> &ChatMessage {
        self.messages.last().unwrap()
    }

    pub fn control(&self, control: Control) -> Option<ControlState> {
        self.controls
            .iter()
            .rev()
            .find(|(c, _)| *c == control)
            .map(|(_, state)| state.clone())
    }
}

/// View writing into a shared log the test keeps a handle on
#[derive(Clone, Default)]
pub struct RecordingView {
    pub log: Arc<Mutex<ViewLog>>,
}

impl ChatView for RecordingView {
    fn add_message(&mut self, message: &ChatMessage) {
        self.log.lock().unwrap().messages.push(message.clone());
    }

    fn show_loading(&mut self, text: &str) {
        self.log.lock().unwrap().loading = Some(text.to_string());
    }

    fn remove_loading(&mut self) {
        self.log.lock().unwrap().loading = None;
    }

    fn show_product_detail(&mut self, product: &ProductCardData) {
        self.log.lock().unwrap().details.push(product.clone());
    }

    fn show_reservation_form(&mut self, form: &ReservationForm) {
        self.log.lock().unwrap().forms.push(form.clone());
    }

    fn disable_reservation_form(&mut self) {
        self.log.lock().unwrap().form_disabled = true;
    }

    fn alert(&mut self, message: &str) {
        self.log.lock().unwrap().alerts.push(message.to_string());
    }

    fn set_control(&mut self, control: Control, state: ControlState) {
        self.log.lock().unwrap().controls.push((control, state));
    }

    fn set_theme_color(&mut self, color: &str) {
        self.log.lock().unwrap().theme_colors.push(color.to_string());
    }
}
