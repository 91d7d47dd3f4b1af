//! Conversation state machine and per-flow payloads.
//!
//! The state space is a tagged union: each multi-turn flow owns its own step
//! enum and data payload, joined under a top-level `SessionState`. Only the
//! `FlowData` variant matching the flow that owns the current state is
//! meaningful at any time; everything else is `FlowData::None`.

use serde::{Deserialize, Serialize};

/// Registration flow steps (shop owner signing up on the admin bot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStep {
    Name,
    Phone,
    Email,
    City,
    Confirm,
}

/// Shop-setup flow steps (owner creating a new storefront).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopSetupStep {
    Name,
    Description,
    BotToken,
    Address,
    WorkingHours,
    Confirm,
}

/// Shop management steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopStep {
    EditName,
    EditDescription,
}

/// Product creation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStep {
    Name,
    Price,
}

/// Category creation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryStep {
    Name,
}

/// Checkout flow steps (customer placing an order on a tenant bot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStep {
    Address,
    Phone,
    Confirm,
}

/// Settings flow steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsStep {
    Language,
    Notifications,
}

/// Position of a conversation in the state machine.
///
/// `MainMenu` is the quiescent resting state most flows return to; `New` is
/// the initial state of a freshly created session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    New,
    MainMenu,
    SettingsMenu,
    Registration(RegistrationStep),
    ShopSetup(ShopSetupStep),
    Shop(ShopStep),
    Product(ProductStep),
    Category(CategoryStep),
    Order(OrderStep),
    Settings(SettingsStep),
}

impl SessionState {
    /// True for states owned by some multi-turn flow (anything that is not a
    /// menu resting state).
    pub fn in_flow(&self) -> bool {
        !matches!(self, SessionState::New | SessionState::MainMenu | SessionState::SettingsMenu)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::New
    }
}

/// Fields collected by the registration flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
}

/// Fields collected by the shop-setup flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSetupData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub bot_token: Option<String>,
    pub address: Option<String>,
    pub working_hours: Option<String>,
}

/// Draft of a product being created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub shop_id: i64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
}

/// Draft of a category being created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub shop_id: i64,
}

/// Checkout data collected before an order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Variant payload for whichever flow currently owns the session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowData {
    #[default]
    None,
    Registration(RegistrationData),
    ShopSetup(ShopSetupData),
    Product(ProductDraft),
    Category(CategoryDraft),
    Order(OrderDraft),
}

impl FlowData {
    pub fn as_registration_mut(&mut self) -> Option<&mut RegistrationData> {
        match self {
            FlowData::Registration(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_shop_setup_mut(&mut self) -> Option<&mut ShopSetupData> {
        match self {
            FlowData::ShopSetup(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_product_mut(&mut self) -> Option<&mut ProductDraft> {
        match self {
            FlowData::Product(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn as_order_mut(&mut self) -> Option<&mut OrderDraft> {
        match self {
            FlowData::Order(draft) => Some(draft),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_json_round_trip() {
        let states = [
            SessionState::New,
            SessionState::MainMenu,
            SessionState::Registration(RegistrationStep::Phone),
            SessionState::ShopSetup(ShopSetupStep::BotToken),
            SessionState::Order(OrderStep::Confirm),
        ];

        for state in states {
            let json = serde_json::to_string(&state).unwrap();
            let back: SessionState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
    }

    #[test]
    fn menu_states_are_not_flows() {
        assert!(!SessionState::New.in_flow());
        assert!(!SessionState::MainMenu.in_flow());
        assert!(SessionState::Registration(RegistrationStep::Name).in_flow());
        assert!(SessionState::Order(OrderStep::Address).in_flow());
    }
}
