use serde::{Deserialize, Serialize};

/// Closed string-backed enums stored as TEXT columns.
macro_rules! labelled_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn parse(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenType {
    Login,
    Registration,
    Checkout,
    Settings,
    Search,
    Profile,
    Home,
    Form,
    List,
    Detail,
    Dialog,
    Unknown,
}

labelled_enum!(ScreenType {
    Login => "login",
    Registration => "registration",
    Checkout => "checkout",
    Settings => "settings",
    Search => "search",
    Profile => "profile",
    Home => "home",
    Form => "form",
    List => "list",
    Detail => "detail",
    Dialog => "dialog",
    Unknown => "unknown",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormContext {
    /// No editable fields on screen.
    None,
    Authentication,
    Registration,
    Payment,
    Address,
    Contact,
    Search,
    Feedback,
    /// Editable fields present, purpose not recognised.
    Unknown,
}

labelled_enum!(FormContext {
    None => "none",
    Authentication => "authentication",
    Registration => "registration",
    Payment => "payment",
    Address => "address",
    Contact => "contact",
    Search => "search",
    Feedback => "feedback",
    Unknown => "unknown",
});

/// Expected content of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTag {
    Email,
    Password,
    Phone,
    Number,
    Url,
    Date,
    Name,
    Search,
}

labelled_enum!(ValidationTag {
    Email => "email",
    Password => "password",
    Phone => "phone",
    Number => "number",
    Url => "url",
    Date => "date",
    Name => "name",
    Search => "search",
});

/// Scored guess at what a screen's form is for.
#[derive(Debug, Clone, PartialEq)]
pub struct FormIntent {
    pub context: FormContext,
    pub confidence: f32,
    pub signals: Vec<IntentSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntentSignal {
    Keyword(String),
    InputType(ValidationTag),
    ActionLabel(String),
}

/// Per-screen metadata for the command generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenContext {
    pub screen_type: ScreenType,
    pub form_context: FormContext,
    pub primary_action: Option<String>,
    pub navigation_level: u32,
}
