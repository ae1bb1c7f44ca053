//! User-facing notices for finished actions. Failures are classified by
//! error kind only, never by message text.

use shared::error::ErrorKind;

use crate::error::{ClientError, RemoteError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionContext {
    AddRestaurant,
    AddSocial,
    UpdateSocial,
    DeleteSocial,
    Review,
    Login,
    Register,
    Logout,
    Load,
}

impl ActionContext {
    fn subject(self) -> &'static str {
        match self {
            Self::AddRestaurant => "Restaurant",
            Self::AddSocial | Self::UpdateSocial | Self::DeleteSocial => "Social",
            Self::Review => "Review",
            Self::Login | Self::Register | Self::Logout => "Account",
            Self::Load => "Resource",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        variant: NotificationVariant,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant,
        }
    }

    fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NotificationVariant::Destructive)
    }

    pub fn success(context: ActionContext) -> Self {
        let (title, description) = match context {
            ActionContext::AddRestaurant => {
                ("Restaurant added", "Restaurant has been added successfully")
            }
            ActionContext::AddSocial => ("Success", "Social added successfully"),
            ActionContext::UpdateSocial => ("Success", "Social updated successfully"),
            ActionContext::DeleteSocial => ("Success", "Social deleted successfully"),
            ActionContext::Review => ("Success", "Your review has been saved"),
            ActionContext::Login => ("Welcome back", "You are now signed in"),
            ActionContext::Register => ("Account created", "You can now sign in"),
            ActionContext::Logout => ("Signed out", "See you next time"),
            ActionContext::Load => ("Success", "Loaded"),
        };
        Self::new(title, description, NotificationVariant::Default)
    }

    pub fn from_remote(context: ActionContext, error: &RemoteError) -> Self {
        match (context, error.kind) {
            (ActionContext::AddRestaurant, ErrorKind::AlreadyExists) => Self::error(
                "Restaurant already exists",
                "Restaurant with the same name already exists",
            ),
            (ActionContext::AddRestaurant, _) => Self::error(
                "Failed to add restaurant",
                "An error occurred while adding the restaurant",
            ),
            (_, ErrorKind::AlreadyExists) => {
                Self::error("Error", format!("{} already exists", subject(context, error)))
            }
            (ActionContext::Login, ErrorKind::NotAuthenticated) => {
                Self::error("Error", "Invalid username or password")
            }
            (_, ErrorKind::NotAuthenticated) => Self::error("Error", "You are not authenticated"),
            (_, ErrorKind::NotFound) => {
                Self::error("Error", format!("{} not found", subject(context, error)))
            }
            (_, ErrorKind::Unknown) => Self::error("Error", "An error occurred"),
        }
    }

    pub fn from_validation(errors: &[ValidationError]) -> Self {
        let description = errors
            .first()
            .map(|err| err.message.clone())
            .unwrap_or_else(|| "Please check the form".to_string());
        Self::error("Invalid input", description)
    }

    pub fn from_client_error(context: ActionContext, error: &ClientError) -> Self {
        match error {
            ClientError::Validation(errors) => Self::from_validation(errors),
            ClientError::Remote(err) => Self::from_remote(context, err),
        }
    }

    /// Whether the caller should send the user back to sign in.
    pub fn requires_reauth(error: &RemoteError) -> bool {
        error.is_kind(ErrorKind::NotAuthenticated)
    }
}

/// Resource named by the error code (`DISH_REVIEW` reads "Dish review"),
/// else the action's own subject.
fn subject(context: ActionContext, error: &RemoteError) -> String {
    let Some(resource) = error.resource() else {
        return context.subject().to_string();
    };
    let words = resource.to_ascii_lowercase().replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => context.subject().to_string(),
    }
}
