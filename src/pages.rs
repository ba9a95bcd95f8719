//! HTML pages served around the login flow.
//!
//! Templates are compiled into the binary; `.html` names get HTML auto-escaping.

use minijinja::Environment;
use serde::Serialize;

use crate::session::Session;

pub const LOGIN_PAGE: &str = "login.html";
pub const CHAT_PAGE: &str = "chat.html";

/// Context handed to the chat page.
#[derive(Debug, Clone, Serialize)]
pub struct ChatContext<'a> {
    #[serde(rename = "Host")]
    pub host: &'a str,
    #[serde(rename = "UserData", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<&'a Session>,
}

/// Context handed to the login page.
#[derive(Debug, Clone, Serialize)]
pub struct LoginContext<'a> {
    #[serde(rename = "Host")]
    pub host: &'a str,
    #[serde(rename = "Provider")]
    pub provider: &'a str,
}

/// Template renderer shared by the page handlers.
#[derive(Debug)]
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    /// Load the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns a template syntax error if a built-in template fails to compile.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(LOGIN_PAGE, include_str!("../templates/login.html"))?;
        env.add_template(CHAT_PAGE, include_str!("../templates/chat.html"))?;
        Ok(Self { env })
    }

    /// Render a named template with `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or rendering fails.
    pub fn render<C: Serialize>(&self, name: &str, ctx: &C) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
