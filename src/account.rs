/// Login and registration form handling

use crate::api::{RegisterRequest, TabApi};
use crate::error::{Error, Result};
use log::info;
use regex::Regex;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Trimmed username and raw password, or the message to show
    pub fn validate(&self) -> Result<(String, String)> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            return Err(Error::Validation(
                "Please enter both username and password".to_string(),
            ));
        }
        Ok((username.to_string(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterForm {
    pub name: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterForm> {
        let form = RegisterForm {
            name: self.name.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            email: self.email.trim().to_string(),
        };

        if form.name.is_empty()
            || form.username.is_empty()
            || form.password.is_empty()
            || form.email.is_empty()
        {
            return Err(Error::Validation("All fields are required".to_string()));
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }
        if !email_pattern().is_match(&form.email) {
            return Err(Error::Validation("Please enter a valid email address".to_string()));
        }
        Ok(form)
    }

    pub async fn submit(&self, api: &dyn TabApi) -> Result<String> {
        let form = self.validate()?;
        let message = api
            .register(&RegisterRequest {
                name: &form.name,
                username: &form.username,
                password: &form.password,
                email: &form.email,
            })
            .await?;
        info!("Registered user {}", form.username);
        Ok(message)
    }
}
