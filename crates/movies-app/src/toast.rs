//! Toast notifications surviving a redirect.
//!
//! Messages are kept in a short lived cookie and taken out by the next page render.
use axum::extract::FromRequestParts;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{Cookie, Expiration, SameSite};
use http::{request::Parts, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tracing::{debug, error, warn};

pub const TOAST_COOKIE_NAME: &str = "movies_toast";
const TOAST_VALIDITY: time::Duration = time::Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

/// Request scoped notification sink
pub struct Toasts {
    cookies: Cookies,
}

impl<S> FromRequestParts<S> for Toasts
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state).await?;
        Ok(Toasts { cookies })
    }
}

impl Toasts {
    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Success notification: {message}");
        let mut pending = self.pending();
        pending.push(Toast {
            kind: ToastKind::Success,
            message,
        });
        match encode(&pending) {
            Ok(value) => {
                let cookie = Cookie::build((TOAST_COOKIE_NAME, value))
                    .http_only(true)
                    .path("/")
                    .same_site(SameSite::Lax)
                    .expires(Expiration::DateTime(
                        OffsetDateTime::now_utc() + TOAST_VALIDITY,
                    ))
                    .build();
                self.cookies.add(cookie);
            }
            Err(e) => error!("Failed to encode notifications: {e}"),
        }
    }

    /// Pending notifications, removes them from the client
    pub fn take(&self) -> Vec<Toast> {
        let pending = self.pending();
        if self.cookies.get(TOAST_COOKIE_NAME).is_some() {
            self.cookies
                .remove(Cookie::build((TOAST_COOKIE_NAME, "")).path("/").build());
        }
        pending
    }

    fn pending(&self) -> Vec<Toast> {
        self.cookies
            .get(TOAST_COOKIE_NAME)
            .map(|cookie| {
                decode(cookie.value()).unwrap_or_else(|e| {
                    warn!("Invalid notification cookie: {e}");
                    Vec::new()
                })
            })
            .unwrap_or_default()
    }
}

fn encode(toasts: &[Toast]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(toasts)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode(value: &str) -> anyhow::Result<Vec<Toast>> {
    let json = URL_SAFE_NO_PAD.decode(value)?;
    let toasts = serde_json::from_slice(&json)?;
    Ok(toasts)
}
