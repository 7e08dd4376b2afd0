/*!
 * Internationalization
 * Supported locales and request locale negotiation
 */
pub mod overlay;

use axum::{extract::FromRequestParts, extract::Query, http::request::Parts};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;

pub use overlay::{
    apply_translations, localize, translations_after_edit, upsert_translations, Localizable,
    Translations,
};

/// Cookie the public site stores the visitor's locale in.
pub const LOCALE_COOKIE: &str = "locale";

/// Locales the site is published in.
///
/// The default locale's content lives in base columns; every other locale
/// is an overlay stored under `translations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub const DEFAULT: Locale = Locale::En;
    pub const ALL: &'static [Locale] = &[Locale::En, Locale::Ar];

    pub const fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    /// Text direction for the locale.
    pub const fn direction(self) -> &'static str {
        match self {
            Locale::En => "ltr",
            Locale::Ar => "rtl",
        }
    }

    pub fn is_default(self) -> bool {
        self == Locale::DEFAULT
    }

    /// Parses a locale tag, case-insensitively and ignoring region subtags
    /// (`ar-EG` is `ar`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Locale::En),
            "ar" => Some(Locale::Ar),
            _ => None,
        }
    }

    /// Parses an optional `lang` value, falling back to the default locale.
    pub fn from_param(value: Option<&str>) -> Self {
        value.and_then(Locale::parse).unwrap_or(Locale::DEFAULT)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_locale_supported(value: &str) -> bool {
    Locale::parse(value).is_some()
}

#[derive(Debug, Default, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Locale resolved for the current request: `lang` query parameter first,
/// then the `locale` cookie, then the default locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl RequestLocale {
    pub fn negotiate(query_lang: Option<&str>, cookie_locale: Option<&str>) -> Self {
        let locale = query_lang
            .and_then(Locale::parse)
            .or_else(|| cookie_locale.and_then(Locale::parse))
            .unwrap_or(Locale::DEFAULT);
        RequestLocale(locale)
    }
}

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<LangQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(LOCALE_COOKIE).map(|c| c.value().to_string());

        Ok(RequestLocale::negotiate(
            query.lang.as_deref(),
            cookie.as_deref(),
        ))
    }
}
