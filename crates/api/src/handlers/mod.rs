//! REST-Handler Module

pub mod buttons;
pub mod presentations;
pub mod rooms;

use crate::error::ApiError;

/// Prueft ein Pflichtfeld im Request-Body
pub(crate) fn pflichtfeld<'a>(wert: &'a str, name: &str) -> Result<&'a str, ApiError> {
    let wert = wert.trim();
    if wert.is_empty() {
        return Err(ApiError::ungueltig(format!("{name} ist erforderlich")));
    }
    Ok(wert)
}
