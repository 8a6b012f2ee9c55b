//! Shared helpers for WASM API operations
//!
//! Serialization, error conversion and validation used by every exported
//! method. Errors are logged to the browser console before they are handed
//! to JavaScript as strings.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ============================================================================
// Console Logging Functions
// ============================================================================

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn warn(s: &str);

    #[wasm_bindgen(js_namespace = console)]
    fn error(s: &str);
}

/// Log a warning message with [WASM] ⚠️ prefix
#[macro_export]
macro_rules! wasm_warn {
    ($($arg:tt)*) => {
        $crate::api::helpers::log_warn(&format!($($arg)*))
    };
}

/// Log an error message with [WASM] ❌ prefix
#[macro_export]
macro_rules! wasm_error {
    ($($arg:tt)*) => {
        $crate::api::helpers::log_error(&format!($($arg)*))
    };
}

pub fn log_warn(msg: &str) {
    warn(&format!("[WASM] ⚠️ {}", msg));
}

pub fn log_error(msg: &str) {
    error(&format!("[WASM] ❌ {}", msg));
}

// ============================================================================
// Serialization/Deserialization Helpers
// ============================================================================

/// Deserialize a value from JavaScript with automatic error handling
pub fn deserialize<T: DeserializeOwned>(value: JsValue, error_context: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| to_js_error(e, error_context))
}

/// Serialize a value to JavaScript as plain objects (no `Map`s)
pub fn serialize<T: Serialize>(value: &T, error_context: &str) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| to_js_error(e, error_context))
}

// ============================================================================
// Result Conversion Helpers
// ============================================================================

/// Log an error and convert it to a JsValue
pub fn to_js_error(err: impl Display, error_context: &str) -> JsValue {
    let msg = format!("{}: {}", error_context, err);
    log_error(&msg);
    JsValue::from_str(&msg)
}

/// Convert a validation error to a JsValue
pub fn validation_error(msg: impl Into<String>) -> JsValue {
    let msg = msg.into();
    log_error(&msg);
    JsValue::from_str(&msg)
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a model-offset selection is non-empty and inside the slide
pub fn validate_selection_range(start: usize, end: usize, max_length: usize) -> Result<(), String> {
    if start >= end {
        return Err(format!("Invalid selection range: start {} >= end {}", start, end));
    }

    if end > max_length {
        return Err(format!("Selection end {} out of bounds (max: {})", end, max_length));
    }

    Ok(())
}

/// Milliseconds from JavaScript, or the current time when absent
pub fn timestamp_ms(now_ms: Option<f64>) -> u64 {
    let now = now_ms.unwrap_or_else(js_sys::Date::now);
    if now.is_finite() && now > 0.0 {
        now as u64
    } else {
        0
    }
}
