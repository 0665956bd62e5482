// ── User-facing error mapping ──
//
// Fetch failures never cross the cache boundary as `Err`: they become
// the `error` string on the cached page, which UI consumers display
// as-is. This module owns the api-error → display-string mapping.

pub use tixly_api::Error as ApiError;

/// Shown when the request never produced a response (network down,
/// connection refused, timeout).
pub const NO_RESPONSE_MESSAGE: &str = "No response from server";

/// Shown for anything unclassifiable (malformed response, programming
/// error in the calling layer). Never left unset -- consumers branch on
/// the error being present.
pub const FALLBACK_MESSAGE: &str = "Unable to send request";

/// Map a gateway or channel error to the string a consumer displays.
///
/// A structured server failure carries its own human-readable message
/// and is surfaced verbatim; everything else collapses to one of the
/// two fixed strings above.
pub fn user_message(err: &ApiError) -> String {
    if err.is_no_response() {
        return NO_RESPONSE_MESSAGE.to_owned();
    }
    match err {
        ApiError::Server { message, .. } => message.clone(),
        // Remaining transport failures (e.g. the connection dropped
        // mid-body) never yielded a usable response either.
        ApiError::Transport(_) => NO_RESPONSE_MESSAGE.to_owned(),
        _ => FALLBACK_MESSAGE.to_owned(),
    }
}
