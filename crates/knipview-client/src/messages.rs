use knipview_foundation::errors::kinds;
use knipview_foundation::KnipviewError;

/// One line suitable for showing to a user
///
/// Dispatches on [`KnipviewError::kind`] so errors rebuilt from the wire map
/// the same way as local ones.
pub fn user_message(err: &KnipviewError) -> String {
    match err.kind() {
        kinds::ANALYZER_TIMEOUT | kinds::TRANSPORT_TIMEOUT => {
            "Analysis timed out. Try running 'npx knip' directly.".to_string()
        }
        kinds::CONNECTION => "Not connected to server".to_string(),
        _ => err.to_string(),
    }
}
