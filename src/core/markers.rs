// Marker matching shared by the failure classifiers.
//
// Both the AI flow gateway and the calendar importer turn vendor error text into
// one of a handful of outcome kinds by looking for known substrings. Keeping the
// matching here means the marker lists are the only thing each classifier owns.

/// Returns true when `haystack` contains any of `markers`, ignoring ASCII case.
///
/// Markers are expected to be lowercase already.
pub fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}
