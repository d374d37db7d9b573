//! Loopback device selection.
//!
//! A loopback device captures whatever the system is currently playing.  The
//! rule is: take the default output device; if it is not itself loopback
//! capable, pick the first loopback-capable input whose name contains the
//! output device's name.  No match means no session.

/// Returns `true` for device names that denote a capture of an output.
///
/// Covers WASAPI-style `"[Loopback]"` names, PulseAudio/PipeWire monitor
/// sources, and virtual loopback drivers.
pub fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("loopback") || lower.contains("monitor of") || lower.ends_with(".monitor")
}

/// Index of the first loopback-capable candidate matching `output_name`.
pub fn find_loopback_match<'a, I>(output_name: &str, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .position(|name| is_loopback_name(name) && name.contains(output_name))
}
