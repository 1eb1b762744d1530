/*!
 * Out-of-Memory Diagnostics
 * Stable message templates scraped by operational tooling
 */

use crate::core::types::Size;

/// OOM message for backends that keep statistics
pub fn oom_message(kind: &str, left: Size, need: Size, flag: &str) -> String {
    format!(
        "not enough free {kind} memory ({left} bytes left, need {need}), \
         please increase the \"-{flag}\" command line parameter!"
    )
}

/// OOM message for backends without statistics
pub fn oom_nostats_message(kind: &str, need: Size, flag: &str) -> String {
    format!(
        "not enough free {kind} memory (need {need}), please increase the \"-{flag}\" \
         command line parameter!"
    )
}
