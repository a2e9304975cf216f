//! Anonymization transforms applied while copying accounts.
//!
//! Each transform is deterministic, so repeated runs over the same source
//! produce the same copy.

use sha2::{Digest, Sha256};

/// Suffix turning a login name into its synthetic email (`login_name || suffix`).
pub const EMAIL_SUFFIX: &str = "@weasyl.com";

/// Placeholder bcrypt hash stored for every copied account.
///
/// Deliberately public: every account in a copy shares this password.
pub const PLACEHOLDER_PASSWORD_HASH: &str =
    "$2a$12$qReI924/8pAsoHu6aRTX2ejyujAZ/9FiOOtrjczBIwf8wqXAJ22N.";

/// Profile config flags that can identify an account.
pub const PROFILE_CONFIG_MARKERS: [char; 3] = ['m', 'a', 'p'];

/// Replacement chosen for `username`: nothing, or one of the markers.
fn marker_choice(username: &str) -> Option<char> {
    let digest = Sha256::digest(username.as_bytes());
    match digest[0] % 4 {
        0 => None,
        n => Some(PROFILE_CONFIG_MARKERS[usize::from(n) - 1]),
    }
}

/// Mask the identifying flags in a profile config string.
///
/// The first marker character is replaced by a choice derived from a hash of
/// the username (possibly removing it). A config with no marker gets the
/// choice prepended. Every other flag is left in place.
pub fn mask_profile_config(username: &str, config: &str) -> String {
    let choice = marker_choice(username);

    match config.find(PROFILE_CONFIG_MARKERS) {
        Some(index) => {
            let mut masked = String::with_capacity(config.len());
            masked.push_str(&config[..index]);
            masked.extend(choice);
            masked.push_str(&config[index + 1..]);
            masked
        }
        None => {
            let mut masked = String::with_capacity(config.len() + 1);
            masked.extend(choice);
            masked.push_str(config);
            masked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_suffix_is_a_bare_domain() {
        assert_eq!(EMAIL_SUFFIX, "@weasyl.com");
        assert_eq!(EMAIL_SUFFIX.matches('@').count(), 1);
    }

    #[test]
    fn test_placeholder_is_bcrypt() {
        assert!(PLACEHOLDER_PASSWORD_HASH.starts_with("$2a$12$"));
        assert_eq!(PLACEHOLDER_PASSWORD_HASH.len(), 60);
    }

    #[test]
    fn test_mask_is_deterministic() {
        assert_eq!(
            mask_profile_config("foo", "shm"),
            mask_profile_config("foo", "shm")
        );
    }

    #[test]
    fn test_mask_touches_only_first_marker() {
        for username in ["foo", "bar", "baz", "qux", "weasyl", "staff"] {
            let masked = mask_profile_config(username, "smpx");
            let choice = marker_choice(username);
            let expected: String = ["s"]
                .into_iter()
                .map(str::to_string)
                .chain(choice.map(String::from))
                .chain(["px".to_string()])
                .collect();
            assert_eq!(masked, expected, "username {username}");
        }
    }

    #[test]
    fn test_mask_injects_when_no_marker() {
        for username in ["foo", "bar", "baz", "qux"] {
            let masked = mask_profile_config(username, "sh");
            match marker_choice(username) {
                Some(c) => assert_eq!(masked, format!("{c}sh")),
                None => assert_eq!(masked, "sh"),
            }
        }
    }

    #[test]
    fn test_mask_preserves_non_marker_flags() {
        let masked = mask_profile_config("someone", "hsxm");
        assert!(masked.starts_with("hsx"));
        assert!(masked.len() <= 4);
    }
}
