/// Invite token generation
///
/// Tokens are the only credential needed to preview, accept or reject an
/// invite, so they come from the thread-local CSPRNG and carry ~285 bits of
/// entropy (48 base62 characters).

use rand::Rng;

pub const INVITE_TOKEN_LENGTH: usize = 48;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a fresh URL-safe invite token
pub fn generate_invite_token() -> String {
    let mut rng = rand::thread_rng();

    (0..INVITE_TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_invite_token();
        assert_eq!(token.len(), INVITE_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_invite_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
