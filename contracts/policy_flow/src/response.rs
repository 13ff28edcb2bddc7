//! Oracle payload decoding. The node answers with the delay in minutes as
//! plain ASCII digits, e.g. `b"200"`.

use soroban_sdk::Bytes;

use crate::types::FlowError;

pub fn parse_delay(response: &Bytes) -> Result<u32, FlowError> {
    if response.is_empty() {
        return Err(FlowError::ResponseParseError);
    }

    let mut delay: u32 = 0;
    for byte in response.iter() {
        if !byte.is_ascii_digit() {
            return Err(FlowError::ResponseParseError);
        }
        delay = delay
            .checked_mul(10)
            .and_then(|d| d.checked_add(u32::from(byte - b'0')))
            .ok_or(FlowError::ResponseParseError)?;
    }
    Ok(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::Env;

    fn parse(env: &Env, raw: &[u8]) -> Result<u32, FlowError> {
        parse_delay(&Bytes::from_slice(env, raw))
    }

    #[test]
    fn test_parses_minutes() {
        let env = Env::default();
        assert_eq!(parse(&env, b"200"), Ok(200));
        assert_eq!(parse(&env, b"0"), Ok(0));
        assert_eq!(parse(&env, b"0060"), Ok(60));
        assert_eq!(parse(&env, b"4294967295"), Ok(u32::MAX));
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        let env = Env::default();
        for raw in [&b""[..], b"-5", b"12a", b" 60", b"6.5", b"4294967296"] {
            assert_eq!(parse(&env, raw), Err(FlowError::ResponseParseError));
        }
    }
}
