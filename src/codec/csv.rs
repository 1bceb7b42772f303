//! Row-oriented seed export
//!
//! One line per HOTP/TOTP token:
//! `owner, serial, otpkey, type, otplen[, timestep]`

use crate::store::{TokenRecord, UserInfo};

use super::errors::{CodecError, CodecResult};
use super::seed::encode_seed;

const DEFAULT_TIMESTEP: &str = "30";

/// Format one token as a CSV row
pub fn csv_row(token: &TokenRecord, owner: Option<&UserInfo>, b32: bool) -> CodecResult<String> {
    let tokentype = token.tokentype.to_ascii_lowercase();
    if tokentype != "hotp" && tokentype != "totp" {
        return Err(CodecError::UnsupportedType {
            serial: token.serial.clone(),
            tokentype: token.tokentype.clone(),
            format: "csv",
        });
    }

    let owner = owner.map(UserInfo::login).unwrap_or_else(|| "n/a".to_string());
    let otpkey = encode_seed(token, b32)?;

    let mut row = format!(
        "{}, {}, {}, {}, {}",
        owner, token.serial, otpkey, tokentype, token.otplen
    );
    if tokentype == "totp" {
        let timestep = token.tokeninfo("timeStep").unwrap_or(DEFAULT_TIMESTEP);
        row.push_str(", ");
        row.push_str(timestep);
    }
    Ok(row)
}
