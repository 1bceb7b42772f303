//! Token export and import formats
//!
//! - CSV rows for HOTP/TOTP seeds
//! - YAML token documents, streamed as sequence items
//! - PSKC key containers with encrypted and MAC-protected seeds

mod base32;
mod crypto;
mod csv;
mod errors;
mod pskc;
mod seed;
mod yaml;

pub use csv::csv_row;
pub use errors::{CodecError, CodecResult};
pub use pskc::{parse_pskc, ImportedToken, MacPolicy, PskcImport, PskcWriter};
pub use seed::{decode_seed, encode_seed};
pub use yaml::{load_documents, TokenDocument};
