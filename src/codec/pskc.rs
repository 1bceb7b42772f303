//! PSKC key container export and import
//!
//! Export streams one `KeyPackage` per HOTP/TOTP token between a header and
//! a footer. Seeds are sealed under a random pre-shared key, the MAC key is
//! sealed under the same key and every seed carries a `ValueMAC`.
//!
//! Import understands the containers written here plus plain-value
//! secrets, and validates MACs according to a [`MacPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};

use regex::Regex;

use crate::store::{TokenRecord, UserInfo};

use super::crypto::{self, KEY_LEN};
use super::errors::{CodecError, CodecResult};

const PSKC_NS: &str = "urn:ietf:params:xml:ns:keyprov:pskc";
const ALGORITHM_PREFIX: &str = "urn:ietf:params:xml:ns:keyprov:pskc:";
const ENCRYPTION_ALGORITHM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
const MAC_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256";
const ISSUER: &str = "token-janitor";
const DEFAULT_TIMESTEP: &str = "30";

/// How MACs are checked on import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacPolicy {
    /// Import every token, ignoring MACs
    NoCheck,
    /// Skip tokens whose MAC does not verify
    CheckFailSoft,
    /// Import nothing unless every MAC verifies
    #[default]
    CheckFailHard,
}

impl MacPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MacPolicy::NoCheck => "no_check",
            MacPolicy::CheckFailSoft => "check_fail_soft",
            MacPolicy::CheckFailHard => "check_fail_hard",
        }
    }
}

impl fmt::Display for MacPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MacPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_check" => Ok(MacPolicy::NoCheck),
            "check_fail_soft" => Ok(MacPolicy::CheckFailSoft),
            "check_fail_hard" => Ok(MacPolicy::CheckFailHard),
            other => Err(format!(
                "unknown MAC policy '{}', expected no_check, check_fail_soft or check_fail_hard",
                other
            )),
        }
    }
}

/// Streaming PSKC writer
pub struct PskcWriter {
    key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
    exported: usize,
}

impl PskcWriter {
    /// Writer with a fresh random pre-shared key
    pub fn new() -> Self {
        Self::with_key(crypto::random_key())
    }

    pub fn with_key(key: [u8; KEY_LEN]) -> Self {
        Self {
            key,
            mac_key: crypto::random_key(),
            exported: 0,
        }
    }

    /// The pre-shared key needed to import the container again
    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// Number of key packages written so far
    pub fn exported(&self) -> usize {
        self.exported
    }

    pub fn header(&self) -> CodecResult<String> {
        let mac_key = crypto::seal(&self.key, &self.mac_key)?;
        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<KeyContainer Version="1.0" Id="{id}" xmlns="{ns}" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:xenc="http://www.w3.org/2001/04/xmlenc#">
  <EncryptionKey>
    <ds:KeyName>Pre-shared-key</ds:KeyName>
  </EncryptionKey>
  <MACMethod Algorithm="{mac_alg}">
    <MACKey>
      <xenc:EncryptionMethod Algorithm="{enc_alg}"/>
      <xenc:CipherData>
        <xenc:CipherValue>{mac_key}</xenc:CipherValue>
      </xenc:CipherData>
    </MACKey>
  </MACMethod>
"#,
            id = uuid::Uuid::new_v4(),
            ns = PSKC_NS,
            mac_alg = MAC_ALGORITHM,
            enc_alg = ENCRYPTION_ALGORITHM,
            mac_key = crypto::to_base64(&mac_key),
        ))
    }

    /// One key package. HOTP and TOTP only.
    pub fn key_package(&mut self, token: &TokenRecord, owner: Option<&UserInfo>) -> CodecResult<String> {
        let tokentype = token.tokentype.to_ascii_lowercase();
        if tokentype != "hotp" && tokentype != "totp" {
            return Err(CodecError::UnsupportedType {
                serial: token.serial.clone(),
                tokentype: token.tokentype.clone(),
                format: "pskc",
            });
        }

        let seed = hex::decode(&token.otpkey).map_err(|_| CodecError::InvalidSeed(token.serial.clone()))?;
        let sealed = crypto::seal(&self.key, &seed)?;
        let value_mac = crypto::mac(&self.mac_key, &sealed)?;

        let moving_factor = if tokentype == "totp" {
            format!(
                "        <TimeInterval><PlainValue>{}</PlainValue></TimeInterval>\n",
                escape(token.tokeninfo("timeStep").unwrap_or(DEFAULT_TIMESTEP))
            )
        } else {
            format!(
                "        <Counter><PlainValue>{}</PlainValue></Counter>\n",
                token.count
            )
        };
        let user = owner
            .map(|u| format!("      <UserId>{}</UserId>\n", escape(&u.login())))
            .unwrap_or_default();

        self.exported += 1;
        Ok(format!(
            r#"  <KeyPackage>
    <DeviceInfo>
      <Manufacturer>{issuer}</Manufacturer>
      <SerialNo>{serial}</SerialNo>
    </DeviceInfo>
    <Key Id="{serial}" Algorithm="{alg_prefix}{tokentype}">
      <Issuer>{issuer}</Issuer>
      <AlgorithmParameters>
        <ResponseFormat Length="{otplen}" Encoding="DECIMAL"/>
      </AlgorithmParameters>
      <Data>
        <Secret>
          <EncryptedValue>
            <xenc:EncryptionMethod Algorithm="{enc_alg}"/>
            <xenc:CipherData>
              <xenc:CipherValue>{cipher}</xenc:CipherValue>
            </xenc:CipherData>
          </EncryptedValue>
          <ValueMAC>{mac}</ValueMAC>
        </Secret>
{moving_factor}      </Data>
{user}      <FriendlyName>{description}</FriendlyName>
    </Key>
  </KeyPackage>
"#,
            issuer = ISSUER,
            serial = escape(&token.serial),
            alg_prefix = ALGORITHM_PREFIX,
            tokentype = tokentype,
            otplen = token.otplen,
            enc_alg = ENCRYPTION_ALGORITHM,
            cipher = crypto::to_base64(&sealed),
            mac = crypto::to_base64(&value_mac),
            moving_factor = moving_factor,
            user = user,
            description = escape(&token.description),
        ))
    }

    pub fn footer(&self) -> &'static str {
        "</KeyContainer>\n"
    }
}

impl Default for PskcWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A token read from a key container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedToken {
    pub serial: String,
    pub tokentype: String,
    /// Hex encoded seed
    pub otpkey: String,
    pub otplen: i64,
    pub counter: i64,
    pub timestep: Option<String>,
    pub description: String,
}

impl ImportedToken {
    /// New token record carrying the imported key material
    pub fn into_record(self) -> TokenRecord {
        let mut token = TokenRecord::new(self.serial, self.tokentype)
            .with_otpkey(self.otpkey)
            .with_description(self.description)
            .with_tokeninfo("import_file", "pskc");
        token.otplen = self.otplen;
        token.count = self.counter;
        if let Some(timestep) = self.timestep {
            token.tokeninfo.insert("timeStep".into(), timestep);
        }
        token
    }
}

/// Outcome of parsing a key container
#[derive(Debug, Default)]
pub struct PskcImport {
    pub tokens: Vec<ImportedToken>,
    /// Serials (or package positions) that could not be read or validated
    pub not_parsed: Vec<String>,
}

/// Parse a key container.
///
/// With [`MacPolicy::CheckFailHard`] the first MAC failure aborts the whole
/// import. Otherwise unreadable packages are listed in `not_parsed`.
pub fn parse_pskc(xml: &str, preshared_key_hex: Option<&str>, policy: MacPolicy) -> CodecResult<PskcImport> {
    let key = preshared_key_hex.map(crypto::key_from_hex).transpose()?;
    let mac_key = match (&key, element(xml, "MACKey")) {
        (Some(key), Some(block)) => element(block, "CipherValue")
            .and_then(crypto::from_base64)
            .and_then(|sealed| crypto::open(key, &sealed)),
        _ => None,
    };

    let packages = elements(xml, "KeyPackage");
    if packages.is_empty() {
        return Err(CodecError::Malformed("no KeyPackage found".into()));
    }

    let mut import = PskcImport::default();
    for (position, package) in packages.into_iter().enumerate() {
        let label = element(package, "SerialNo")
            .map(unescape)
            .or_else(|| attribute(package, "Key", "Id"))
            .unwrap_or_else(|| format!("KeyPackage #{}", position + 1));

        match read_package(package, &label, key.as_ref(), mac_key.as_deref(), policy) {
            Ok(token) => import.tokens.push(token),
            Err(CodecError::MacMismatch(serial)) if policy == MacPolicy::CheckFailHard => {
                return Err(CodecError::MacMismatch(serial));
            }
            Err(e) => {
                tracing::warn!(serial = %label, error = %e, "key package not parsed");
                import.not_parsed.push(label);
            }
        }
    }
    Ok(import)
}

fn read_package(
    package: &str,
    serial: &str,
    key: Option<&[u8; KEY_LEN]>,
    mac_key: Option<&[u8]>,
    policy: MacPolicy,
) -> CodecResult<ImportedToken> {
    let malformed = |what: &str| CodecError::Malformed(format!("{}: {}", serial, what));

    let algorithm = attribute(package, "Key", "Algorithm").ok_or_else(|| malformed("no algorithm"))?;
    let tokentype = algorithm
        .strip_prefix(ALGORITHM_PREFIX)
        .filter(|t| *t == "hotp" || *t == "totp")
        .ok_or_else(|| malformed("unsupported algorithm"))?
        .to_string();

    let secret = element(package, "Secret").ok_or_else(|| malformed("no secret"))?;
    let seed = match element(secret, "EncryptedValue") {
        Some(encrypted) => {
            let sealed = element(encrypted, "CipherValue")
                .and_then(crypto::from_base64)
                .ok_or_else(|| malformed("unreadable cipher value"))?;

            if policy != MacPolicy::NoCheck {
                let valid = match (mac_key, element(secret, "ValueMAC").and_then(crypto::from_base64)) {
                    (Some(mac_key), Some(expected)) => crypto::verify_mac(mac_key, &sealed, &expected),
                    _ => false,
                };
                if !valid {
                    return Err(CodecError::MacMismatch(serial.to_string()));
                }
            }

            let key = key.ok_or_else(|| CodecError::InvalidKey("a pre-shared key is required".into()))?;
            crypto::open(key, &sealed).ok_or_else(|| malformed("cannot decrypt secret"))?
        }
        None => element(secret, "PlainValue")
            .and_then(crypto::from_base64)
            .ok_or_else(|| malformed("no secret value"))?,
    };

    let otplen = attribute(package, "ResponseFormat", "Length")
        .and_then(|l| l.parse().ok())
        .unwrap_or(6);
    let counter = element(package, "Counter")
        .and_then(|c| element(c, "PlainValue"))
        .and_then(|c| c.trim().parse().ok())
        .unwrap_or(0);
    let timestep = element(package, "TimeInterval")
        .and_then(|t| element(t, "PlainValue"))
        .map(|t| t.trim().to_string());

    Ok(ImportedToken {
        serial: serial.to_string(),
        tokentype,
        otpkey: hex::encode(seed),
        otplen,
        counter,
        timestep,
        description: element(package, "FriendlyName").map(unescape).unwrap_or_default(),
    })
}

/// Compiled patterns, keyed by pattern text. The set of tags is fixed, so
/// the cache stays small.
fn cached_regex(pattern: String) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let mut cache = CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = cache.get(&pattern) {
        return Some(re.clone());
    }
    let re = Regex::new(&pattern).ok()?;
    cache.insert(pattern, re.clone());
    Some(re)
}

fn element_regex(tag: &str) -> Option<Regex> {
    let tag = regex::escape(tag);
    cached_regex(format!(r"(?s)<(?:[\w-]+:)?{tag}\b[^>]*>(.*?)</(?:[\w-]+:)?{tag}>"))
}

/// Content of the first `tag` element, namespace prefix ignored
fn element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    element_regex(tag)?
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    match element_regex(tag) {
        Some(re) => re
            .captures_iter(xml)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect(),
        None => Vec::new(),
    }
}

/// Value of `attr` on the first `tag` element
fn attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let pattern = format!(
        r#"<(?:[\w-]+:)?{}\b[^>]*?\b{}="([^"]*)""#,
        regex::escape(tag),
        regex::escape(attr)
    );
    let re = cached_regex(pattern)?;
    re.captures(xml).map(|c| unescape(&c[1]))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(writer: &mut PskcWriter, tokens: &[TokenRecord]) -> String {
        let mut xml = writer.header().unwrap();
        for token in tokens {
            xml.push_str(&writer.key_package(token, None).unwrap());
        }
        xml.push_str(writer.footer());
        xml
    }

    fn tokens() -> Vec<TokenRecord> {
        let mut hotp = TokenRecord::new("OATH<1>", "hotp")
            .with_otpkey("3132333435363738393031323334353637383930")
            .with_description("desk & drawer");
        hotp.count = 17;
        let totp = TokenRecord::new("TOTP1", "totp")
            .with_otpkey("abcdef")
            .with_tokeninfo("timeStep", "60");
        vec![hotp, totp]
    }

    #[test]
    fn test_export_then_import() {
        let mut writer = PskcWriter::new();
        let xml = container(&mut writer, &tokens());
        assert_eq!(writer.exported(), 2);

        let import = parse_pskc(&xml, Some(writer.key_hex().as_str()), MacPolicy::CheckFailHard).unwrap();
        assert!(import.not_parsed.is_empty());
        assert_eq!(import.tokens.len(), 2);

        let hotp = &import.tokens[0];
        assert_eq!(hotp.serial, "OATH<1>");
        assert_eq!(hotp.tokentype, "hotp");
        assert_eq!(hotp.otpkey, "3132333435363738393031323334353637383930");
        assert_eq!(hotp.counter, 17);
        assert_eq!(hotp.description, "desk & drawer");

        let totp = &import.tokens[1];
        assert_eq!(totp.timestep.as_deref(), Some("60"));
        assert_eq!(totp.otplen, 6);
    }

    #[test]
    fn test_unsupported_type_is_skipped() {
        let mut writer = PskcWriter::new();
        let err = writer
            .key_package(&TokenRecord::new("PW1", "spass"), None)
            .unwrap_err();
        assert!(err.is_skip());
        assert_eq!(writer.exported(), 0);
    }

    fn tampered() -> (String, String) {
        let mut writer = PskcWriter::new();
        let xml = container(&mut writer, &tokens());
        // corrupt the MAC of the first package only
        let start = xml.find("<ValueMAC>").unwrap() + "<ValueMAC>".len();
        let mut bytes = xml.into_bytes();
        bytes[start] = if bytes[start] == b'A' { b'B' } else { b'A' };
        (String::from_utf8(bytes).unwrap(), writer.key_hex())
    }

    #[test]
    fn test_mac_policies() {
        let (xml, key) = tampered();

        let err = parse_pskc(&xml, Some(key.as_str()), MacPolicy::CheckFailHard).unwrap_err();
        assert!(matches!(err, CodecError::MacMismatch(serial) if serial == "OATH<1>"));

        let soft = parse_pskc(&xml, Some(key.as_str()), MacPolicy::CheckFailSoft).unwrap();
        assert_eq!(soft.tokens.len(), 1);
        assert_eq!(soft.not_parsed, vec!["OATH<1>".to_string()]);

        let unchecked = parse_pskc(&xml, Some(key.as_str()), MacPolicy::NoCheck).unwrap();
        assert_eq!(unchecked.tokens.len(), 2);
    }

    #[test]
    fn test_wrong_key_is_not_parsed() {
        let mut writer = PskcWriter::new();
        let xml = container(&mut writer, &tokens());
        let other = hex::encode(crypto::random_key());

        let import = parse_pskc(&xml, Some(other.as_str()), MacPolicy::NoCheck).unwrap();
        assert!(import.tokens.is_empty());
        assert_eq!(import.not_parsed.len(), 2);
    }

    #[test]
    fn test_plain_value_secret() {
        let xml = r#"<pskc:KeyContainer xmlns:pskc="urn:ietf:params:xml:ns:keyprov:pskc">
          <pskc:KeyPackage>
            <pskc:Key Id="PLAIN1" Algorithm="urn:ietf:params:xml:ns:keyprov:pskc:hotp">
              <pskc:AlgorithmParameters><pskc:ResponseFormat Encoding="DECIMAL" Length="8"/></pskc:AlgorithmParameters>
              <pskc:Data><pskc:Secret><pskc:PlainValue>MTIzNDU=</pskc:PlainValue></pskc:Secret></pskc:Data>
            </pskc:Key>
          </pskc:KeyPackage>
        </pskc:KeyContainer>"#;

        let import = parse_pskc(xml, None, MacPolicy::CheckFailHard).unwrap();
        assert_eq!(import.tokens.len(), 1);
        assert_eq!(import.tokens[0].serial, "PLAIN1");
        assert_eq!(import.tokens[0].otpkey, "3132333435");
        assert_eq!(import.tokens[0].otplen, 8);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("check_fail_soft".parse::<MacPolicy>(), Ok(MacPolicy::CheckFailSoft));
        assert!("sometimes".parse::<MacPolicy>().is_err());
        assert_eq!(MacPolicy::default(), MacPolicy::CheckFailHard);
    }

    #[test]
    fn test_no_packages_is_malformed() {
        assert!(matches!(
            parse_pskc("<KeyContainer/>", None, MacPolicy::NoCheck),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_patterns_are_cached() {
        let first = element_regex("SerialNo").unwrap();
        let second = element_regex("SerialNo").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(element("<pskc:SerialNo> S1 </pskc:SerialNo>", "SerialNo"), Some("S1"));
        assert_eq!(
            attribute(r#"<Key Id="K&amp;1">"#, "Key", "Id").as_deref(),
            Some("K&1")
        );
    }
}
