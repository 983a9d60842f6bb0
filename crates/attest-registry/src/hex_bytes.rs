//! Serde helper for hex-encoding `Vec<u8>` fields.

use serde::{self, Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    serializer.serialize_str(&hex)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(serde::de::Error::custom("expected an even-length string of hex digits"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        data: Vec<u8>,
    }

    #[test]
    fn hex_encodes_lowercase() {
        let json = serde_json::to_string(&Wrapper { data: vec![0x00, 0xAB, 0xff] }).unwrap();
        assert_eq!(json, r#"{"data":"00abff"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![0x00, 0xAB, 0xff]);
    }

    #[test]
    fn odd_length_and_non_hex_rejected() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"data":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"data":"zz"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"data":"éé"}"#).is_err());
    }

    #[test]
    fn sign_prefixed_pairs_rejected() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"data":"+f"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"data":"00-1"}"#).is_err());
        let upper: Wrapper = serde_json::from_str(r#"{"data":"AB"}"#).unwrap();
        assert_eq!(upper.data, vec![0xab]);
    }
}
