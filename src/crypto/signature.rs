use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw signature bytes as they travel between server, browser and wallet
///
/// Serialized as a JSON array of integers in `0..=255`. Wallet transports
/// sometimes hand back typed arrays serialized as `{"0": 12, "1": 255, ...}`;
/// [`SignatureBytes::from_json`] accepts both shapes so the rest of the crate
/// only ever deals with plain bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureBytes(Vec<u8>);

impl SignatureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalize a JSON array, or an object of indexed values, into bytes
    ///
    /// Returns `None` if any element is not an integer in `0..=255` or the
    /// value is neither an array nor an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let elements: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => {
                let indexed: Option<Vec<(usize, &Value)>> = map
                    .iter()
                    .map(|(key, v)| key.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                match indexed {
                    Some(mut indexed) => {
                        indexed.sort_by_key(|(i, _)| *i);
                        indexed.into_iter().map(|(_, v)| v).collect()
                    }
                    None => map.values().collect(),
                }
            }
            _ => return None,
        };

        elements
            .into_iter()
            .map(byte_from_json)
            .collect::<Option<Vec<u8>>>()
            .map(Self)
    }
}

fn byte_from_json(value: &Value) -> Option<u8> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(int) = n.as_u64() {
        return u8::try_from(int).ok();
    }
    // 12.0 is an integer as far as the browser is concerned
    let float = n.as_f64()?;
    if float.fract() == 0.0 && (0.0..=255.0).contains(&float) {
        Some(float as u8)
    } else {
        None
    }
}

impl From<Vec<u8>> for SignatureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SignatureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
