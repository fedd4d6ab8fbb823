use serde::{Deserialize, Serialize};

use crate::domain::EmployeeId;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const EMPLOYEES_PATH: &str = "/api/colaboradores";
pub const REGISTER_BIOMETRY_PATH: &str = "/api/biometria/cadastrar";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, rename = "token", alias = "Token")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBiometryRequest {
    #[serde(rename = "ColaboradorId")]
    pub employee_id: EmployeeId,
    #[serde(rename = "BiometriaTemplateBase64")]
    pub template_b64: String,
}

/// Serde adapter for the inline photo payload. Accepts a base64 string or a
/// byte array. Missing, null, empty or undecodable values all map to `None`.
pub mod photo {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de::IgnoredAny, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Base64(String),
        Bytes(Vec<u8>),
        Other(IgnoredAny),
    }

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = match Option::<Payload>::deserialize(deserializer)? {
            Some(Payload::Base64(text)) => STANDARD.decode(text.trim()).ok(),
            Some(Payload::Bytes(bytes)) => Some(bytes),
            Some(Payload::Other(_)) | None => None,
        };
        Ok(bytes.filter(|bytes| !bytes.is_empty()))
    }
}
