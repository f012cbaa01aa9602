use crate::application_port::{CodecError, TokenCodec};
use crate::domain_model::TokenClaims;
use crate::domain_port::Clock;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;

/// EdDSA (Ed25519) token codec.
///
/// Verification only accepts `EdDSA` headers. Validity windows are checked
/// against the injected clock rather than the library's own wall clock.
pub struct JwtEdDsaCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtEdDsaCodec {
    /// Builds a codec from a PKCS#8 private key PEM and an SPKI public key PEM.
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CodecError> {
        let encoding_key = EncodingKey::from_ed_pem(private_pem)
            .map_err(|e| CodecError::Signing(format!("private key: {e}")))?;
        let decoding_key = DecodingKey::from_ed_pem(public_pem)
            .map_err(|e| CodecError::Signing(format!("public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            clock,
        })
    }

    fn map_decode_error(err: jsonwebtoken::errors::Error) -> CodecError {
        match err.kind() {
            ErrorKind::InvalidSignature => CodecError::InvalidSignature,
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => CodecError::Expired,
            _ => CodecError::Malformed(err.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtEdDsaCodec {
    async fn issue(&self, claims: &TokenClaims) -> Result<String, CodecError> {
        encode(&Header::new(Algorithm::EdDSA), claims, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    async fn verify(&self, token: &str) -> Result<TokenClaims, CodecError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(Self::map_decode_error)?;
        let claims = data.claims;

        let now = self.clock.now().timestamp();
        if now >= claims.expires_at() || now < claims.not_before() {
            return Err(CodecError::Expired);
        }
        Ok(claims)
    }
}
