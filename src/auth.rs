use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use bson::oid::ObjectId;
use futures::future::{ready, Ready};
use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::SplitError;
use crate::membership::parse_id;
use crate::schemas::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks bearer tokens of the form `<user id>.<signature>`,
/// where the signature is an HMAC-SHA256 of the id keyed by the SHA-256 of
/// the configured secret.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, InvalidLength> {
        let mut sha256_hasher = Sha256::new();
        sha256_hasher.update(secret.as_bytes());
        let secret_hash = sha256_hasher.finalize();
        Ok(Self {
            mac: HmacSha256::new_from_slice(&secret_hash)?,
        })
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    pub fn sign(&self, user: &UserId) -> String {
        let id = user.to_hex();
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(id.as_bytes());
        let signature = hmac_hasher.finalize().into_bytes();
        format!("{id}.{}", hex::encode(signature))
    }

    pub fn verify(&self, token: &str) -> Option<UserId> {
        let (id, signature) = token.trim().split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(id.as_bytes());
        hmac_hasher.verify_slice(&signature).ok()?;
        parse_id(id, "token").ok()
    }
}

/// The authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Identity(pub ObjectId);

impl Identity {
    pub fn user_id(&self) -> &UserId {
        &self.0
    }
}

fn authenticate(request: &HttpRequest) -> Result<Identity, SplitError> {
    let unauthorized = || SplitError::Unauthorized("Not authorized, token failed".to_string());
    let signer = request
        .app_data::<web::Data<TokenSigner>>()
        .ok_or_else(unauthorized)?;
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| SplitError::Unauthorized("Not authorized, no token".to_string()))?;
    signer.verify(token).map(Identity).ok_or_else(unauthorized)
}

impl FromRequest for Identity {
    type Error = SplitError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = authenticate(request);
        if let Err(err) = &identity {
            tracing::warn!(path = request.path(), "rejected request: {err}");
        }
        ready(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn signed_tokens_verify_to_their_user() {
        let signer = TokenSigner::new("secret").unwrap();
        let user = ObjectId::new();
        assert_eq!(signer.verify(&signer.sign(&user)), Some(user));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let signer = TokenSigner::new("secret").unwrap();
        let user = ObjectId::new();
        let token = signer.sign(&user);

        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("{}.{signature}", ObjectId::new().to_hex());
        assert_eq!(signer.verify(&forged), None);
        assert_eq!(TokenSigner::new("other").unwrap().verify(&token), None);
        assert_eq!(signer.verify("garbage"), None);
        let odd = format!("{}.abc", user.to_hex());
        assert_eq!(signer.verify(&odd), None);
    }

    #[test]
    fn signatures_are_lowercase_hex_sha256() {
        let signer = TokenSigner::new("secret").unwrap();
        let user = ObjectId::new();
        let token = signer.sign(&user);
        let (id, signature) = token.split_once('.').unwrap();
        assert_eq!(id, user.to_hex());
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn identity_comes_from_the_bearer_header() {
        let signer = TokenSigner::new("secret").unwrap();
        let user = ObjectId::new();
        let request = TestRequest::default()
            .app_data(web::Data::new(signer.clone()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", signer.sign(&user))))
            .to_http_request();
        assert_eq!(authenticate(&request).unwrap(), Identity(user));

        let anonymous = TestRequest::default()
            .app_data(web::Data::new(signer))
            .to_http_request();
        assert!(matches!(
            authenticate(&anonymous),
            Err(SplitError::Unauthorized(_))
        ));
    }
}
