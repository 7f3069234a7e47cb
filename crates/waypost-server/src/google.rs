//! Google ID-token verification via the `tokeninfo` endpoint.

use serde::Deserialize;
use waypost_core::{
  Error, Result,
  external::TokenVerifier,
  principal::VerifiedIdentity,
};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verifies bearer credentials as Google ID tokens.
///
/// Every provider-side failure (network, non-2xx, wrong audience,
/// unverified email) collapses to [`Error::InvalidCredential`]; callers
/// only ever learn that the credential was not acceptable.
#[derive(Clone)]
pub struct GoogleVerifier {
  client:    reqwest::Client,
  client_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
  aud:            String,
  sub:            String,
  email:          Option<String>,
  email_verified: Option<String>,
  name:           Option<String>,
  picture:        Option<String>,
}

impl GoogleVerifier {
  pub fn new(client: reqwest::Client, client_id: String) -> Self {
    Self { client, client_id }
  }
}

impl TokenVerifier for GoogleVerifier {
  async fn verify(&self, credential: &str) -> Result<VerifiedIdentity> {
    let resp = self
      .client
      .get(TOKENINFO_URL)
      .query(&[("id_token", credential)])
      .send()
      .await
      .map_err(|_| Error::InvalidCredential)?;

    if !resp.status().is_success() {
      return Err(Error::InvalidCredential);
    }

    let info: TokenInfo =
      resp.json().await.map_err(|_| Error::InvalidCredential)?;

    identity_from(info, &self.client_id)
  }
}

fn identity_from(info: TokenInfo, client_id: &str) -> Result<VerifiedIdentity> {
  if info.aud != client_id {
    return Err(Error::InvalidCredential);
  }
  if info.email_verified.as_deref() != Some("true") {
    return Err(Error::InvalidCredential);
  }
  let email = info.email.ok_or(Error::InvalidCredential)?;

  Ok(VerifiedIdentity {
    email,
    name: info.name,
    avatar_uri: info.picture,
    subject_id: info.sub,
  })
}
