use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

use crate::{environment::Environment, error::EnvironmentError};

/// Content hash of the record's JSON form, used as its ETag.
pub fn fingerprint(env: &Environment) -> Result<String, EnvironmentError> {
    let encoded = serde_json::to_vec(env)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::fingerprint;
    use crate::environment::Environment;

    #[test]
    fn fingerprints_record_deterministically() {
        let a = fingerprint(&Environment::development()).expect("fingerprint");
        let b = fingerprint(&Environment::development()).expect("fingerprint");
        assert_eq!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn any_field_change_moves_the_fingerprint() {
        let base = fingerprint(&Environment::development()).expect("fingerprint");

        let mut env = Environment::development();
        env.auth0.callback_url = "http://localhost:8101".to_string();
        assert_ne!(fingerprint(&env).expect("fingerprint"), base);

        let mut env = Environment::development();
        env.production = true;
        assert_ne!(fingerprint(&env).expect("fingerprint"), base);
    }
}
