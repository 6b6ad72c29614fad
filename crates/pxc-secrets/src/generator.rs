//! Password generation.

use crate::policy::GenerationPolicy;
use pxc_types::{Credential, PxcError, Result};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};

const LETTERS_AND_DIGITS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Password generator.
pub struct SecretGenerator;

impl SecretGenerator {
    /// Generate one password satisfying `policy`.
    ///
    /// Every call seeds a fresh CSPRNG from the operating system. Failure of
    /// the OS entropy source is reported as `PxcError::Randomness` and must
    /// not be retried.
    pub fn generate(policy: &GenerationPolicy) -> Result<Credential> {
        let rng = StdRng::from_rng(OsRng)
            .map_err(|e| PxcError::Randomness(format!("Failed to seed from OS entropy: {}", e)))?;
        Ok(Self::generate_with(policy, rng))
    }

    /// Generate one password with a caller-supplied cryptographic RNG.
    pub fn generate_with<R: RngCore + CryptoRng>(policy: &GenerationPolicy, mut rng: R) -> Credential {
        let alphabet = Self::alphabet(policy);
        let length = rng.gen_range(policy.min_length()..=policy.max_length());
        let pick = Uniform::from(0..alphabet.len());

        let password: Vec<u8> = (0..length)
            .map(|_| alphabet[pick.sample(&mut rng)])
            .collect();

        Credential::new(password)
    }

    /// Characters a password may be drawn from: letters, digits, and the
    /// policy's symbols.
    pub fn alphabet(policy: &GenerationPolicy) -> Vec<u8> {
        let mut alphabet = LETTERS_AND_DIGITS.to_vec();
        // Policy symbols are validated ASCII punctuation, one byte each.
        alphabet.extend(policy.symbols().iter().map(|&c| c as u8));
        alphabet
    }
}
