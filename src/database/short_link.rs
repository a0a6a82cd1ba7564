use rand::{distributions::Alphanumeric, Rng};

use crate::{
    constants::{SHORT_LINK_LENGTH, SHORT_LINK_MAX_ATTEMPTS, SHORT_LINK_PREFIX},
    error::RecipeError,
};

/*
Short links

A recipe gets a random code of `length` characters from [A-Za-z0-9] when it is
first saved. 62^6 codes leave collisions rare; the unique constraint on
recipes.short_link decides, and the caller moves on to the next candidate.

    https://foodgram.example/s/aB3xY9  ->  /recipes/42/
*/

#[derive(Debug, Clone, Copy)]
pub struct ShortLinkGenerator {
    length: usize,
    max_attempts: usize,
}

impl Default for ShortLinkGenerator {
    fn default() -> Self {
        Self::new(SHORT_LINK_LENGTH, SHORT_LINK_MAX_ATTEMPTS)
    }
}

impl ShortLinkGenerator {
    pub fn new(length: usize, max_attempts: usize) -> Self {
        Self {
            length,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }

    /// Yields at most `max_attempts` fresh codes. Collect it before awaiting,
    /// thread-local generators are not `Send`.
    pub fn candidates<'a, R: Rng>(&'a self, rng: &'a mut R) -> impl Iterator<Item = String> + 'a {
        (0..self.max_attempts).map(move |_| self.generate(rng))
    }

    pub fn exhausted(&self) -> RecipeError {
        RecipeError::ShortLinkExhausted {
            attempts: self.max_attempts,
        }
    }

    pub fn is_valid_code(&self, code: &str) -> bool {
        code.len() == self.length && code.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

pub fn short_link_url(site_url: &str, code: &str) -> String {
    format!(
        "{}/{SHORT_LINK_PREFIX}/{code}",
        site_url.trim_end_matches('/')
    )
}

pub fn recipe_path(recipe_id: i32) -> String {
    format!("/recipes/{recipe_id}/")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    #[rstest]
    fn test_codes_are_fixed_length_alphanumeric() {
        let generator = ShortLinkGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let code = generator.generate(&mut rng);
            assert_eq!(code.len(), SHORT_LINK_LENGTH);
            assert!(generator.is_valid_code(&code));
        }
    }

    #[rstest]
    fn test_codes_are_pairwise_distinct() {
        let generator = ShortLinkGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut issued = HashSet::new();

        for _ in 0..10_000 {
            let code = generator
                .candidates(&mut rng)
                .find(|code| !issued.contains(code))
                .expect("code space exhausted");
            issued.insert(code);
        }

        assert_eq!(issued.len(), 10_000);
    }

    #[rstest]
    fn test_candidates_are_bounded() {
        let generator = ShortLinkGenerator::new(6, 4);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generator.candidates(&mut rng).count(), 4);
    }

    #[rstest]
    fn test_exhausted_space_is_an_error() {
        // a one-character code space of 62 symbols cannot hold 63 recipes
        let generator = ShortLinkGenerator::new(1, 64);
        let mut rng = StdRng::seed_from_u64(3);
        let mut issued: HashSet<String> = HashSet::new();

        let outcome = (0..63).try_for_each(|_| {
            match generator.candidates(&mut rng).find(|c| !issued.contains(c)) {
                Some(code) => {
                    issued.insert(code);
                    Ok(())
                }
                None => Err(generator.exhausted()),
            }
        });

        assert_eq!(
            outcome,
            Err(RecipeError::ShortLinkExhausted { attempts: 64 })
        );
    }

    #[rstest]
    #[case("aB3xY9", true)]
    #[case("aB3xY", false)]
    #[case("aB3-Y9", false)]
    fn test_code_shape(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(ShortLinkGenerator::default().is_valid_code(code), valid);
    }

    #[rstest]
    fn test_urls() {
        assert_eq!(
            short_link_url("http://localhost:8000/", "aB3xY9"),
            "http://localhost:8000/s/aB3xY9"
        );
        assert_eq!(recipe_path(42), "/recipes/42/");
    }
}
